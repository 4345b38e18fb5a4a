//! Deep structural copies of JSON values.

mod clone;

pub use clone::clone;
