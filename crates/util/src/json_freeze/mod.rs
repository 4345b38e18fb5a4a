//! Read-only views of JSON values.

mod freeze;

pub use freeze::{freeze, Frozen};
