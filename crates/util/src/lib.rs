//! json-observer-util - helpers for plain JSON data.
//!
//! Neither helper knows about observation. Use [`clone`] to take an
//! independent snapshot and [`freeze`] to hand out data that nobody may
//! change.

pub mod json_clone;
pub mod json_freeze;

pub use json_clone::clone;
pub use json_freeze::{freeze, Frozen};
