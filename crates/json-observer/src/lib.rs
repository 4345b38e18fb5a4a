//! json-observer: deep mutation observation for nested records and
//! sequences.
//!
//! [`Observable::from`] takes ownership of a composite [`Value`] and
//! tracks every nested record and sequence inside it. Mutations made
//! through an [`Observable`] or any [`Handle`] reached from it are
//! reported to registered [`Observer`]s as path-addressed [`Change`]
//! records, synchronously, before the mutating call returns.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use json_observer::{ChangeKind, Observable, ObserveOptions, Observer};
//! use serde_json::json;
//!
//! let root = Observable::from(json!({"a": {"b": [1, 2]}})).unwrap();
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = seen.clone();
//! let observer = Observer::from_fn(move |changes| sink.borrow_mut().extend(changes.iter().cloned()));
//! root.observe(&observer, ObserveOptions::new()).unwrap();
//!
//! let list = root.get_in_str("a.b").unwrap().unwrap().into_node().unwrap();
//! list.append([3]).unwrap();
//!
//! let seen = seen.borrow();
//! assert_eq!(seen[0].kind, ChangeKind::Insert);
//! assert_eq!(seen[0].path_string(), "a.b.2");
//! ```

mod arena;
mod base;
mod change;
mod error;
mod key;
mod observable;
mod options;
mod path;
mod record;
mod registry;
mod sequence;
mod value;

pub use arena::{NodeId, NodeKind};
pub use change::{Change, ChangeKind};
pub use error::{ConfigurationError, ObserveError, ObserverError, TypeConstraintError};
pub use key::{path_string, Key, Path};
pub use observable::{Candidate, Entry, Handle, Observable};
pub use options::ObserveOptions;
pub use registry::{Filter, Observer};
pub use value::{compare_values, Atom, Record, Value, ValueKind};
