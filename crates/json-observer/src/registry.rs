//! Observer registry and change delivery.
//!
//! One [`Registry`] exists per observed root. Delivery runs synchronously
//! on the mutating call, after the graph borrow is released, so observers
//! are free to read or mutate the graph themselves.

use std::borrow::Cow;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use crate::change::Change;
use crate::error::{ConfigurationError, ObserverError};
use crate::options::ObserveOptions;

type Callback = dyn Fn(&[Change]) -> Result<(), ObserverError>;

// ── Observer ───────────────────────────────────────────────────────────────

/// A registered callback.
///
/// Clones share identity: registering a clone of an already registered
/// observer is a no-op, and any clone can be used to unobserve it.
#[derive(Clone)]
pub struct Observer {
    callback: Rc<Callback>,
}

impl Observer {
    /// Wrap a fallible callback. Returned errors are logged, never
    /// propagated to the mutating call.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&[Change]) -> Result<(), ObserverError> + 'static,
    {
        Self { callback: Rc::new(callback) }
    }

    /// Wrap a callback that cannot fail.
    pub fn from_fn<F>(callback: F) -> Self
    where
        F: Fn(&[Change]) + 'static,
    {
        Self::new(move |changes| {
            callback(changes);
            Ok(())
        })
    }

    /// Whether both handles refer to the same callback.
    pub fn same(&self, other: &Observer) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }

    fn notify(&self, changes: &[Change]) -> Result<(), ObserverError> {
        (self.callback)(changes)
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("callback", &Rc::as_ptr(&self.callback).cast::<()>())
            .finish()
    }
}

// ── Filter ─────────────────────────────────────────────────────────────────

/// Which records an observer receives, matched on the `.`-joined path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    /// Joined path equals the string.
    Exact(String),
    /// Joined path starts with the string.
    Prefix(String),
}

impl Filter {
    pub fn matches(&self, change: &Change) -> bool {
        match self {
            Filter::All => true,
            Filter::Exact(path) => change.path_string() == *path,
            Filter::Prefix(prefix) => change.path_string().starts_with(prefix.as_str()),
        }
    }

    fn select<'a>(&self, changes: &'a [Change]) -> Cow<'a, [Change]> {
        match self {
            Filter::All => Cow::Borrowed(changes),
            _ => Cow::Owned(changes.iter().filter(|c| self.matches(c)).cloned().collect()),
        }
    }
}

impl TryFrom<ObserveOptions> for Filter {
    type Error = ConfigurationError;

    fn try_from(options: ObserveOptions) -> Result<Self, Self::Error> {
        options.validate()?;
        Ok(match (options.path, options.paths_from) {
            (Some(path), _) => Filter::Exact(path),
            (None, Some(prefix)) => Filter::Prefix(prefix),
            (None, None) => Filter::All,
        })
    }
}

// ── Registry ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub(crate) struct Registry {
    entries: Vec<(Observer, Filter)>,
}

impl Registry {
    /// Returns `false` when the observer is already registered; its
    /// original filter is kept.
    pub(crate) fn register(&mut self, observer: Observer, filter: Filter) -> bool {
        if self.entries.iter().any(|(o, _)| o.same(&observer)) {
            return false;
        }
        self.entries.push((observer, filter));
        true
    }

    /// Remove the given observers, or every observer when none are given.
    pub(crate) fn unregister(&mut self, observers: &[Observer]) {
        if observers.is_empty() {
            self.entries.clear();
        } else {
            self.entries.retain(|(o, _)| !observers.iter().any(|x| x.same(o)));
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Prepare delivery of one batch. Nothing is prepared for an empty
    /// batch or an empty registry.
    pub(crate) fn dispatch(&self, changes: Vec<Change>) -> Option<Dispatch> {
        if changes.is_empty() || self.entries.is_empty() {
            return None;
        }
        Some(Dispatch { targets: self.entries.clone(), changes })
    }
}

/// One batch bound to the observers registered when it was produced.
#[must_use]
pub(crate) struct Dispatch {
    targets: Vec<(Observer, Filter)>,
    changes: Vec<Change>,
}

impl Dispatch {
    pub(crate) fn deliver(self) {
        tracing::trace!(
            changes = self.changes.len(),
            observers = self.targets.len(),
            "dispatching changes"
        );
        for (observer, filter) in &self.targets {
            let relevant = filter.select(&self.changes);
            if relevant.is_empty() {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| observer.notify(&relevant))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::error!(error = %err, ?observer, "failed to deliver changes to observer");
                }
                Err(payload) => {
                    let message = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::error!(panic = %message, ?observer, "observer panicked while handling changes");
                }
            }
        }
    }
}
