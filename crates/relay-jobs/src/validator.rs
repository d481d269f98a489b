//! Request validation against the allow-list and handler registry.

use crate::error::JobError;
use crate::registry::JobRegistry;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Fixed set of class identifiers permitted for background execution.
///
/// Built from configuration at startup and immutable at runtime. This is a
/// security boundary: arbitrary class/method strings arrive over the process
/// command line, and anything outside this set must never execute.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    classes: BTreeSet<String>,
}

impl AllowList {
    /// Builds an allow-list from configured class names.
    #[must_use]
    pub fn new(classes: impl IntoIterator<Item = String>) -> Self {
        Self {
            classes: classes.into_iter().collect(),
        }
    }

    /// Returns true if the class is permitted.
    #[must_use]
    pub fn contains(&self, class_name: &str) -> bool {
        self.classes.contains(class_name)
    }

    /// Number of permitted classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns true if nothing is permitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl FromIterator<String> for AllowList {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self::new(iter)
    }
}

/// Why a request was rejected. Rejections are always terminal; none of them
/// ever triggers a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Class is not on the allow-list.
    ClassNotAllowed,
    /// No handler is registered for the class.
    ClassNotFound,
    /// The handler does not expose the method.
    MethodNotFound,
}

impl Rejection {
    /// Returns the reason string persisted on the failed job record.
    #[must_use]
    pub const fn record_reason(&self) -> &'static str {
        match self {
            Rejection::ClassNotAllowed => "NotApproved",
            Rejection::ClassNotFound => "ClassNotFound",
            Rejection::MethodNotFound => "MethodNotFound",
        }
    }

    /// Converts the rejection into the matching job error.
    #[must_use]
    pub fn into_error(self, class: &str, method: &str) -> JobError {
        match self {
            Rejection::ClassNotAllowed => JobError::NotApproved(class.to_string()),
            Rejection::ClassNotFound => JobError::ClassNotFound(class.to_string()),
            Rejection::MethodNotFound => JobError::MethodNotFound {
                class: class.to_string(),
                method: method.to_string(),
            },
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.record_reason())
    }
}

/// Checks a requested class/method pair before any execution.
///
/// Pure query: no side effects. The dispatcher is responsible for recording
/// and auditing a rejection.
pub struct Validator {
    allow_list: AllowList,
    registry: Arc<JobRegistry>,
}

impl Validator {
    /// Creates a validator over the given allow-list and registry.
    #[must_use]
    pub fn new(allow_list: AllowList, registry: Arc<JobRegistry>) -> Self {
        Self {
            allow_list,
            registry,
        }
    }

    /// Approves or rejects a class/method pair.
    ///
    /// The allow-list is checked before the registry, so an unapproved class
    /// is rejected as such even when no handler exists for it.
    pub fn approve(&self, class_name: &str, method_name: &str) -> Result<(), Rejection> {
        if !self.allow_list.contains(class_name) {
            return Err(Rejection::ClassNotAllowed);
        }

        let Some(handler) = self.registry.get(class_name) else {
            return Err(Rejection::ClassNotFound);
        };

        if !handler.methods().contains(&method_name) {
            return Err(Rejection::MethodNotFound);
        }

        Ok(())
    }
}
