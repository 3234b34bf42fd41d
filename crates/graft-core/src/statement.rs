//! Statement: the atomic unit of change.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// An opaque (subject, predicate, object) triple.
///
/// Equality is by content. Parts are reference-counted, so cloning a
/// statement (or a commit full of them) shares the underlying strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Statement {
    subject: Arc<str>,
    predicate: Arc<str>,
    object: Arc<str>,
}

impl Statement {
    pub fn new(subject: &str, predicate: &str, object: &str) -> Self {
        Self {
            subject: Arc::from(subject),
            predicate: Arc::from(predicate),
            object: Arc::from(object),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    /// True if both statements point at the same allocations.
    pub fn shares_storage_with(&self, other: &Statement) -> bool {
        Arc::ptr_eq(&self.subject, &other.subject)
            && Arc::ptr_eq(&self.predicate, &other.predicate)
            && Arc::ptr_eq(&self.object, &other.object)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.subject, self.predicate, self.object)
    }
}
