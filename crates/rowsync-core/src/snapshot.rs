//! Local snapshots
//!
//! The minimal projection of one stored record needed to decide whether an
//! incoming row supersedes it: the last update clock plus locally-owned fields.

use crate::{FieldMap, FieldValue, Timestamp};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalSnapshot {
    pub last_updated: Timestamp,
    /// Fields the feed never sets, carried across overwrites
    pub owned: FieldMap,
}

impl LocalSnapshot {
    /// Snapshot of a record the store does not hold
    pub fn absent() -> Self {
        LocalSnapshot {
            last_updated: Timestamp::NEVER,
            owned: FieldMap::new(),
        }
    }

    pub fn at(last_updated: Timestamp) -> Self {
        LocalSnapshot {
            last_updated,
            owned: FieldMap::new(),
        }
    }

    pub fn with_owned(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.owned.insert(name.into(), value.into());
        self
    }

    pub fn is_absent(&self) -> bool {
        self.last_updated.is_never()
    }
}

impl Default for LocalSnapshot {
    fn default() -> Self {
        Self::absent()
    }
}
