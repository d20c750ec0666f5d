//! Identity types for rowsync
//!
//! An entity kind names a store partition; a record id names one record inside it.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Entity kind - one store partition and one sync policy
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKind(Cow<'static, str>);

impl EntityKind {
    pub const VENDOR: EntityKind = EntityKind(Cow::Borrowed("vendor"));
    pub const SPEAKER: EntityKind = EntityKind(Cow::Borrowed("speaker"));

    pub fn new(name: impl Into<String>) -> Self {
        EntityKind(Cow::Owned(name.into()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kind({})", self.0)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Record identity - sanitized, URL-safe key within a kind
///
/// Only produced by identity derivation, so every value is non-empty and
/// restricted to `[a-z0-9_-]`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(String);

impl RecordId {
    pub(crate) fn from_sanitized(token: String) -> Self {
        debug_assert!(!token.is_empty());
        RecordId(token)
    }

    /// Sanitize free text into an identity with the default length bound
    pub fn from_raw(raw: &str) -> Self {
        RecordId(crate::sanitize_id(raw, false, crate::DEFAULT_MAX_ID_LEN))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_kinds_are_distinct() {
        assert_ne!(EntityKind::VENDOR, EntityKind::SPEAKER);
        assert_eq!(EntityKind::new("vendor"), EntityKind::VENDOR);
    }

    #[test]
    fn test_record_id_from_raw() {
        assert_eq!(RecordId::from_raw("Acme Corp").as_str(), "acme-corp");
        assert_eq!(RecordId::from_raw("Acme Corp").to_string(), "acme-corp");
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(EntityKind::SPEAKER.to_string(), "speaker");
        assert_eq!(format!("{:?}", EntityKind::VENDOR), "Kind(vendor)");
    }
}
