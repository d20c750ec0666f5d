//! Feed entries and store field values
//!
//! An entry is one parsed feed row: named string cells plus the row's
//! `updated` clock. Field maps are what mutations carry into the store.

use std::collections::BTreeMap;
use std::fmt;

use crate::Timestamp;

/// A single store value
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Integer(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<Timestamp> for FieldValue {
    fn from(value: Timestamp) -> Self {
        FieldValue::Integer(value.as_millis())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Integer(v) => write!(f, "{}", v),
        }
    }
}

/// Store field name -> value
pub type FieldMap = BTreeMap<String, FieldValue>;

/// One feed row
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    fields: BTreeMap<String, String>,
    updated: Timestamp,
}

impl Entry {
    pub fn new(updated: Timestamp) -> Self {
        Entry {
            fields: BTreeMap::new(),
            updated,
        }
    }

    /// Builder-style field insert
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a cell; a repeated name keeps the last value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    #[inline]
    pub fn updated(&self) -> Timestamp {
        self.updated
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={:?}", name, value)?;
        }
        write!(f, "}} @ {}", self.updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_last_value_wins() {
        let mut entry = Entry::new(Timestamp::from_millis(1)).with_field("a", "1");
        entry.insert("a", "2");
        assert_eq!(entry.get("a"), Some("2"));
        assert_eq!(entry.len(), 1);
        assert!(entry.get("b").is_none());
    }

    #[test]
    fn test_entry_display() {
        let entry = Entry::new(Timestamp::from_millis(7))
            .with_field("companyname", "280 North")
            .with_field("companypod", "Google APIs");
        assert_eq!(
            entry.to_string(),
            "{companyname=\"280 North\", companypod=\"Google APIs\"} @ 7"
        );
    }

    #[test]
    fn test_field_value_accessors() {
        assert_eq!(FieldValue::from(3).as_integer(), Some(3));
        assert_eq!(FieldValue::from("x").as_text(), Some("x"));
        assert_eq!(FieldValue::from(Timestamp::from_millis(9)), FieldValue::Integer(9));
        assert!(FieldValue::from("x").as_integer().is_none());
    }
}
