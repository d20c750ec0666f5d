//! Logical clock values for reconciliation
//!
//! Every feed row carries an `updated` clock and every stored record keeps the
//! clock of the row it was built from. Supersede decisions compare the two.

use std::fmt;

/// Last-update clock, in epoch milliseconds
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Clock of a record the store has never seen. Orders below every real value.
    pub const NEVER: Timestamp = Timestamp(i64::MIN);
    pub const ZERO: Timestamp = Timestamp(0);

    #[inline]
    pub fn from_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    #[inline]
    pub fn as_millis(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn is_never(self) -> bool {
        self == Timestamp::NEVER
    }

    /// Strictly newer than `other`; equal clocks never supersede
    #[inline]
    pub fn supersedes(self, other: Timestamp) -> bool {
        self > other
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::NEVER
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_never() {
            write!(f, "Timestamp(never)")
        } else {
            write!(f, "Timestamp({}ms)", self.0)
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_never() {
            write!(f, "never")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
