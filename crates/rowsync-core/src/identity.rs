//! Identity derivation
//!
//! Record identities are derived from one primary feed cell (and optionally a
//! disambiguating cell) by a pure, total sanitization. The same cell values
//! always produce the same identity, which is what makes re-syncs idempotent.

use std::borrow::Cow;

use sha2::{Digest, Sha256};

use crate::{Entry, RecordId};

/// Default upper bound on a sanitized token
pub const DEFAULT_MAX_ID_LEN: usize = 64;

/// Prefix of identities generated for input with no usable characters
pub const PLACEHOLDER_PREFIX: &str = "id-";

/// Hex digits of the input digest kept in a placeholder
const PLACEHOLDER_DIGEST_LEN: usize = 16;

/// Joins a primary token to its disambiguator; never produced by sanitization itself
const DISAMBIGUATOR_SEPARATOR: &str = "--";

/// How a kind derives record identities from entries
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityRule {
    /// Feed cell the identity is built from
    pub primary: String,
    /// Optional cell appended to keep otherwise-equal primaries apart
    pub disambiguator: Option<String>,
    /// Drop `( ... )` segments before sanitizing
    pub strip_parentheticals: bool,
    pub max_len: usize,
}

impl IdentityRule {
    pub fn new(primary: impl Into<String>) -> Self {
        IdentityRule {
            primary: primary.into(),
            disambiguator: None,
            strip_parentheticals: false,
            max_len: DEFAULT_MAX_ID_LEN,
        }
    }

    pub fn with_disambiguator(mut self, field: impl Into<String>) -> Self {
        self.disambiguator = Some(field.into());
        self
    }

    pub fn strip_parentheticals(mut self) -> Self {
        self.strip_parentheticals = true;
        self
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Derive the identity of `entry`.
    ///
    /// Returns `None` only when the entry lacks the primary cell altogether;
    /// any present value, including an empty one, yields an identity.
    pub fn derive(&self, entry: &Entry) -> Option<RecordId> {
        let primary = entry.get(&self.primary)?;
        let mut token = sanitize_id(primary, self.strip_parentheticals, self.max_len);

        if let Some(field) = &self.disambiguator {
            if let Some(raw) = entry.get(field).filter(|v| !v.trim().is_empty()) {
                token.push_str(DISAMBIGUATOR_SEPARATOR);
                token.push_str(&sanitize_id(raw, false, self.max_len));
            }
        }

        Some(RecordId::from_sanitized(token))
    }
}

/// Derive the identity of `entry` under `rule`
pub fn derive_identity(entry: &Entry, rule: &IdentityRule) -> Option<RecordId> {
    rule.derive(entry)
}

/// Sanitize free text into a URL-safe token.
///
/// Lower-cases, keeps `[a-z0-9_]`, collapses whitespace and `-` runs into a
/// single `-`, drops everything else and truncates to `max_len`. Never
/// returns an empty string: input with no usable characters maps to a
/// digest-based placeholder.
pub fn sanitize_id(input: &str, strip_parentheticals: bool, max_len: usize) -> String {
    let source: Cow<'_, str> = if strip_parentheticals {
        Cow::Owned(strip_parenthetical_segments(input))
    } else {
        Cow::Borrowed(input)
    };

    let token = normalize(&source, max_len);
    if token.is_empty() {
        placeholder(input, max_len)
    } else {
        token
    }
}

fn normalize(input: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(input.len().min(max_len));
    let mut pending_separator = false;

    for c in input.chars() {
        if out.len() >= max_len {
            break;
        }
        match c.to_ascii_lowercase() {
            c @ ('a'..='z' | '0'..='9' | '_') => {
                if pending_separator && !out.is_empty() {
                    out.push('-');
                }
                pending_separator = false;
                out.push(c);
            }
            '-' => pending_separator = true,
            c if c.is_whitespace() => pending_separator = true,
            _ => {}
        }
    }

    // Output is ASCII, so byte truncation is a char boundary
    out.truncate(max_len);
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Remove every `( ... )` segment, shortest match first. An unclosed `(` is kept.
fn strip_parenthetical_segments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find('(') {
        match rest[open..].find(')') {
            Some(close) => {
                out.push_str(&rest[..open]);
                rest = &rest[open + close + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

/// `id-` plus leading digest hex, cut to `max_len`. Bounds too small for the
/// prefix get bare hex; at least one digit is always kept.
fn placeholder(input: &str, max_len: usize) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let hex: String = digest
        .iter()
        .take(PLACEHOLDER_DIGEST_LEN / 2)
        .map(|byte| format!("{:02x}", byte))
        .collect();

    if max_len > PLACEHOLDER_PREFIX.len() {
        let digits = (max_len - PLACEHOLDER_PREFIX.len()).min(hex.len());
        format!("{}{}", PLACEHOLDER_PREFIX, &hex[..digits])
    } else {
        hex[..max_len.max(1)].to_string()
    }
}
