//! Sync configuration
//!
//! Alias tables and the asset base location are passed into every pass
//! through a [`SyncContext`]; nothing here is process-global.

use std::collections::{BTreeMap, HashMap};

use rowsync_core::{sanitize_id, SyncError, SyncResult, DEFAULT_MAX_ID_LEN};
use serde::{Deserialize, Serialize};
use url::Url;

/// Versioned location vendor logos are served from
pub const DEFAULT_LOGO_BASE: &str = "http://code.google.com/events/io/2010/images/";

/// Serialized sync configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Base URL that logo file names are appended to
    pub logo_base: String,
    /// Legacy category name -> canonical track id
    pub track_aliases: BTreeMap<String, String>,
    /// Upper bound on sanitized identity tokens
    pub max_id_len: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            logo_base: DEFAULT_LOGO_BASE.to_string(),
            track_aliases: BTreeMap::new(),
            max_id_len: DEFAULT_MAX_ID_LEN,
        }
    }
}

impl SyncConfig {
    pub fn from_json(text: &str) -> SyncResult<Self> {
        serde_json::from_str(text).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Validate and build the runtime context
    pub fn into_context(self) -> SyncResult<SyncContext> {
        if self.max_id_len == 0 {
            return Err(SyncError::Config("max_id_len must be positive".into()));
        }

        let base = Url::parse(&self.logo_base)
            .map_err(|e| SyncError::Config(format!("logo_base {:?}: {}", self.logo_base, e)))?;
        if base.cannot_be_a_base() {
            return Err(SyncError::Config(format!(
                "logo_base {:?} cannot take path segments",
                self.logo_base
            )));
        }

        // Keys are matched against sanitized category tokens
        let mut aliases = AliasTable::new();
        for (legacy, canonical) in self.track_aliases {
            aliases.insert(sanitize_id(&legacy, false, self.max_id_len), canonical);
        }

        Ok(SyncContext {
            aliases,
            asset_base: base,
            max_id_len: self.max_id_len,
        })
    }
}

/// Legacy token -> canonical id; unknown tokens pass through unchanged
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        AliasTable::default()
    }

    pub fn insert(&mut self, token: impl Into<String>, canonical: impl Into<String>) {
        self.aliases.insert(token.into(), canonical.into());
    }

    pub fn resolve<'a>(&'a self, token: &'a str) -> &'a str {
        self.aliases.get(token).map_or(token, String::as_str)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AliasTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = AliasTable::new();
        for (token, canonical) in iter {
            table.insert(token, canonical);
        }
        table
    }
}

/// Injected per-pass configuration
#[derive(Clone, Debug)]
pub struct SyncContext {
    pub aliases: AliasTable,
    pub asset_base: Url,
    pub max_id_len: usize,
}

impl SyncContext {
    pub fn new(asset_base: Url) -> Self {
        SyncContext {
            aliases: AliasTable::new(),
            asset_base,
            max_id_len: DEFAULT_MAX_ID_LEN,
        }
    }

    pub fn with_aliases(mut self, aliases: AliasTable) -> Self {
        self.aliases = aliases;
        self
    }

    /// Append `file_name` to the asset base as a single, percent-encoded
    /// path segment. Blank names produce no URL.
    pub fn asset_url(&self, file_name: &str) -> Option<String> {
        let file_name = file_name.trim();
        if file_name.is_empty() {
            return None;
        }

        let mut url = self.asset_base.clone();
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .push(file_name);
        Some(url.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_builds() {
        let ctx = SyncConfig::default().into_context().unwrap();
        assert_eq!(ctx.asset_base.as_str(), DEFAULT_LOGO_BASE);
        assert!(ctx.aliases.is_empty());
        assert_eq!(ctx.max_id_len, DEFAULT_MAX_ID_LEN);
    }

    #[test]
    fn test_config_from_json_sanitizes_alias_keys() {
        let config = SyncConfig::from_json(
            r#"{
                "logo_base": "https://cdn.example.com/logos/v2/",
                "track_aliases": {"Google APIs": "googleapis", "gwt": "google-web-toolkit"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.max_id_len, DEFAULT_MAX_ID_LEN);

        let ctx = config.into_context().unwrap();
        assert_eq!(ctx.aliases.resolve("google-apis"), "googleapis");
        assert_eq!(ctx.aliases.resolve("gwt"), "google-web-toolkit");
        assert_eq!(ctx.aliases.resolve("android"), "android");
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            SyncConfig::from_json(r#"{"unknown": 1}"#),
            Err(SyncError::Config(_))
        ));

        let bad_url = SyncConfig {
            logo_base: "not a url".into(),
            ..SyncConfig::default()
        };
        assert!(matches!(bad_url.into_context(), Err(SyncError::Config(_))));

        let opaque = SyncConfig {
            logo_base: "mailto:logos@example.com".into(),
            ..SyncConfig::default()
        };
        assert!(matches!(opaque.into_context(), Err(SyncError::Config(_))));

        let zero = SyncConfig {
            max_id_len: 0,
            ..SyncConfig::default()
        };
        assert!(matches!(zero.into_context(), Err(SyncError::Config(_))));
    }

    #[test]
    fn test_asset_url() {
        let ctx = SyncConfig::default().into_context().unwrap();
        assert_eq!(
            ctx.asset_url("280north.png").as_deref(),
            Some("http://code.google.com/events/io/2010/images/280north.png")
        );
        assert_eq!(
            ctx.asset_url(" my logo/v2.png ").as_deref(),
            Some("http://code.google.com/events/io/2010/images/my%20logo%2Fv2.png")
        );
        assert!(ctx.asset_url("   ").is_none());

        let bare = SyncContext::new(Url::parse("https://cdn.example.com/logos").unwrap());
        assert_eq!(
            bare.asset_url("a.png").as_deref(),
            Some("https://cdn.example.com/logos/a.png")
        );
    }
}
