//! Per-kind sync policies
//!
//! A policy is plain data: how to derive identities, which feed cells land in
//! which store fields, which fields are computed, and which fields belong to
//! the local user. Adding an entity kind means adding a policy, not code.

use rowsync_core::{EntityKind, IdentityRule, SyncError, SyncResult, UPDATED_FIELD};

/// Copy a feed cell verbatim into a store field
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnMapping {
    pub source: String,
    pub dest: String,
}

/// Store field computed from a feed cell
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DerivedField {
    /// Sanitize the cell, then translate it through the alias table
    TrackAlias { source: String, dest: String },
    /// Append the cell to the asset base URL as one path segment
    AssetUrl { source: String, dest: String },
}

impl DerivedField {
    pub fn source(&self) -> &str {
        match self {
            DerivedField::TrackAlias { source, .. } | DerivedField::AssetUrl { source, .. } => {
                source
            }
        }
    }

    pub fn dest(&self) -> &str {
        match self {
            DerivedField::TrackAlias { dest, .. } | DerivedField::AssetUrl { dest, .. } => dest,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KindPolicy {
    pub kind: EntityKind,
    pub identity: IdentityRule,
    /// Store field that persists the derived identity
    pub id_column: String,
    pub columns: Vec<ColumnMapping>,
    pub derived: Vec<DerivedField>,
    /// Store fields the feed never sets; inherited across overwrites
    pub owned_fields: Vec<String>,
}

impl KindPolicy {
    pub fn new(kind: EntityKind, identity: IdentityRule, id_column: impl Into<String>) -> Self {
        KindPolicy {
            kind,
            identity,
            id_column: id_column.into(),
            columns: Vec::new(),
            derived: Vec::new(),
            owned_fields: Vec::new(),
        }
    }

    pub fn column(mut self, source: impl Into<String>, dest: impl Into<String>) -> Self {
        self.columns.push(ColumnMapping {
            source: source.into(),
            dest: dest.into(),
        });
        self
    }

    pub fn derive(mut self, field: DerivedField) -> Self {
        self.derived.push(field);
        self
    }

    pub fn owned(mut self, field: impl Into<String>) -> Self {
        self.owned_fields.push(field.into());
        self
    }

    pub fn with_max_id_len(mut self, max_len: usize) -> Self {
        self.identity.max_len = max_len;
        self
    }

    /// Owned fields must not shadow a field the feed writes
    pub fn validate(&self) -> SyncResult<()> {
        for field in &self.owned_fields {
            let written = field == UPDATED_FIELD
                || *field == self.id_column
                || self.columns.iter().any(|c| c.dest == *field)
                || self.derived.iter().any(|d| d.dest() == field);
            if written {
                return Err(SyncError::Config(format!(
                    "kind {}: owned field {:?} is also written by the feed",
                    self.kind, field
                )));
            }
        }
        Ok(())
    }

    /// Vendor rows from the exhibitor sheet
    pub fn vendor() -> Self {
        KindPolicy::new(
            EntityKind::VENDOR,
            IdentityRule::new(vendor::COMPANY_NAME),
            vendor::VENDOR_ID,
        )
        .column(vendor::COMPANY_NAME, vendor::NAME)
        .column(vendor::COMPANY_LOCATION, vendor::LOCATION)
        .column(vendor::COMPANY_DESC, vendor::DESC)
        .column(vendor::COMPANY_URL, vendor::URL)
        .column(vendor::PRODUCT_DESC, vendor::PRODUCT_DESC_FIELD)
        .derive(DerivedField::TrackAlias {
            source: vendor::COMPANY_POD.into(),
            dest: vendor::TRACK_ID.into(),
        })
        .derive(DerivedField::AssetUrl {
            source: vendor::COMPANY_LOGO.into(),
            dest: vendor::LOGO_URL.into(),
        })
        .owned(vendor::STARRED)
    }

    /// Speaker rows; titles can repeat across events, so the directory
    /// handle disambiguates
    pub fn speaker() -> Self {
        KindPolicy::new(
            EntityKind::SPEAKER,
            IdentityRule::new(speaker::SPEAKER_TITLE)
                .strip_parentheticals()
                .with_disambiguator(speaker::SPEAKER_LDAP),
            speaker::SPEAKER_ID,
        )
        .column(speaker::SPEAKER_TITLE, speaker::NAME)
        .column(speaker::SPEAKER_COMPANY, speaker::COMPANY)
        .column(speaker::SPEAKER_ABSTRACT, speaker::ABSTRACT)
    }
}

/// Vendor feed cells and store fields
pub mod vendor {
    pub const COMPANY_NAME: &str = "companyname";
    pub const COMPANY_LOCATION: &str = "companylocation";
    pub const COMPANY_DESC: &str = "companydesc";
    pub const COMPANY_URL: &str = "companyurl";
    pub const PRODUCT_DESC: &str = "productdesc";
    pub const COMPANY_LOGO: &str = "companylogo";
    pub const COMPANY_POD: &str = "companypod";

    pub const VENDOR_ID: &str = "vendorId";
    pub const NAME: &str = "name";
    pub const LOCATION: &str = "location";
    pub const DESC: &str = "desc";
    pub const URL: &str = "url";
    pub const PRODUCT_DESC_FIELD: &str = "productDesc";
    pub const TRACK_ID: &str = "trackId";
    pub const LOGO_URL: &str = "logoUrl";
    pub const STARRED: &str = "starred";
}

/// Speaker feed cells and store fields
pub mod speaker {
    pub const SPEAKER_TITLE: &str = "speakertitle";
    pub const SPEAKER_COMPANY: &str = "speakercompany";
    pub const SPEAKER_ABSTRACT: &str = "speakerabstract";
    pub const SPEAKER_LDAP: &str = "speakerldap";

    pub const SPEAKER_ID: &str = "speakerId";
    pub const NAME: &str = "name";
    pub const COMPANY: &str = "company";
    pub const ABSTRACT: &str = "abstract";
}
