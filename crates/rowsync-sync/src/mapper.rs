//! Field mapping
//!
//! Turns one superseding row into the full field set of its upsert. Pure and
//! total: missing cells are left out, never cleared, and owned fields from
//! the prior record are re-applied last so they survive the overwrite.

use rowsync_core::{sanitize_id, Entry, FieldMap, FieldValue, RecordId, UPDATED_FIELD};

use crate::{DerivedField, KindPolicy, SyncContext};

pub fn map_fields(
    entry: &Entry,
    id: &RecordId,
    owned: &FieldMap,
    policy: &KindPolicy,
    ctx: &SyncContext,
) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert(UPDATED_FIELD.to_string(), entry.updated().into());
    fields.insert(policy.id_column.clone(), FieldValue::from(id.as_str()));

    for column in &policy.columns {
        if let Some(value) = entry.get(&column.source) {
            fields.insert(column.dest.clone(), FieldValue::from(value));
        }
    }

    for derived in &policy.derived {
        if let Some(value) = derive_value(derived, entry, ctx) {
            fields.insert(derived.dest().to_string(), value);
        }
    }

    for (name, value) in owned {
        fields.insert(name.clone(), value.clone());
    }

    fields
}

/// Computed value for one derived field; `None` when the source cell is
/// absent or blank
fn derive_value(derived: &DerivedField, entry: &Entry, ctx: &SyncContext) -> Option<FieldValue> {
    let raw = entry.get(derived.source()).filter(|v| !v.trim().is_empty())?;

    match derived {
        DerivedField::TrackAlias { .. } => {
            let token = sanitize_id(raw, false, ctx.max_id_len);
            Some(FieldValue::from(ctx.aliases.resolve(&token)))
        }
        DerivedField::AssetUrl { .. } => ctx.asset_url(raw).map(FieldValue::from),
    }
}
