//! Record normalizer
//!
//! Shapes loader output into uniform [`AuditLogRecord`]s. Entries that cannot
//! be normalized are skipped with a warning instead of failing the batch.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::models::{Actor, AuditAction, AuditLogRecord, FieldValue, RawAuditEntry, SharedRecord};
use crate::utils::{AppError, AppResult};

/// Parse the timestamp formats emitted by the audit store.
///
/// Accepts RFC 3339, Postgres text output (`2024-01-15 10:00:00.123+00`) and
/// offset-less timestamps, which are read as UTC.
pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(ts, format) {
            return Some(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc));
        }
    }
    None
}

/// Normalize a single raw entry
pub fn normalize_entry(raw: RawAuditEntry) -> AppResult<AuditLogRecord> {
    let id = Uuid::parse_str(raw.id.trim())
        .map_err(|e| AppError::malformed(format!("invalid id '{}': {}", raw.id, e)))?;
    let timestamp = parse_timestamp(&raw.created_at).ok_or_else(|| {
        AppError::malformed(format!("entry {} has invalid timestamp '{}'", id, raw.created_at))
    })?;

    let nested = raw.user.unwrap_or_default();
    let actor = Actor {
        user_id: raw.user_id.or(nested.id),
        email: raw.user_email.or(nested.email).unwrap_or_default(),
        full_name: raw.user_full_name.or(nested.full_name),
    };

    let action = AuditAction::from(raw.action);
    let old_values = value_map(raw.old_values);
    let new_values = value_map(raw.new_values);

    let changed_fields = match changed_field_names(raw.changed_fields) {
        Some(fields) => fields,
        None if matches!(action, AuditAction::Created | AuditAction::Deleted) => Vec::new(),
        None => derive_changed_fields(&old_values, &new_values),
    };

    Ok(AuditLogRecord {
        id,
        actor,
        action,
        changed_fields,
        old_values,
        new_values,
        timestamp,
        source: raw.source,
        entity_id: raw.record_id,
    })
}

/// Normalize a loader batch, preserving fetch order
pub fn normalize_entries(entries: Vec<RawAuditEntry>) -> Vec<SharedRecord> {
    let total = entries.len();
    let records: Vec<SharedRecord> = entries
        .into_iter()
        .filter_map(|raw| match normalize_entry(raw) {
            Ok(record) => Some(Arc::new(record)),
            Err(e) => {
                warn!("Skipping audit entry: {}", e);
                None
            }
        })
        .collect();

    if records.len() < total {
        warn!(
            "Normalized {} of {} audit entries ({} skipped)",
            records.len(),
            total,
            total - records.len()
        );
    }
    records
}

fn value_map(values: Option<Value>) -> BTreeMap<String, FieldValue> {
    match values {
        Some(Value::Object(map)) => map
            .into_iter()
            .map(|(key, value)| (key, FieldValue::from(value)))
            .collect(),
        Some(Value::Null) | None => BTreeMap::new(),
        Some(other) => {
            warn!("Ignoring non-object value snapshot: {}", other);
            BTreeMap::new()
        }
    }
}

/// `None` when the store did not say which fields changed
fn changed_field_names(changed: Option<Value>) -> Option<Vec<String>> {
    match changed? {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(name) => Some(name),
                    _ => None,
                })
                .collect(),
        ),
        Value::Object(flags) => Some(
            flags
                .into_iter()
                .filter(|(_, flag)| flag.as_bool().unwrap_or(false))
                .map(|(name, _)| name)
                .collect(),
        ),
        _ => None,
    }
}

fn derive_changed_fields(
    old_values: &BTreeMap<String, FieldValue>,
    new_values: &BTreeMap<String, FieldValue>,
) -> Vec<String> {
    let keys: BTreeSet<&String> = old_values.keys().chain(new_values.keys()).collect();
    keys.into_iter()
        .filter(|key| old_values.get(*key) != new_values.get(*key))
        .cloned()
        .collect()
}
