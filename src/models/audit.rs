//! Audit log models

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Normalized records are shared read-only between the snapshot, the filter
/// output and the operation groups.
pub type SharedRecord = Arc<AuditLogRecord>;

/// Canonical actions with a built-in presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalAction {
    Created,
    Updated,
    StatusChanged,
    Deleted,
}

/// Action recorded by an audit entry
///
/// Entity types may log their own tags (e.g. `document_attached`); those are
/// kept verbatim in [`AuditAction::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuditAction {
    Created,
    Updated,
    StatusChanged,
    Deleted,
    Custom(String),
}

impl AuditAction {
    pub fn as_str(&self) -> &str {
        match self {
            AuditAction::Created => "created",
            AuditAction::Updated => "updated",
            AuditAction::StatusChanged => "status_changed",
            AuditAction::Deleted => "deleted",
            AuditAction::Custom(tag) => tag,
        }
    }

    pub fn canonical(&self) -> Option<CanonicalAction> {
        match self {
            AuditAction::Created => Some(CanonicalAction::Created),
            AuditAction::Updated => Some(CanonicalAction::Updated),
            AuditAction::StatusChanged => Some(CanonicalAction::StatusChanged),
            AuditAction::Deleted => Some(CanonicalAction::Deleted),
            AuditAction::Custom(_) => None,
        }
    }
}

impl From<&str> for AuditAction {
    fn from(tag: &str) -> Self {
        match tag {
            "created" => AuditAction::Created,
            "updated" => AuditAction::Updated,
            "status_changed" => AuditAction::StatusChanged,
            "deleted" => AuditAction::Deleted,
            other => AuditAction::Custom(other.to_string()),
        }
    }
}

impl From<String> for AuditAction {
    fn from(tag: String) -> Self {
        match AuditAction::from(tag.as_str()) {
            AuditAction::Custom(_) => AuditAction::Custom(tag),
            canonical => canonical,
        }
    }
}

impl From<AuditAction> for String {
    fn from(action: AuditAction) -> Self {
        match action {
            AuditAction::Custom(tag) => tag,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of a single field before or after a change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    /// Composite value kept as its canonical JSON serialization
    Opaque(String),
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => FieldValue::Number(n),
            Value::String(s) => FieldValue::Text(s),
            composite @ (Value::Array(_) | Value::Object(_)) => {
                FieldValue::Opaque(sort_keys(composite).to_string())
            }
        }
    }
}

/// Rebuild objects with their keys in order so equal values serialize equally
fn sort_keys(value: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sort_keys(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        scalar => scalar,
    }
}

/// Identity responsible for a change
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Actor {
    pub user_id: Option<String>,
    pub email: String,
    pub full_name: Option<String>,
}

impl Actor {
    /// Name to show in a timeline (full name, falling back to email)
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// A normalized field-level change record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditLogRecord {
    pub id: Uuid,
    pub actor: Actor,
    pub action: AuditAction,
    pub changed_fields: Vec<String>,
    pub old_values: BTreeMap<String, FieldValue>,
    pub new_values: BTreeMap<String, FieldValue>,
    pub timestamp: DateTime<Utc>,
    /// Record kind (table) the entry came from in a unified timeline
    pub source: Option<String>,
    /// Id of the mutated row
    pub entity_id: Option<String>,
}

impl AuditLogRecord {
    pub fn old_value(&self, field: &str) -> Option<&FieldValue> {
        self.old_values.get(field)
    }

    pub fn new_value(&self, field: &str) -> Option<&FieldValue> {
        self.new_values.get(field)
    }

    pub fn has_changed_fields(&self) -> bool {
        !self.changed_fields.is_empty()
    }
}

/// Nested actor object as returned by some store views
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawActor {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Audit entry exactly as supplied by a log loader
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAuditEntry {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_full_name: Option<String>,
    #[serde(default)]
    pub user: Option<RawActor>,
    pub action: String,
    /// Either a list of names or an object of `name -> bool`
    #[serde(default)]
    pub changed_fields: Option<serde_json::Value>,
    #[serde(default)]
    pub old_values: Option<serde_json::Value>,
    #[serde(default)]
    pub new_values: Option<serde_json::Value>,
    pub created_at: String,
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}
