//! Test factories for generating test data
//!
//! Factories create randomized audit entries, useful for property-based
//! testing and when you need unique data for each test.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use rand::Rng;
use serde_json::{Map, Value};
use uuid::Uuid;

use dossier_audit::models::{RawAuditEntry, SharedRecord};
use dossier_audit::services::normalize_entries;

/// Base instant every factory offset is measured from
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
}

/// Factory for creating raw audit entries
pub struct AuditEntryFactory {
    counter: AtomicU64,
}

impl Default for AuditEntryFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditEntryFactory {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    /// Start an `updated` entry by a random actor at the base instant
    pub fn create(&self) -> RawEntryBuilder {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        RawEntryBuilder {
            id: Uuid::new_v4(),
            email: SafeEmail().fake(),
            full_name: Some(Name().fake()),
            action: "updated".to_string(),
            at: base_time(),
            changes: Vec::new(),
            source: None,
            record_id: Some(format!("record-{}", n)),
        }
    }

    /// Random entries spread over a day, newest first
    pub fn random_batch(&self, count: usize) -> Vec<RawAuditEntry> {
        let mut rng = rand::thread_rng();
        let actors = ["ana@empresa.cl", "luis@empresa.cl", "sofia@empresa.cl"];
        let actions = ["created", "updated", "status_changed", "deleted"];

        let mut entries: Vec<(i64, RawAuditEntry)> = (0..count)
            .map(|_| {
                let offset_ms = rng.gen_range(0..86_400_000i64);
                let entry = self
                    .create()
                    .by(actors[rng.gen_range(0..actors.len())])
                    .action(actions[rng.gen_range(0..actions.len())])
                    .at_ms(offset_ms)
                    .change("estado", "pendiente", "aprobado")
                    .build();
                (offset_ms, entry)
            })
            .collect();
        entries.sort_by_key(|(offset, _)| std::cmp::Reverse(*offset));
        entries.into_iter().map(|(_, entry)| entry).collect()
    }
}

/// Builder for raw audit entries
pub struct RawEntryBuilder {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub action: String,
    pub at: DateTime<Utc>,
    pub changes: Vec<(String, Value, Value)>,
    pub source: Option<String>,
    pub record_id: Option<String>,
}

impl RawEntryBuilder {
    pub fn by(mut self, email: &str) -> Self {
        self.email = email.to_string();
        self
    }

    pub fn action(mut self, action: &str) -> Self {
        self.action = action.to_string();
        self
    }

    /// Milliseconds after [`base_time`]
    pub fn at_ms(mut self, offset_ms: i64) -> Self {
        self.at = base_time() + Duration::milliseconds(offset_ms);
        self
    }

    pub fn change(mut self, field: &str, old: impl Into<Value>, new: impl Into<Value>) -> Self {
        self.changes.push((field.to_string(), old.into(), new.into()));
        self
    }

    pub fn build(self) -> RawAuditEntry {
        let mut old_values = Map::new();
        let mut new_values = Map::new();
        let mut changed = Vec::new();
        for (field, old, new) in self.changes {
            changed.push(Value::String(field.clone()));
            old_values.insert(field.clone(), old);
            new_values.insert(field, new);
        }

        RawAuditEntry {
            id: self.id.to_string(),
            user_email: Some(self.email),
            user_full_name: self.full_name,
            action: self.action,
            changed_fields: Some(Value::Array(changed)),
            old_values: Some(Value::Object(old_values)),
            new_values: Some(Value::Object(new_values)),
            created_at: self.at.to_rfc3339(),
            record_id: self.record_id,
            source: self.source,
            ..Default::default()
        }
    }

    pub fn record(self) -> SharedRecord {
        let mut records = normalize_entries(vec![self.build()]);
        assert_eq!(records.len(), 1, "factory entry failed to normalize");
        records.remove(0)
    }
}
