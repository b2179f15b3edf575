//! Test world for Cucumber scenarios

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use cucumber::World;
use serde_json::{json, Value};
use uuid::Uuid;

use dossier_audit::models::{FilterCriteria, FilterField, RawAuditEntry, TimelineSnapshot};
use dossier_audit::services::{
    loader_fn, AuditTrailView, GroupingOptions, LogLoader, StrategyConfig, StrategyResolver,
};

/// Test world that maintains state across scenario steps
#[derive(Debug, Default, World)]
pub struct TestWorld {
    /// Raw log the scenario's loader returns, in fetch order
    pub entries: Vec<RawAuditEntry>,

    /// Simulate a failing store
    pub store_unavailable: bool,

    /// Grouping options for the entity type
    pub grouping: GroupingOptions,

    /// Fields the entity strategy hides
    pub hidden_fields: Vec<String>,

    /// Filter criteria of the session
    pub criteria: FilterCriteria,

    /// Error from the last rejected filter update
    pub last_error: Option<String>,

    /// Snapshot from the last time the trail was opened
    pub snapshot: Option<TimelineSnapshot>,
}

impl TestWorld {
    /// Instant scenario offsets are measured from
    pub fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
    }

    /// Append an entry changing one field
    pub fn record_change(&mut self, email: &str, action: &str, field: &str, at: DateTime<Utc>) {
        let n = self.entries.len();
        let (old, new): (Value, Value) = match action {
            "status_changed" => (json!(false), json!(true)),
            _ => (json!(format!("{}-antes", n)), json!(format!("{}-despues", n))),
        };
        self.entries.push(RawAuditEntry {
            id: Uuid::new_v4().to_string(),
            user_email: Some(email.to_string()),
            action: action.to_string(),
            changed_fields: Some(json!([field])),
            old_values: Some(json!({ field: old })),
            new_values: Some(json!({ field: new })),
            created_at: at.to_rfc3339(),
            ..Default::default()
        });
    }

    pub fn record_change_at_ms(&mut self, email: &str, action: &str, field: &str, offset_ms: i64) {
        let at = Self::base_time() + Duration::milliseconds(offset_ms);
        self.record_change(email, action, field, at);
    }

    /// Apply a filter update the way the view does, keeping the error
    pub fn apply_filter(&mut self, field: FilterField) {
        self.last_error = self.criteria.apply(field).err().map(|e| e.to_string());
    }

    /// Open a fresh view over the scenario log and keep its snapshot
    pub async fn open_trail(&mut self) {
        let entries = self.entries.clone();
        let failing = self.store_unavailable;
        let loader: Arc<dyn LogLoader> = Arc::new(loader_fn(move || {
            let entries = entries.clone();
            async move {
                if failing {
                    anyhow::bail!("connection refused");
                }
                Ok::<_, anyhow::Error>(entries)
            }
        }));

        let strategy = StrategyResolver::new(
            StrategyConfig::new().with_hidden_fields(self.hidden_fields.clone()),
        )
        .with_grouping_defaults(self.grouping);

        let view =
            AuditTrailView::with_criteria("empresa", loader, strategy, self.criteria.clone());
        view.open().await;
        self.snapshot = Some(view.snapshot().await);
    }

    pub fn snapshot(&self) -> &TimelineSnapshot {
        self.snapshot
            .as_ref()
            .expect("the audit trail has not been opened")
    }
}
