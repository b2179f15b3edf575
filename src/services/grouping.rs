//! Operation grouper
//!
//! Clusters field-change records into logical operations with a single greedy
//! pass. A record joins the first group whose *anchor* is within the window
//! and shares its actor email and action; membership is never re-evaluated
//! against later members, so the clustering is not transitive.

use serde::{Deserialize, Serialize};

use crate::models::{AuditLogRecord, OperationGroup, SharedRecord};

pub const DEFAULT_GROUPING_WINDOW_MS: u64 = 5000;

/// Grouping behaviour for one entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingOptions {
    pub enabled: bool,
    pub window_ms: u64,
}

impl Default for GroupingOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: DEFAULT_GROUPING_WINDOW_MS,
        }
    }
}

impl GroupingOptions {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_window_ms(window_ms: u64) -> Self {
        Self {
            enabled: true,
            window_ms,
        }
    }
}

/// Whether `record` belongs to `group` under the anchor rule
pub fn accepts(group: &OperationGroup, record: &AuditLogRecord, window_ms: u64) -> bool {
    let distance = (group.anchor_timestamp - record.timestamp)
        .num_milliseconds()
        .unsigned_abs();
    distance < window_ms && group.actor.email == record.actor.email && group.action == record.action
}

/// Cluster `records` (in fetch order) into operation groups, emitted in
/// first-seen order.
pub fn group_operations(records: &[SharedRecord], options: GroupingOptions) -> Vec<OperationGroup> {
    if !options.enabled {
        return records
            .iter()
            .cloned()
            .map(OperationGroup::anchored)
            .collect();
    }

    let mut groups: Vec<OperationGroup> = Vec::new();
    for record in records {
        match groups
            .iter()
            .position(|group| accepts(group, record, options.window_ms))
        {
            Some(index) => groups[index].members.push(record.clone()),
            None => groups.push(OperationGroup::anchored(record.clone())),
        }
    }
    groups
}
