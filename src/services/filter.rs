//! Filter pipeline
//!
//! Pure reduction of a record set by date range, action and actor text. All
//! predicates are ANDed and the output keeps the input order, so the same
//! `(records, criteria)` pair always yields the same result.

use chrono::{DateTime, Utc};

use crate::models::{ActionFilter, AuditLogRecord, FilterCriteria, SharedRecord};

/// Precomputed form of [`FilterCriteria`] for evaluating many records
struct Predicate<'a> {
    lower: Option<DateTime<Utc>>,
    upper: Option<DateTime<Utc>>,
    action: &'a ActionFilter,
    needle: Option<String>,
}

impl<'a> Predicate<'a> {
    fn new(criteria: &'a FilterCriteria) -> Self {
        Self {
            lower: criteria.lower_bound(),
            upper: criteria.upper_bound(),
            action: &criteria.action_filter,
            needle: criteria.actor_needle(),
        }
    }

    fn accepts(&self, record: &AuditLogRecord) -> bool {
        if self.lower.is_some_and(|lower| record.timestamp < lower) {
            return false;
        }
        if self.upper.is_some_and(|upper| record.timestamp > upper) {
            return false;
        }
        if !self.action.matches(&record.action) {
            return false;
        }
        match self.needle.as_deref() {
            None => true,
            Some(needle) => {
                let name_matches = record
                    .actor
                    .full_name
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().contains(needle));
                name_matches || record.actor.email.to_lowercase().contains(needle)
            }
        }
    }
}

/// Return the records that satisfy every criterion, in input order
pub fn filter_records(records: &[SharedRecord], criteria: &FilterCriteria) -> Vec<SharedRecord> {
    let predicate = Predicate::new(criteria);
    records
        .iter()
        .filter(|record| predicate.accepts(record))
        .cloned()
        .collect()
}

/// Check a single record against the criteria
pub fn matches_criteria(record: &AuditLogRecord, criteria: &FilterCriteria) -> bool {
    Predicate::new(criteria).accepts(record)
}
