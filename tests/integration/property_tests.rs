//! Property tests for the filter pipeline and the operation grouper.

use std::collections::HashSet;

use proptest::prelude::*;

use dossier_audit::models::{FilterCriteria, FilterField, SharedRecord};
use dossier_audit::services::{filter_records, group_operations, GroupingOptions};

use crate::common::*;

const ACTORS: [&str; 3] = ["ana@empresa.cl", "luis@empresa.cl", "sofia@empresa.cl"];
const ACTIONS: [&str; 4] = ["created", "updated", "status_changed", "deleted"];
const DAY_MS: i64 = 86_400_000;

fn build_records(specs: &[(i64, usize, usize)]) -> Vec<SharedRecord> {
    let factory = AuditEntryFactory::new();
    specs
        .iter()
        .map(|(offset, actor, action)| {
            factory
                .create()
                .by(ACTORS[*actor])
                .action(ACTIONS[*action])
                .at_ms(*offset)
                .record()
        })
        .collect()
}

fn record_specs() -> impl Strategy<Value = Vec<(i64, usize, usize)>> {
    prop::collection::vec((0..2 * DAY_MS, 0..ACTORS.len(), 0..ACTIONS.len()), 0..40)
}

fn criteria() -> impl Strategy<Value = FilterCriteria> {
    let from = prop::option::of(14u32..=17);
    let to = prop::option::of(14u32..=17);
    let action = prop::option::of(0..ACTIONS.len());
    let actor = prop::option::of(prop::sample::select(vec!["ANA", "empresa.cl", "sofia", "nadie"]));
    (from, to, action, actor, -720i32..=720).prop_map(|(from, to, action, actor, offset)| {
        let mut criteria = FilterCriteria::with_offset_minutes(offset);
        let date = |d: u32| Some(format!("2024-01-{:02}", d));
        if let Some(d) = from {
            criteria.apply(FilterField::DateFrom(date(d))).unwrap();
        }
        if let Some(d) = to {
            criteria.apply(FilterField::DateTo(date(d))).unwrap();
        }
        if let Some(a) = action {
            criteria.apply(FilterField::Action(ACTIONS[a].to_string())).unwrap();
        }
        if let Some(text) = actor {
            criteria.apply(FilterField::ActorText(text.to_string())).unwrap();
        }
        criteria
    })
}

fn ids(records: &[SharedRecord]) -> Vec<uuid::Uuid> {
    records.iter().map(|r| r.id).collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: Filtering twice with the same criteria equals filtering once.
    #[test]
    fn property_filter_is_idempotent(specs in record_specs(), criteria in criteria()) {
        let records = build_records(&specs);
        let once = filter_records(&records, &criteria);
        let twice = filter_records(&once, &criteria);
        prop_assert_eq!(ids(&once), ids(&twice));
    }

    /// PROPERTY: Filtering keeps a subsequence of its input, in input order.
    #[test]
    fn property_filter_preserves_order(specs in record_specs(), criteria in criteria()) {
        let records = build_records(&specs);
        let filtered = ids(&filter_records(&records, &criteria));

        let mut remaining = ids(&records).into_iter();
        for id in &filtered {
            prop_assert!(remaining.any(|candidate| candidate == *id));
        }
    }

    /// PROPERTY: With grouping disabled every record is its own group.
    #[test]
    fn property_disabled_grouping_yields_singletons(specs in record_specs()) {
        let records = build_records(&specs);
        let groups = group_operations(&records, GroupingOptions::disabled());

        prop_assert_eq!(groups.len(), records.len());
        for (group, record) in groups.iter().zip(&records) {
            prop_assert_eq!(group.len(), 1);
            prop_assert_eq!(group.id, record.id);
        }
    }

    /// PROPERTY: Groups partition the input; members share actor and action
    /// and sit strictly inside the window around their anchor.
    #[test]
    fn property_groups_are_homogeneous_and_anchored(
        specs in record_specs(),
        window_ms in 1u64..120_000,
    ) {
        let records = build_records(&specs);
        let groups = group_operations(&records, GroupingOptions::with_window_ms(window_ms));

        let mut seen = HashSet::new();
        for group in &groups {
            let anchor = group.anchor();
            prop_assert_eq!(group.id, anchor.id);
            prop_assert_eq!(group.anchor_timestamp, anchor.timestamp);
            for member in &group.members {
                prop_assert!(seen.insert(member.id));
                prop_assert_eq!(&member.actor.email, &anchor.actor.email);
                prop_assert_eq!(&member.action, &anchor.action);
                let distance = (member.timestamp - anchor.timestamp).num_milliseconds().unsigned_abs();
                prop_assert!(member.id == anchor.id || distance < window_ms);
            }
        }
        prop_assert_eq!(seen.len(), records.len());

        // Groups are emitted in the order their anchors were first seen.
        let anchors: Vec<_> = groups.iter().map(|g| g.id).collect();
        let input_order: Vec<_> = ids(&records)
            .into_iter()
            .filter(|id| anchors.contains(id))
            .collect();
        prop_assert_eq!(anchors, input_order);
    }
}
