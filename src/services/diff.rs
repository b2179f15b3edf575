//! Diff view-model builder
//!
//! Turns operation groups into render-ready [`GroupView`]s using the resolved
//! strategy for the entity type.

use crate::models::{AuditAction, AuditLogRecord, FieldChange, GroupView, OperationGroup};
use crate::services::strategy::StrategyResolver;

/// `(label, old, new)` triples for every visible changed field of a record
pub fn field_changes(record: &AuditLogRecord, strategy: &StrategyResolver) -> Vec<FieldChange> {
    record
        .changed_fields
        .iter()
        .filter(|field| strategy.is_visible(field, record))
        .map(|field| FieldChange {
            field: field.clone(),
            label: strategy.field_label(field, record),
            old_value: strategy.format_value(record.old_value(field), field, record),
            new_value: strategy.format_value(record.new_value(field), field, record),
        })
        .collect()
}

/// Narrative for groups that have nothing to diff (plain creations and
/// deletions)
fn group_narrative(group: &OperationGroup, strategy: &StrategyResolver) -> Option<String> {
    if group.members.iter().any(|member| member.has_changed_fields()) {
        return None;
    }
    match group.action {
        AuditAction::Created => strategy.created_message(group.anchor()),
        AuditAction::Deleted => strategy.deleted_message(group.anchor()),
        _ => None,
    }
}

pub fn build_group_view(group: &OperationGroup, strategy: &StrategyResolver) -> GroupView {
    let changes = group
        .members
        .iter()
        .flat_map(|member| field_changes(member, strategy))
        .collect();

    GroupView {
        id: group.id,
        actor: group.actor.clone(),
        action: group.action.as_str().to_string(),
        presentation: strategy.action_presentation(&group.action),
        anchor_timestamp: group.anchor_timestamp,
        member_count: group.len(),
        changes,
        narrative: group_narrative(group, strategy),
        badge: strategy.badge(group.anchor()),
    }
}

pub fn build_timeline(groups: &[OperationGroup], strategy: &StrategyResolver) -> Vec<GroupView> {
    groups
        .iter()
        .map(|group| build_group_view(group, strategy))
        .collect()
}
