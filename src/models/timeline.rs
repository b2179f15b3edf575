//! Timeline models: filter criteria, operation groups and the view-models
//! handed to the presentation surface.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::audit::{Actor, AuditAction, SharedRecord};
use crate::utils::validation::{parse_date_input, validate_action_tag};
use crate::utils::{AppError, AppResult};

/// Action dimension of the filter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionFilter {
    #[default]
    All,
    Only(String),
}

impl ActionFilter {
    pub fn matches(&self, action: &AuditAction) -> bool {
        match self {
            ActionFilter::All => true,
            ActionFilter::Only(tag) => action.as_str() == tag,
        }
    }
}

impl From<&str> for ActionFilter {
    fn from(tag: &str) -> Self {
        match tag {
            "" | "all" => ActionFilter::All,
            other => ActionFilter::Only(other.to_string()),
        }
    }
}

impl From<String> for ActionFilter {
    fn from(tag: String) -> Self {
        ActionFilter::from(tag.as_str())
    }
}

impl From<ActionFilter> for String {
    fn from(filter: ActionFilter) -> Self {
        match filter {
            ActionFilter::All => "all".to_string(),
            ActionFilter::Only(tag) => tag,
        }
    }
}

/// Criteria applied to the fetched records before grouping
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    /// Inclusive: covers the whole calendar day
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
    #[serde(default)]
    pub action_filter: ActionFilter,
    #[serde(default)]
    pub actor_text: Option<String>,
    /// Offset of the calendar the date bounds refer to
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

/// A single filter field update issued by the presentation surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterField {
    DateFrom(Option<String>),
    DateTo(Option<String>),
    Action(String),
    ActorText(String),
}

impl FilterCriteria {
    pub fn with_offset_minutes(utc_offset_minutes: i32) -> Self {
        Self {
            utc_offset_minutes,
            ..Self::default()
        }
    }

    /// Apply one field update. Invalid input is rejected and leaves the
    /// criteria untouched.
    pub fn apply(&mut self, field: FilterField) -> AppResult<()> {
        match field {
            FilterField::DateFrom(input) => {
                self.date_from = parse_optional_date(input.as_deref())?;
            }
            FilterField::DateTo(input) => {
                self.date_to = parse_optional_date(input.as_deref())?;
            }
            FilterField::Action(tag) => {
                let filter = ActionFilter::from(tag);
                if let ActionFilter::Only(ref tag) = filter {
                    if !validate_action_tag(tag) {
                        return Err(AppError::invalid_filter(format!(
                            "'{}' is not a valid action tag",
                            tag
                        )));
                    }
                }
                self.action_filter = filter;
            }
            FilterField::ActorText(text) => {
                self.actor_text = if text.is_empty() { None } else { Some(text) };
            }
        }
        Ok(())
    }

    /// Reset every filter dimension, keeping the calendar offset
    pub fn clear(&mut self) {
        *self = Self::with_offset_minutes(self.utc_offset_minutes);
    }

    pub fn is_active(&self) -> bool {
        self.date_from.is_some()
            || self.date_to.is_some()
            || self.action_filter != ActionFilter::All
            || self.actor_needle().is_some()
    }

    pub fn offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }

    /// Start of `date_from` in the criteria's calendar
    pub fn lower_bound(&self) -> Option<DateTime<Utc>> {
        let start = self.date_from?.and_hms_opt(0, 0, 0)?;
        self.localize(start)
    }

    /// 23:59:59.999 of `date_to` in the criteria's calendar
    pub fn upper_bound(&self) -> Option<DateTime<Utc>> {
        let end = self.date_to?.and_hms_milli_opt(23, 59, 59, 999)?;
        self.localize(end)
    }

    /// Lowercased actor text, `None` when it does not restrict anything
    pub fn actor_needle(&self) -> Option<String> {
        self.actor_text
            .as_deref()
            .filter(|text| !text.is_empty())
            .map(str::to_lowercase)
    }

    fn localize(&self, local: chrono::NaiveDateTime) -> Option<DateTime<Utc>> {
        self.offset()
            .from_local_datetime(&local)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

fn parse_optional_date(input: Option<&str>) -> AppResult<Option<NaiveDate>> {
    match input.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => parse_date_input(text).map(Some),
    }
}

/// Field-change records judged to be one logical user action
#[derive(Debug, Clone)]
pub struct OperationGroup {
    /// Id of the anchor (first) record
    pub id: Uuid,
    pub actor: Actor,
    pub action: AuditAction,
    pub anchor_timestamp: DateTime<Utc>,
    pub members: Vec<SharedRecord>,
}

impl OperationGroup {
    /// Open a group anchored at `record`
    pub fn anchored(record: SharedRecord) -> Self {
        Self {
            id: record.id,
            actor: record.actor.clone(),
            action: record.action.clone(),
            anchor_timestamp: record.timestamp,
            members: vec![record],
        }
    }

    pub fn anchor(&self) -> &SharedRecord {
        &self.members[0]
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Visual decoration attached to a group (e.g. the record kind in a unified
/// timeline)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoration {
    pub label: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl Decoration {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Resolved label, color and icon for an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionPresentation {
    pub label: String,
    pub color: String,
    pub icon: String,
}

/// One rendered `(label, old, new)` triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub label: String,
    pub old_value: String,
    pub new_value: String,
}

/// Render-ready view of an operation group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupView {
    pub id: Uuid,
    pub actor: Actor,
    pub action: String,
    pub presentation: ActionPresentation,
    pub anchor_timestamp: DateTime<Utc>,
    pub member_count: usize,
    pub changes: Vec<FieldChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<Decoration>,
}

/// Lifecycle of an audit trail view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewState {
    Idle,
    Loading,
    Loaded,
}

/// Everything the presentation surface needs for one render pass
#[derive(Debug, Clone, Serialize)]
pub struct TimelineSnapshot {
    pub entity_type: String,
    pub state: ViewState,
    pub criteria: FilterCriteria,
    pub total_records: usize,
    pub filtered_records: usize,
    pub groups: Vec<GroupView>,
}

impl TimelineSnapshot {
    /// Message for an empty timeline, `None` when there is something to show
    pub fn empty_message(&self) -> Option<&'static str> {
        match (self.state, self.groups.is_empty()) {
            (ViewState::Loaded, true) if self.total_records == 0 => {
                Some("No hay registros de auditoría")
            }
            (ViewState::Loaded, true) => Some("Ningún registro coincide con los filtros"),
            _ => None,
        }
    }
}
