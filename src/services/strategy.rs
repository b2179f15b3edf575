//! Strategy resolution
//!
//! Each entity type may override how field names, values, actions and
//! narratives are presented. [`StrategyConfig`] holds the optional overrides;
//! [`StrategyResolver`] composes them with the built-in defaults, one concern
//! at a time, so a missing override never disables the others.
//!
//! Caller-supplied functions must be pure. A function that returns
//! [`FormatError`] only affects its own output: the resolver logs the failure
//! and substitutes the default for that call.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::warn;

use crate::config::{AppConfig, EntityProfile, TimelineConfig};
use crate::models::{
    ActionPresentation, AuditAction, AuditLogRecord, CanonicalAction, Decoration, FieldValue,
};
use crate::services::grouping::GroupingOptions;
use crate::utils::FormatError;

pub type FieldNameResolver =
    Arc<dyn Fn(&str, &AuditLogRecord) -> Result<String, FormatError> + Send + Sync>;
pub type ValueFormatter =
    Arc<dyn Fn(&FieldValue, &str, &AuditLogRecord) -> Result<String, FormatError> + Send + Sync>;
pub type FieldVisibility = Arc<dyn Fn(&str, &AuditLogRecord) -> bool + Send + Sync>;
pub type NarrativeBuilder =
    Arc<dyn Fn(&AuditLogRecord) -> Result<String, FormatError> + Send + Sync>;
pub type BadgeBuilder = Arc<dyn Fn(&AuditLogRecord) -> Option<Decoration> + Send + Sync>;

/// Built-in presentation of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionStyle {
    pub label: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
}

static DEFAULT_ACTION_STYLES: Lazy<HashMap<CanonicalAction, ActionStyle>> = Lazy::new(|| {
    HashMap::from([
        (
            CanonicalAction::Created,
            ActionStyle {
                label: "Creado",
                color: "green",
                icon: "plus-circle",
            },
        ),
        (
            CanonicalAction::Updated,
            ActionStyle {
                label: "Actualizado",
                color: "blue",
                icon: "pencil",
            },
        ),
        (
            CanonicalAction::StatusChanged,
            ActionStyle {
                label: "Cambio de estado",
                color: "orange",
                icon: "arrow-right-left",
            },
        ),
        (
            CanonicalAction::Deleted,
            ActionStyle {
                label: "Eliminado",
                color: "red",
                icon: "trash",
            },
        ),
    ])
});

pub static UNKNOWN_ACTION_STYLE: ActionStyle = ActionStyle {
    label: "Acción desconocida",
    color: "gray",
    icon: "help-circle",
};

static NULL_VALUE: FieldValue = FieldValue::Null;

/// Built-in style for an action; custom tags get the unknown-action entry
pub fn default_action_style(action: &AuditAction) -> &'static ActionStyle {
    action
        .canonical()
        .and_then(|canonical| DEFAULT_ACTION_STYLES.get(&canonical))
        .unwrap_or(&UNKNOWN_ACTION_STYLE)
}

/// `snake_case` field name to `Title Case`
pub fn humanize_field_name(field: &str) -> String {
    field
        .split('_')
        .filter(|token| !token.is_empty())
        .map(|token| {
            let mut chars = token.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Localized tokens used by the default value formatter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultFormatting {
    pub yes_token: String,
    pub no_token: String,
    pub empty_value: String,
}

impl Default for DefaultFormatting {
    fn default() -> Self {
        Self {
            yes_token: "Sí".to_string(),
            no_token: "No".to_string(),
            empty_value: "N/A".to_string(),
        }
    }
}

impl DefaultFormatting {
    pub fn from_config(config: &TimelineConfig) -> Self {
        Self {
            yes_token: config.yes_token.clone(),
            no_token: config.no_token.clone(),
            empty_value: config.empty_value.clone(),
        }
    }

    /// Default value formatter; an absent value renders like `Null`
    pub fn format(&self, value: Option<&FieldValue>) -> String {
        match value.unwrap_or(&NULL_VALUE) {
            FieldValue::Null => self.empty_value.clone(),
            FieldValue::Bool(true) => self.yes_token.clone(),
            FieldValue::Bool(false) => self.no_token.clone(),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Opaque(serialized) => serialized.clone(),
        }
    }
}

/// Per-entity overrides. Every field is optional and resolves independently.
#[derive(Clone, Default)]
pub struct StrategyConfig {
    pub field_name_resolver: Option<FieldNameResolver>,
    pub value_formatter: Option<ValueFormatter>,
    pub field_visibility: Option<FieldVisibility>,
    pub action_labels: HashMap<String, String>,
    pub action_colors: HashMap<String, String>,
    pub action_icons: HashMap<String, String>,
    pub created_message: Option<NarrativeBuilder>,
    pub deleted_message: Option<NarrativeBuilder>,
    pub additional_badge: Option<BadgeBuilder>,
    pub grouping_enabled: Option<bool>,
    pub grouping_window_ms: Option<u64>,
}

impl fmt::Debug for StrategyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyConfig")
            .field("field_name_resolver", &self.field_name_resolver.is_some())
            .field("value_formatter", &self.value_formatter.is_some())
            .field("field_visibility", &self.field_visibility.is_some())
            .field("action_labels", &self.action_labels)
            .field("action_colors", &self.action_colors)
            .field("action_icons", &self.action_icons)
            .field("created_message", &self.created_message.is_some())
            .field("deleted_message", &self.deleted_message.is_some())
            .field("additional_badge", &self.additional_badge.is_some())
            .field("grouping_enabled", &self.grouping_enabled)
            .field("grouping_window_ms", &self.grouping_window_ms)
            .finish()
    }
}

impl StrategyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_names<F>(mut self, resolve: F) -> Self
    where
        F: Fn(&str, &AuditLogRecord) -> Result<String, FormatError> + Send + Sync + 'static,
    {
        self.field_name_resolver = Some(Arc::new(resolve));
        self
    }

    /// Resolve labels from a static dictionary, humanizing unknown fields
    pub fn with_field_labels(self, labels: HashMap<String, String>) -> Self {
        self.with_field_names(move |field, _| {
            Ok(labels
                .get(field)
                .cloned()
                .unwrap_or_else(|| humanize_field_name(field)))
        })
    }

    pub fn with_value_formatter<F>(mut self, format: F) -> Self
    where
        F: Fn(&FieldValue, &str, &AuditLogRecord) -> Result<String, FormatError>
            + Send
            + Sync
            + 'static,
    {
        self.value_formatter = Some(Arc::new(format));
        self
    }

    pub fn with_field_visibility<F>(mut self, visible: F) -> Self
    where
        F: Fn(&str, &AuditLogRecord) -> bool + Send + Sync + 'static,
    {
        self.field_visibility = Some(Arc::new(visible));
        self
    }

    /// Hide a fixed set of fields (e.g. `updated_at`, foreign keys)
    pub fn with_hidden_fields<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let hidden: HashSet<String> = fields.into_iter().map(Into::into).collect();
        self.with_field_visibility(move |field, _| !hidden.contains(field))
    }

    pub fn with_action_label(mut self, action: impl Into<String>, label: impl Into<String>) -> Self {
        self.action_labels.insert(action.into(), label.into());
        self
    }

    pub fn with_action_color(mut self, action: impl Into<String>, color: impl Into<String>) -> Self {
        self.action_colors.insert(action.into(), color.into());
        self
    }

    pub fn with_action_icon(mut self, action: impl Into<String>, icon: impl Into<String>) -> Self {
        self.action_icons.insert(action.into(), icon.into());
        self
    }

    pub fn with_created_message<F>(mut self, build: F) -> Self
    where
        F: Fn(&AuditLogRecord) -> Result<String, FormatError> + Send + Sync + 'static,
    {
        self.created_message = Some(Arc::new(build));
        self
    }

    pub fn with_deleted_message<F>(mut self, build: F) -> Self
    where
        F: Fn(&AuditLogRecord) -> Result<String, FormatError> + Send + Sync + 'static,
    {
        self.deleted_message = Some(Arc::new(build));
        self
    }

    pub fn with_badge<F>(mut self, badge: F) -> Self
    where
        F: Fn(&AuditLogRecord) -> Option<Decoration> + Send + Sync + 'static,
    {
        self.additional_badge = Some(Arc::new(badge));
        self
    }

    pub fn with_grouping_enabled(mut self, enabled: bool) -> Self {
        self.grouping_enabled = Some(enabled);
        self
    }

    pub fn with_grouping_window_ms(mut self, window_ms: u64) -> Self {
        self.grouping_window_ms = Some(window_ms);
        self
    }

    /// Build the overrides described by a configured entity profile
    pub fn from_profile(profile: &EntityProfile) -> Self {
        let mut config = Self::new();

        if !profile.field_labels.is_empty() {
            config = config.with_field_labels(profile.field_labels.clone());
        }
        if !profile.hidden_fields.is_empty() {
            config = config.with_hidden_fields(profile.hidden_fields.clone());
        }
        for (action, label) in &profile.action_labels {
            config = config.with_action_label(action.clone(), label.clone());
        }
        config.grouping_enabled = profile.grouping_enabled;
        config.grouping_window_ms = profile.grouping_window_ms;

        let mut badges: HashMap<String, Decoration> = profile
            .children
            .iter()
            .map(|child| (child.table.clone(), child.badge.clone()))
            .collect();
        if let Some(ref badge) = profile.badge {
            badges.insert(profile.table.clone(), badge.clone());
        }
        if !badges.is_empty() {
            config = config.with_badge(move |record| {
                record
                    .source
                    .as_ref()
                    .and_then(|source| badges.get(source))
                    .cloned()
            });
        }

        config
    }
}

/// Overrides composed with the built-in defaults
#[derive(Debug, Clone, Default)]
pub struct StrategyResolver {
    config: StrategyConfig,
    defaults: DefaultFormatting,
    grouping: GroupingOptions,
}

impl StrategyResolver {
    pub fn new(config: StrategyConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_defaults(mut self, defaults: DefaultFormatting) -> Self {
        self.defaults = defaults;
        self
    }

    /// Grouping used when the entity config does not override it
    pub fn with_grouping_defaults(mut self, grouping: GroupingOptions) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn grouping(&self) -> GroupingOptions {
        GroupingOptions {
            enabled: self.config.grouping_enabled.unwrap_or(self.grouping.enabled),
            window_ms: self.config.grouping_window_ms.unwrap_or(self.grouping.window_ms),
        }
    }

    pub fn field_label(&self, field: &str, record: &AuditLogRecord) -> String {
        match self.config.field_name_resolver {
            Some(ref resolve) => resolve(field, record).unwrap_or_else(|e| {
                warn!(
                    "Field name resolver failed for '{}' on record {}: {}",
                    field, record.id, e
                );
                humanize_field_name(field)
            }),
            None => humanize_field_name(field),
        }
    }

    pub fn format_value(
        &self,
        value: Option<&FieldValue>,
        field: &str,
        record: &AuditLogRecord,
    ) -> String {
        match self.config.value_formatter {
            Some(ref format) => {
                format(value.unwrap_or(&NULL_VALUE), field, record).unwrap_or_else(|e| {
                    warn!(
                        "Value formatter failed for '{}' on record {}: {}",
                        field, record.id, e
                    );
                    self.defaults.format(value)
                })
            }
            None => self.defaults.format(value),
        }
    }

    pub fn is_visible(&self, field: &str, record: &AuditLogRecord) -> bool {
        self.config
            .field_visibility
            .as_ref()
            .map_or(true, |visible| visible(field, record))
    }

    pub fn action_presentation(&self, action: &AuditAction) -> ActionPresentation {
        let style = default_action_style(action);
        let tag = action.as_str();
        ActionPresentation {
            label: self
                .config
                .action_labels
                .get(tag)
                .cloned()
                .unwrap_or_else(|| style.label.to_string()),
            color: self
                .config
                .action_colors
                .get(tag)
                .cloned()
                .unwrap_or_else(|| style.color.to_string()),
            icon: self
                .config
                .action_icons
                .get(tag)
                .cloned()
                .unwrap_or_else(|| style.icon.to_string()),
        }
    }

    pub fn created_message(&self, record: &AuditLogRecord) -> Option<String> {
        narrative("created", self.config.created_message.as_ref(), record)
    }

    pub fn deleted_message(&self, record: &AuditLogRecord) -> Option<String> {
        narrative("deleted", self.config.deleted_message.as_ref(), record)
    }

    pub fn badge(&self, record: &AuditLogRecord) -> Option<Decoration> {
        self.config
            .additional_badge
            .as_ref()
            .and_then(|badge| badge(record))
    }
}

fn narrative(
    kind: &str,
    builder: Option<&NarrativeBuilder>,
    record: &AuditLogRecord,
) -> Option<String> {
    let build = builder?;
    match build(record) {
        Ok(message) => Some(message),
        Err(e) => {
            warn!("{} message failed for record {}: {}", kind, record.id, e);
            None
        }
    }
}

/// Strategy configs keyed by entity type
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    defaults: DefaultFormatting,
    grouping: GroupingOptions,
    strategies: HashMap<String, StrategyConfig>,
}

impl StrategyRegistry {
    pub fn new(defaults: DefaultFormatting, grouping: GroupingOptions) -> Self {
        Self {
            defaults,
            grouping,
            strategies: HashMap::new(),
        }
    }

    /// Registry seeded with every entity profile from the configuration
    pub fn from_config(config: &AppConfig) -> Self {
        let mut registry = Self::new(
            DefaultFormatting::from_config(&config.timeline),
            config.timeline.grouping(),
        );
        for (entity_type, profile) in &config.entities {
            registry.register(entity_type.clone(), StrategyConfig::from_profile(profile));
        }
        registry
    }

    pub fn register(&mut self, entity_type: impl Into<String>, config: StrategyConfig) {
        self.strategies.insert(entity_type.into(), config);
    }

    /// Layer code-defined overrides on top of an entity's current config
    pub fn customize<F>(&mut self, entity_type: &str, customize: F)
    where
        F: FnOnce(StrategyConfig) -> StrategyConfig,
    {
        let current = self.strategies.remove(entity_type).unwrap_or_default();
        self.strategies
            .insert(entity_type.to_string(), customize(current));
    }

    pub fn contains(&self, entity_type: &str) -> bool {
        self.strategies.contains_key(entity_type)
    }

    /// Resolver for an entity type; unknown types get the pure defaults
    pub fn resolve(&self, entity_type: &str) -> StrategyResolver {
        StrategyResolver::new(self.strategies.get(entity_type).cloned().unwrap_or_default())
            .with_defaults(self.defaults.clone())
            .with_grouping_defaults(self.grouping)
    }
}
