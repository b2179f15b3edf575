//! Audit trail services

pub mod diff;
pub mod filter;
pub mod grouping;
pub mod loader;
pub mod memo;
pub mod normalizer;
pub mod store;
pub mod strategy;
pub mod timeline;

pub use diff::{build_group_view, build_timeline, field_changes};
pub use filter::{filter_records, matches_criteria};
pub use grouping::{group_operations, GroupingOptions, DEFAULT_GROUPING_WINDOW_MS};
pub use loader::{loader_fn, CompositeLoader, FnLoader, LogLoader};
pub use memo::{Memo, MemoStats};
pub use normalizer::{normalize_entries, normalize_entry, parse_timestamp};
pub use store::{RestLogLoader, StoreClient};
pub use strategy::{
    DefaultFormatting, StrategyConfig, StrategyRegistry, StrategyResolver,
};
pub use timeline::{AuditTrailView, LoadOutcome};
