//! Audit trail view
//!
//! Orchestrates the load/refresh/open lifecycle of one viewer session and
//! derives the timeline from the most recently fetched records.
//!
//! Every load takes a new request generation. A response that arrives after
//! a newer load (or a close) has started is discarded, so the most recently
//! started request always wins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::models::{
    FilterCriteria, FilterField, GroupView, SharedRecord, TimelineSnapshot, ViewState,
};
use crate::services::diff::build_timeline;
use crate::services::filter::filter_records;
use crate::services::grouping::group_operations;
use crate::services::loader::LogLoader;
use crate::services::memo::{Memo, MemoStats};
use crate::services::normalizer::normalize_entries;
use crate::services::strategy::StrategyResolver;
use crate::utils::AppResult;

/// What happened to a load request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Records replaced the previous set
    Applied { records: usize },
    /// The loader failed; the view now holds no records
    Failed,
    /// A newer request started before this one resolved
    Superseded,
}

#[derive(Debug, Clone)]
struct Derived {
    filtered: usize,
    groups: Vec<GroupView>,
}

type DerivationKey = (u64, FilterCriteria);

struct ViewInner {
    state: ViewState,
    records: Arc<[SharedRecord]>,
    /// Generation of the load that produced `records`
    records_generation: u64,
    criteria: FilterCriteria,
    memo: Memo<DerivationKey, Derived>,
}

/// Audit trail of one parent entity
pub struct AuditTrailView {
    entity_type: String,
    loader: Arc<dyn LogLoader>,
    strategy: StrategyResolver,
    generation: AtomicU64,
    inner: tokio::sync::RwLock<ViewInner>,
}

impl AuditTrailView {
    pub fn new(
        entity_type: impl Into<String>,
        loader: Arc<dyn LogLoader>,
        strategy: StrategyResolver,
    ) -> Self {
        Self::with_criteria(entity_type, loader, strategy, FilterCriteria::default())
    }

    /// Start with session criteria (e.g. the configured calendar offset)
    pub fn with_criteria(
        entity_type: impl Into<String>,
        loader: Arc<dyn LogLoader>,
        strategy: StrategyResolver,
        criteria: FilterCriteria,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            loader,
            strategy,
            generation: AtomicU64::new(0),
            inner: tokio::sync::RwLock::new(ViewInner {
                state: ViewState::Idle,
                records: Arc::from(Vec::new()),
                records_generation: 0,
                criteria,
                memo: Memo::new(),
            }),
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub async fn state(&self) -> ViewState {
        self.inner.read().await.state
    }

    /// Open the view. Every open fetches afresh.
    pub async fn open(&self) -> LoadOutcome {
        self.load("open").await
    }

    /// Refetch on explicit user request
    pub async fn refresh(&self) -> LoadOutcome {
        self.load("refresh").await
    }

    /// Return to `Idle`, dropping records and any in-flight response.
    /// Filter criteria are session state and survive.
    pub async fn close(&self) {
        let mut inner = self.inner.write().await;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        inner.state = ViewState::Idle;
        inner.records = Arc::from(Vec::new());
        inner.records_generation = generation;
        debug!("Closed {} audit trail", self.entity_type);
    }

    pub async fn set_filter(&self, field: FilterField) -> AppResult<()> {
        self.inner.write().await.criteria.apply(field)
    }

    pub async fn clear_filters(&self) {
        self.inner.write().await.criteria.clear();
    }

    pub async fn criteria(&self) -> FilterCriteria {
        self.inner.read().await.criteria.clone()
    }

    /// Records of the last applied load, in fetch order
    pub async fn records(&self) -> Arc<[SharedRecord]> {
        Arc::clone(&self.inner.read().await.records)
    }

    pub async fn memo_stats(&self) -> MemoStats {
        self.inner.read().await.memo.stats()
    }

    /// Current render pass: filtered, grouped and formatted timeline
    pub async fn snapshot(&self) -> TimelineSnapshot {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let records = Arc::clone(&inner.records);
        let criteria = inner.criteria.clone();
        let key = (inner.records_generation, criteria.clone());
        let strategy = &self.strategy;
        let entity_type = &self.entity_type;

        let derived = inner.memo.get_or_compute(key, || {
            derive(entity_type, &records, &criteria, strategy)
        });

        TimelineSnapshot {
            entity_type: self.entity_type.clone(),
            state: inner.state,
            criteria: criteria.clone(),
            total_records: records.len(),
            filtered_records: derived.filtered,
            groups: derived.groups.clone(),
        }
    }

    async fn load(&self, trigger: &'static str) -> LoadOutcome {
        let generation = {
            let mut inner = self.inner.write().await;
            inner.state = ViewState::Loading;
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        debug!(
            "Loading {} audit trail ({}, generation {})",
            self.entity_type, trigger, generation
        );

        let result = self.loader.load().await;

        let mut inner = self.inner.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(
                "Discarding stale {} audit response (generation {})",
                self.entity_type, generation
            );
            return LoadOutcome::Superseded;
        }

        let (records, outcome) = match result {
            Ok(entries) => {
                let records = normalize_entries(entries);
                info!(
                    "Loaded {} audit records for {}",
                    records.len(),
                    self.entity_type
                );
                let count = records.len();
                (records, LoadOutcome::Applied { records: count })
            }
            Err(e) => {
                error!("Failed to load {} audit log: {:#}", self.entity_type, e);
                (Vec::new(), LoadOutcome::Failed)
            }
        };

        inner.records = Arc::from(records);
        inner.records_generation = generation;
        inner.state = ViewState::Loaded;
        outcome
    }
}

fn derive(
    entity_type: &str,
    records: &[SharedRecord],
    criteria: &FilterCriteria,
    strategy: &StrategyResolver,
) -> Derived {
    let filtered = filter_records(records, criteria);
    let groups = group_operations(&filtered, strategy.grouping());
    debug!(
        "Derived {} timeline: {} records, {} after filters, {} operations",
        entity_type,
        records.len(),
        filtered.len(),
        groups.len()
    );
    Derived {
        filtered: filtered.len(),
        groups: build_timeline(&groups, strategy),
    }
}
