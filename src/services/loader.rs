//! Log loaders
//!
//! A loader is a parameterless async source of raw audit entries; the parent
//! entity id is bound when the loader is constructed.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::debug;

use crate::models::RawAuditEntry;
use crate::services::normalizer::parse_timestamp;

/// Source of raw audit entries for one parent entity
#[async_trait]
pub trait LogLoader: Send + Sync {
    async fn load(&self) -> Result<Vec<RawAuditEntry>>;
}

/// Loader backed by an async closure
pub struct FnLoader<F> {
    load: F,
}

#[async_trait]
impl<F, Fut> LogLoader for FnLoader<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<RawAuditEntry>>> + Send + 'static,
{
    async fn load(&self) -> Result<Vec<RawAuditEntry>> {
        (self.load)().await
    }
}

/// Wrap an async closure as a [`LogLoader`]
pub fn loader_fn<F, Fut>(load: F) -> FnLoader<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<RawAuditEntry>>> + Send + 'static,
{
    FnLoader { load }
}

/// Merges the histories of several record kinds into one timeline.
///
/// Every entry is tagged with the kind of the loader it came from (unless it
/// already names one) and the result is ordered newest first. Any failing
/// source fails the whole load.
#[derive(Default)]
pub struct CompositeLoader {
    sources: Vec<(String, Arc<dyn LogLoader>)>,
}

impl CompositeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, kind: impl Into<String>, loader: Arc<dyn LogLoader>) -> Self {
        self.sources.push((kind.into(), loader));
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[async_trait]
impl LogLoader for CompositeLoader {
    async fn load(&self) -> Result<Vec<RawAuditEntry>> {
        let batches = try_join_all(self.sources.iter().map(|(kind, loader)| async move {
            let mut entries = loader
                .load()
                .await
                .with_context(|| format!("Failed to load audit entries for '{}'", kind))?;
            for entry in &mut entries {
                entry.source.get_or_insert_with(|| kind.clone());
            }
            debug!("Loaded {} audit entries from '{}'", entries.len(), kind);
            Ok::<_, anyhow::Error>(entries)
        }))
        .await?;

        let mut merged: Vec<RawAuditEntry> = batches.into_iter().flatten().collect();
        // Unparsable timestamps sort last; the normalizer drops them anyway.
        merged.sort_by_cached_key(|entry| std::cmp::Reverse(parse_timestamp(&entry.created_at)));
        Ok(merged)
    }
}
