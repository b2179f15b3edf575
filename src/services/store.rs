//! Remote audit store client
//!
//! Fetches audit entries from a PostgREST-style endpoint
//! (`/rest/v1/{table}?{parent_column}=eq.{parent_id}`), newest first.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::{EntityProfile, StoreConfig};
use crate::models::RawAuditEntry;
use crate::services::loader::{CompositeLoader, LogLoader};
use crate::utils::validation::validate_identifier;
use crate::utils::{AppError, AppResult};

/// Maximum number of body characters echoed into error messages
const MAX_ERROR_BODY: usize = 500;

/// Audit store API client
#[derive(Clone)]
pub struct StoreClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl StoreClient {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        info!("Initializing audit store client for {}", config.url);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Fetch every audit entry of `table` whose `parent_column` equals
    /// `parent_id`, newest first
    pub async fn fetch_audit_entries(
        &self,
        table: &str,
        parent_column: &str,
        parent_id: &str,
    ) -> AppResult<Vec<RawAuditEntry>> {
        if !validate_identifier(table) || !validate_identifier(parent_column) {
            return Err(AppError::config(format!(
                "Invalid audit table reference: {}.{}",
                table, parent_column
            )));
        }

        let url = format!(
            "{}/rest/v1/{}?{}=eq.{}&order=created_at.desc&select=*",
            self.base_url,
            table,
            parent_column,
            urlencoding::encode(parent_id)
        );
        debug!("Fetching audit entries: {}", url);

        let mut request = self.client.get(&url).header("Accept", "application/json");
        if let Some(ref key) = self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request.send().await?;

        let entries: Vec<RawAuditEntry> = self.handle_response(response).await?;
        debug!("Fetched {} audit entries from {}", entries.len(), table);
        Ok(entries)
    }

    /// Loader bound to one parent entity
    pub fn loader(
        &self,
        table: impl Into<String>,
        parent_column: impl Into<String>,
        parent_id: impl Into<String>,
    ) -> RestLogLoader {
        RestLogLoader {
            client: self.clone(),
            table: table.into(),
            parent_column: parent_column.into(),
            parent_id: parent_id.into(),
        }
    }

    /// Loader for an entity profile. Profiles with child sources get a
    /// composite loader that merges every history into one timeline.
    pub fn loader_for_profile(&self, profile: &EntityProfile, parent_id: &str) -> Arc<dyn LogLoader> {
        let parent = Arc::new(self.loader(
            profile.table.clone(),
            profile.parent_column.clone(),
            parent_id,
        ));
        if profile.children.is_empty() {
            return parent;
        }

        let composite = profile.children.iter().fold(
            CompositeLoader::new().with_source(profile.table.clone(), parent),
            |composite, child| {
                composite.with_source(
                    child.table.clone(),
                    Arc::new(self.loader(child.table.clone(), child.parent_column.clone(), parent_id)),
                )
            },
        );
        Arc::new(composite)
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str::<T>(&body).map_err(|e| {
                AppError::malformed(format!(
                    "Failed to parse response JSON: {} ({})",
                    truncate(&body),
                    e
                ))
            })
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(AppError::Http(format!(
                "Request failed with status {}: {}",
                status,
                truncate(&body)
            )))
        }
    }
}

fn truncate(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY {
        let head: String = body.chars().take(MAX_ERROR_BODY).collect();
        format!("{}... (truncated)", head)
    } else {
        body.to_string()
    }
}

/// [`LogLoader`] reading one table of the remote store for one parent id
#[derive(Clone)]
pub struct RestLogLoader {
    client: StoreClient,
    table: String,
    parent_column: String,
    parent_id: String,
}

impl RestLogLoader {
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }
}

#[async_trait]
impl LogLoader for RestLogLoader {
    async fn load(&self) -> Result<Vec<RawAuditEntry>> {
        let entries = self
            .client
            .fetch_audit_entries(&self.table, &self.parent_column, &self.parent_id)
            .await
            .with_context(|| format!("Failed to fetch audit entries from {}", self.table))?;
        Ok(entries)
    }
}
