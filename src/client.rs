//! HTTP client for the batch query endpoints.
//!
//! Every public call returns `None` on any transport, status or decoding
//! failure. Callers treat that as "backend offline", never as an error.

use crate::error::ClientError;
use crate::feed::polling::SnapshotSource;
use crate::types::snapshot::{
    Alert, AlertsEnvelope, DashboardMetrics, HealthStatus, ModelRegistry, TransactionsEnvelope,
};
use crate::types::transaction::WireTransaction;
use async_trait::async_trait;
use reqwest::header::CACHE_CONTROL;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Versioned API prefix under the backend root
const API_PREFIX: &str = "/api/v1";

pub struct ApiClient {
    client: Client,
    backend_url: String,
}

impl ApiClient {
    pub fn new(backend_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            backend_url: backend_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}{}", self.backend_url, API_PREFIX, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, ClientError> {
        let response = self
            .client
            .get(&url)
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(|source| ClientError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| ClientError::Decode { url, source })
    }

    async fn fetch<T: DeserializeOwned>(&self, url: String) -> Option<T> {
        match self.get_json(url).await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(error = %e, "Backend request failed");
                None
            }
        }
    }

    /// Most recent transactions, newest first
    pub async fn transactions(&self, limit: usize) -> Option<Vec<WireTransaction>> {
        let url = self.api_url(&format!("/transactions?limit={limit}"));
        self.fetch::<TransactionsEnvelope>(url)
            .await
            .map(|envelope| envelope.transactions)
    }

    pub async fn alerts(&self, limit: usize) -> Option<Vec<Alert>> {
        let url = self.api_url(&format!("/alerts?limit={limit}"));
        self.fetch::<AlertsEnvelope>(url)
            .await
            .map(|envelope| envelope.alerts)
    }

    /// Aggregate dashboard metrics
    pub async fn metrics(&self) -> Option<DashboardMetrics> {
        self.fetch(self.api_url("/metrics")).await
    }

    /// Model registry, pipeline runs and serving stats
    pub async fn models(&self) -> Option<ModelRegistry> {
        self.fetch(self.api_url("/models")).await
    }

    /// Health probe. Lives at the backend root, outside the API prefix.
    pub async fn health(&self) -> Option<HealthStatus> {
        let url = format!("{}/health", self.backend_url);
        match self.get_json::<HealthStatus>(url).await {
            Ok(status) => Some(status),
            Err(e) => {
                debug!(error = %e, "Health probe failed");
                None
            }
        }
    }
}

#[async_trait]
impl SnapshotSource for ApiClient {
    async fn recent_transactions(&self, limit: usize) -> Option<Vec<WireTransaction>> {
        self.transactions(limit).await
    }
}
