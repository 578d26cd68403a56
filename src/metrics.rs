use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use serde::Serialize;

use crate::provider::Provider;

/// Counters for one provider's throttling and backoff activity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProviderMetrics {
    /// Requests that passed through the gate.
    pub total_requests: u64,
    /// Requests delayed by the burst branch (steady-state spacing).
    pub burst_delays: u64,
    /// Explicit window resets, almost always from confirmed 429s.
    pub window_resets: u64,
    /// Backoff retries performed by the retry wrapper.
    pub backoff_retries: u64,
    /// Retry sequences that ran out of attempts.
    pub retries_exhausted: u64,
}

#[derive(Debug, Clone)]
pub struct MetricsCollector {
    provider_metrics: Arc<RwLock<HashMap<Provider, ProviderMetrics>>>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            provider_metrics: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn record_request(&self, provider: Provider) {
        let mut metrics = self.provider_metrics.write().await;
        metrics.entry(provider).or_default().total_requests += 1;
    }

    pub async fn record_burst_delay(&self, provider: Provider) {
        let mut metrics = self.provider_metrics.write().await;
        metrics.entry(provider).or_default().burst_delays += 1;
    }

    pub async fn record_window_reset(&self, provider: Provider) {
        let mut metrics = self.provider_metrics.write().await;
        metrics.entry(provider).or_default().window_resets += 1;
    }

    pub async fn record_backoff_retry(&self, provider: Provider) {
        let mut metrics = self.provider_metrics.write().await;
        metrics.entry(provider).or_default().backoff_retries += 1;
    }

    pub async fn record_retries_exhausted(&self, provider: Provider) {
        let mut metrics = self.provider_metrics.write().await;
        metrics.entry(provider).or_default().retries_exhausted += 1;
    }

    pub async fn provider_metrics(&self, provider: Provider) -> Option<ProviderMetrics> {
        let metrics = self.provider_metrics.read().await;
        metrics.get(&provider).cloned()
    }

    pub async fn all_metrics(&self) -> HashMap<Provider, ProviderMetrics> {
        let metrics = self.provider_metrics.read().await;
        metrics.clone()
    }

    /// Aggregate counters across every provider.
    pub async fn global_metrics(&self) -> ProviderMetrics {
        let metrics = self.provider_metrics.read().await;
        let mut global = ProviderMetrics::default();

        for provider_metrics in metrics.values() {
            global.total_requests += provider_metrics.total_requests;
            global.burst_delays += provider_metrics.burst_delays;
            global.window_resets += provider_metrics.window_resets;
            global.backoff_retries += provider_metrics.backoff_retries;
            global.retries_exhausted += provider_metrics.retries_exhausted;
        }

        global
    }
}
