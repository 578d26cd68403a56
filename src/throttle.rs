//! Per-provider request gate.
//!
//! Every outbound call site passes through [`Throttle::acquire`] immediately
//! before issuing its HTTP request. The gate tracks a rolling 60-second
//! request window per provider, enforces steady-state spacing once the burst
//! allowance is spent, and otherwise inserts a small randomized pause so
//! traffic never becomes perfectly periodic.

use rand::Rng;
use rand_distr::{Distribution, LogNormal};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::metrics::MetricsCollector;
use crate::policy::{PolicyTable, RateLimitPolicy};
use crate::provider::Provider;

/// Length of the rolling request-counting window.
const ROLLING_WINDOW: Duration = Duration::from_secs(60);

/// Spread of the jitter distribution.
const JITTER_SIGMA: f64 = 0.5;

/// z-score for the 99th percentile; positions the log-normal so that 99% of
/// raw draws fall at or below `max_delay`.
const Z_99: f64 = 2.326;

/// Mutable throttling state for one provider.
///
/// All reads and writes happen under the provider's mutex.
#[derive(Debug)]
struct ProviderState {
    request_count: u32,
    window_start: Instant,
    last_request: Instant,
}

impl ProviderState {
    fn new() -> Self {
        let now = Instant::now();
        Self {
            request_count: 0,
            window_start: now,
            last_request: now,
        }
    }
}

/// Per-provider request gate shared by all callers.
///
/// One `Throttle` is constructed at process startup and handed (behind an
/// `Arc`) to every outbound call site. Provider states are created lazily on
/// first use and retained for the process lifetime.
pub struct Throttle {
    table: PolicyTable,
    states: RwLock<HashMap<Provider, Arc<Mutex<ProviderState>>>>,
    metrics: MetricsCollector,
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(PolicyTable::default())
    }
}

impl Throttle {
    pub fn new(table: PolicyTable) -> Self {
        Self {
            table,
            states: RwLock::new(HashMap::new()),
            metrics: MetricsCollector::new(),
        }
    }

    /// Gate one request to `provider`, sleeping as required by its policy.
    ///
    /// Never fails; a provider without a table entry is governed by the
    /// default policy. The induced delay is bounded by
    /// `max(max_delay, 60 / requests_per_minute)`.
    ///
    /// The provider mutex is held across the sleep: waiters for one provider
    /// are strictly ordered, and a burst of late arrivals cannot jump ahead
    /// of an earlier waiter. If the caller is cancelled mid-sleep the guard
    /// drops and the state is left exactly as the previous request recorded
    /// it.
    pub async fn acquire(&self, provider: Provider) {
        let policy = self.table.policy_for(provider).clone();
        let state = self.state_for(provider).await;

        let mut state = state.lock().await;
        let now = Instant::now();

        if now.duration_since(state.window_start) >= ROLLING_WINDOW {
            state.request_count = 0;
            state.window_start = now;
        }

        if state.request_count >= policy.burst_limit {
            // Saturated: enforce the steady-state interval from the last
            // recorded request.
            let interval = policy.steady_interval();
            let since_last = now.duration_since(state.last_request);
            if since_last < interval {
                let wait = interval - since_last;
                info!(
                    provider = %provider,
                    wait_secs = wait.as_secs_f64(),
                    "burst limit reached, spacing request"
                );
                self.metrics.record_burst_delay(provider).await;
                sleep(wait).await;
            }
        } else {
            let delay = jitter_delay(&policy, &mut rand::thread_rng());
            debug!(
                provider = %provider,
                delay_secs = delay.as_secs_f64(),
                "adding jitter delay"
            );
            sleep(delay).await;
        }

        state.request_count += 1;
        state.last_request = Instant::now();
        drop(state);

        self.metrics.record_request(provider).await;
    }

    /// Resolve a model or service name and gate a request to its provider.
    pub async fn acquire_for(&self, name: &str) {
        self.acquire(Provider::resolve(name)).await;
    }

    /// Discard the provider's window after a confirmed rate-limit rejection.
    ///
    /// A 429 from the real API overrides whatever the local window believed;
    /// the next `acquire` behaves as if no requests had been issued.
    pub async fn reset_window(&self, provider: Provider) {
        let state = self.state_for(provider).await;
        let mut state = state.lock().await;
        let now = Instant::now();
        state.request_count = 0;
        state.window_start = now;
        state.last_request = now;
        drop(state);

        self.metrics.record_window_reset(provider).await;
        debug!(provider = %provider, "throttle window reset");
    }

    /// Snapshot of the provider's request count in the current window.
    pub async fn request_count(&self, provider: Provider) -> u32 {
        let state = self.state_for(provider).await;
        let state = state.lock().await;
        state.request_count
    }

    pub fn policy_table(&self) -> &PolicyTable {
        &self.table
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Get or lazily create the provider's state.
    ///
    /// Double-checked so concurrent first touches agree on a single state;
    /// the map lock is dropped before the provider mutex is taken, so a
    /// sleeping provider never blocks another provider's first touch.
    async fn state_for(&self, provider: Provider) -> Arc<Mutex<ProviderState>> {
        {
            let states = self.states.read().await;
            if let Some(state) = states.get(&provider) {
                return Arc::clone(state);
            }
        }

        let mut states = self.states.write().await;
        let state = states
            .entry(provider)
            .or_insert_with(|| Arc::new(Mutex::new(ProviderState::new())));
        Arc::clone(state)
    }
}

/// Draw a jitter delay from a flipped log-normal distribution.
///
/// The raw draw sits below `max_delay` 99% of the time; clamping keeps the
/// pause inside the policy bounds and flipping reflects the draw across
/// them, so spacing stays bounded without ever becoming periodic.
fn jitter_delay<R: Rng>(policy: &RateLimitPolicy, rng: &mut R) -> Duration {
    let min = policy.min_delay.as_secs_f64();
    let max = policy.max_delay.as_secs_f64();

    let mu = max.ln() - JITTER_SIGMA * Z_99;
    let raw = match LogNormal::new(mu, JITTER_SIGMA) {
        Ok(dist) => dist.sample(rng),
        // Unreachable with a positive constant sigma.
        Err(_) => max,
    };

    let clamped = raw.clamp(min, max);
    Duration::from_secs_f64(max - clamped + min)
}
