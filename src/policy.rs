use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::PolicyError;
use crate::provider::Provider;

/// Per-provider rate limiting policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    pub requests_per_minute: u32,
    pub burst_limit: u32,
    #[serde(with = "humantime_serde")]
    pub min_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            burst_limit: 1,
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl RateLimitPolicy {
    /// Create a policy with the standard jitter bounds (100ms..1s)
    pub fn new(requests_per_minute: u32, burst_limit: u32) -> Self {
        Self {
            requests_per_minute,
            burst_limit,
            ..Default::default()
        }
    }

    /// Steady-state spacing between requests once the burst allowance is
    /// spent: one request every `60 / requests_per_minute` seconds.
    pub fn steady_interval(&self) -> Duration {
        Duration::from_secs_f64(60.0 / f64::from(self.requests_per_minute))
    }

    /// Validate policy parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.requests_per_minute == 0 {
            return Err("requests_per_minute must be greater than 0".to_string());
        }
        if self.burst_limit == 0 {
            return Err("burst_limit must be at least 1".to_string());
        }
        if self.min_delay.is_zero() {
            return Err("min_delay must be greater than 0".to_string());
        }
        if self.min_delay > self.max_delay {
            return Err("min_delay must not exceed max_delay".to_string());
        }
        Ok(())
    }
}

/// The full provider-to-policy mapping, with a mandatory default fallback.
///
/// The built-in table carries the known provider ceilings; callers can
/// inject their own table or override individual entries. Lookup never
/// fails: unknown providers get the default policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyTable {
    pub policies: HashMap<Provider, RateLimitPolicy>,
    pub default_policy: RateLimitPolicy,
}

impl Default for PolicyTable {
    fn default() -> Self {
        let mut policies = HashMap::new();
        policies.insert(Provider::Anthropic, RateLimitPolicy::new(45, 3));
        policies.insert(Provider::OpenAi, RateLimitPolicy::new(60, 5));
        policies.insert(Provider::SemanticScholar, RateLimitPolicy::new(30, 2));
        policies.insert(Provider::Scopus, RateLimitPolicy::new(20, 2));
        policies.insert(Provider::TaylorFrancis, RateLimitPolicy::new(15, 1));

        Self {
            policies,
            default_policy: RateLimitPolicy::default(),
        }
    }
}

impl PolicyTable {
    /// Get the policy for a provider, falling back to the default
    pub fn policy_for(&self, provider: Provider) -> &RateLimitPolicy {
        self.policies.get(&provider).unwrap_or(&self.default_policy)
    }

    /// Add or replace the policy for a provider
    pub fn set_policy(&mut self, provider: Provider, policy: RateLimitPolicy) {
        self.policies.insert(provider, policy);
    }

    /// Load a table from its JSON representation
    pub fn from_json_str(json: &str) -> Result<Self, PolicyError> {
        let table: Self = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    /// Validate every entry, including the default policy
    pub fn validate(&self) -> Result<(), PolicyError> {
        for (provider, policy) in &self.policies {
            policy.validate().map_err(|reason| PolicyError::InvalidPolicy {
                provider: provider.to_string(),
                reason,
            })?;
        }
        self.default_policy
            .validate()
            .map_err(|reason| PolicyError::InvalidPolicy {
                provider: Provider::Default.to_string(),
                reason,
            })
    }
}
