//! Multi-provider request throttling and backoff coordination.
//!
//! Outbound call sites pass through a [`Throttle`] before issuing a request
//! so each provider's rate-limit policy is respected, and wrap their calls
//! in a [`Retrier`] so confirmed rate-limit rejections are absorbed with
//! exponential backoff instead of surfacing to the caller.

pub mod error;
pub mod metrics;
pub mod policy;
pub mod provider;
pub mod retry;
pub mod throttle;

pub use error::{ApiFailure, PolicyError};
pub use metrics::{MetricsCollector, ProviderMetrics};
pub use policy::{PolicyTable, RateLimitPolicy};
pub use provider::Provider;
pub use retry::{Retrier, RetryPolicy, Retryable};
pub use throttle::Throttle;
