//! HTTP client module
//!
//! Provides the request executor used by every collection run and by the
//! port probe.
//!
//! # Features
//!
//! - **Automatic Retries**: bounded retry on a fixed set of transient statuses
//! - **Backoff Strategies**: Constant, linear, and exponential backoff
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Polite Delay**: fixed or jittered pause between consecutive requests
//! - **Failure Categories**: transport errors mapped to [`TransportFailure`]

mod client;
mod rate_limit;

pub use client::{
    HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig, TransportFailure,
};
pub use rate_limit::{Pacer, RateLimiter, RateLimiterConfig};
