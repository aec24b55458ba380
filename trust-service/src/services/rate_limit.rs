//! Per-caller rate limiting for the authentication flows.
//!
//! Injected as a component with an explicit `allow(key)` contract; the
//! keyed limiter is the only shared mutable state in the process and is
//! safe under unbounded concurrent callers.

use governor::{
    clock::DefaultClock,
    state::keyed::DashMapStateStore,
    Quota, RateLimiter,
};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

use crate::config::RateLimitConfig;
use crate::services::error::ServiceError;

type KeyedLimiter = RateLimiter<String, DashMapStateStore<String>, DefaultClock>;

/// Rate limit guard for one flow, keyed by caller address.
#[derive(Clone)]
pub struct RateLimitGuard {
    flow: &'static str,
    limiter: Arc<KeyedLimiter>,
}

impl RateLimitGuard {
    pub fn new(flow: &'static str, attempts: u32, window_seconds: u64) -> Self {
        let attempts = NonZeroU32::new(attempts.max(1)).unwrap();
        let period = Duration::from_secs((window_seconds / u64::from(attempts.get())).max(1));
        let quota = Quota::with_period(period).unwrap().allow_burst(attempts);

        Self {
            flow,
            limiter: Arc::new(RateLimiter::keyed(quota)),
        }
    }

    /// The sole mutator. Ok when the caller is within quota.
    pub fn allow(&self, key: &str) -> Result<(), ServiceError> {
        match self.limiter.check_key(&key.to_string()) {
            Ok(()) => Ok(()),
            Err(_) => {
                tracing::warn!(flow = self.flow, key = %key, "Rate limit exceeded");
                Err(ServiceError::RateLimited { flow: self.flow })
            }
        }
    }
}

/// The two independently configured guards the session manager uses.
#[derive(Clone)]
pub struct RateLimits {
    pub login: RateLimitGuard,
    pub refresh: RateLimitGuard,
}

impl RateLimits {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            login: RateLimitGuard::new(
                "login",
                config.login_attempts,
                config.login_window_seconds,
            ),
            refresh: RateLimitGuard::new(
                "refresh",
                config.refresh_attempts,
                config.refresh_window_seconds,
            ),
        }
    }
}
