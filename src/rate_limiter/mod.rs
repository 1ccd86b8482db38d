//! Fixed-window attempt limiting for login and registration
//!
//! Each scope keeps its own counters in an injected [`CounterStore`]. A
//! counter is created on the first attempt, expires one window later and
//! is never decremented in between.

use std::{fmt, sync::Arc, time::Duration};

use crate::config::Config;

mod store;

pub use store::{CounterError, CounterStore, MemoryCounterStore, MAX_WINDOW};

/// Named category of rate-limited action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateScope {
    Login,
    Register,
}

impl RateScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateScope::Login => "login",
            RateScope::Register => "register",
        }
    }
}

impl fmt::Display for RateScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Limits for one scope
#[derive(Debug, Clone)]
pub struct RatePolicy {
    /// Attempts allowed per window; the next one is throttled
    pub max_attempts: u64,
    pub window: Duration,
    /// Previous-attempt count from which every attempt is logged as suspicious
    pub warn_after: u64,
}

/// Outcome of a rate check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// `previous` attempts were already recorded in this window
    Allowed { previous: u64 },
    Limited { previous: u64 },
}

impl RateDecision {
    pub fn is_limited(&self) -> bool {
        matches!(self, RateDecision::Limited { .. })
    }

    /// 1-based number of the attempt just recorded
    pub fn attempt(&self) -> u64 {
        match self {
            RateDecision::Allowed { previous } | RateDecision::Limited { previous } => {
                previous + 1
            }
        }
    }
}

/// Per-identity attempt limiter
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    login: RatePolicy,
    register: RatePolicy,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, login: RatePolicy, register: RatePolicy) -> Self {
        Self {
            store,
            login,
            register,
        }
    }

    pub fn from_config(store: Arc<dyn CounterStore>, config: &Config) -> Self {
        Self::new(
            store,
            RatePolicy {
                max_attempts: config.login_max_attempts,
                window: config.login_window,
                warn_after: 3,
            },
            RatePolicy {
                max_attempts: config.register_max_attempts,
                window: config.register_window,
                warn_after: 2,
            },
        )
    }

    pub fn policy(&self, scope: RateScope) -> &RatePolicy {
        match scope {
            RateScope::Login => &self.login,
            RateScope::Register => &self.register,
        }
    }

    /// Login identity: client address plus submitted username, or the
    /// address alone when no username was given.
    pub fn login_identity(client_addr: &str, username: &str) -> String {
        if username.is_empty() {
            client_addr.to_string()
        } else {
            format!("{}_{}", client_addr, username)
        }
    }

    fn key(scope: RateScope, identity: &str) -> String {
        format!("{}_attempt_{}", scope, identity)
    }

    /// Record an attempt and return the pre-increment count
    pub async fn check_and_increment(
        &self,
        scope: RateScope,
        identity: &str,
    ) -> Result<u64, CounterError> {
        let policy = self.policy(scope);
        self.store
            .incr(&Self::key(scope, identity), policy.window)
            .await
    }

    /// Record an attempt and decide whether it may proceed
    pub async fn check(&self, scope: RateScope, identity: &str) -> Result<RateDecision, CounterError> {
        let previous = self.check_and_increment(scope, identity).await?;
        let policy = self.policy(scope);

        if previous >= policy.warn_after {
            tracing::warn!(
                target: "security",
                scope = %scope,
                identity = %identity,
                attempt = previous + 1,
                "Multiple {} attempts detected",
                scope
            );
        }

        if previous >= policy.max_attempts {
            Ok(RateDecision::Limited { previous })
        } else {
            Ok(RateDecision::Allowed { previous })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::from_config(Arc::new(MemoryCounterStore::new()), &Config::default())
    }

    #[tokio::test]
    async fn test_sixth_login_is_limited() {
        let limiter = limiter();
        let identity = RateLimiter::login_identity("10.0.0.1", "alice");

        for attempt in 1..=5 {
            let decision = limiter.check(RateScope::Login, &identity).await.unwrap();
            assert!(!decision.is_limited(), "attempt {attempt} should pass");
            assert_eq!(decision.attempt(), attempt);
        }

        let decision = limiter.check(RateScope::Login, &identity).await.unwrap();
        assert_eq!(decision, RateDecision::Limited { previous: 5 });
    }

    #[tokio::test]
    async fn test_fourth_registration_is_limited() {
        let limiter = limiter();

        for _ in 0..3 {
            assert!(!limiter
                .check(RateScope::Register, "10.0.0.1")
                .await
                .unwrap()
                .is_limited());
        }
        assert!(limiter
            .check(RateScope::Register, "10.0.0.1")
            .await
            .unwrap()
            .is_limited());
    }

    #[tokio::test]
    async fn test_other_username_has_own_counter() {
        let limiter = limiter();
        let alice = RateLimiter::login_identity("10.0.0.1", "alice");
        let bob = RateLimiter::login_identity("10.0.0.1", "bob");

        for _ in 0..6 {
            limiter.check(RateScope::Login, &alice).await.unwrap();
        }
        assert!(!limiter.check(RateScope::Login, &bob).await.unwrap().is_limited());
    }

    #[tokio::test]
    async fn test_scopes_do_not_share_counters() {
        let limiter = limiter();

        for _ in 0..4 {
            limiter.check(RateScope::Register, "10.0.0.1").await.unwrap();
        }
        assert_eq!(
            limiter
                .check_and_increment(RateScope::Login, "10.0.0.1")
                .await
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_login_identity() {
        assert_eq!(RateLimiter::login_identity("1.2.3.4", "bob"), "1.2.3.4_bob");
        assert_eq!(RateLimiter::login_identity("1.2.3.4", ""), "1.2.3.4");
    }
}
