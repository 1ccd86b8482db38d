//! Application state shared across handlers and middleware

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{AuthService, ResetDelivery};
use crate::config::Config;
use crate::middleware::SecurityHeaders;
use crate::rate_limiter::CounterStore;
use crate::security::{PatternScreener, SecurityLog};
use crate::store::UserStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub users: Arc<dyn UserStore>,
    pub screener: Arc<PatternScreener>,
    pub security_log: Arc<dyn SecurityLog>,
    pub security_headers: SecurityHeaders,
    /// Largest body the screener will buffer
    pub max_body_bytes: usize,
}

impl AppState {
    /// Wire the services together from configuration and the chosen backends
    pub fn new(
        config: &Config,
        users: Arc<dyn UserStore>,
        counters: Arc<dyn CounterStore>,
        security_log: Arc<dyn SecurityLog>,
        reset_delivery: Arc<dyn ResetDelivery>,
    ) -> Result<Self, regex::Error> {
        let auth_service = AuthService::new(
            config,
            users.clone(),
            counters,
            security_log.clone(),
            reset_delivery,
        );

        Ok(Self {
            auth_service: Arc::new(auth_service),
            users,
            screener: Arc::new(PatternScreener::with_default_signatures()?),
            security_log,
            security_headers: SecurityHeaders::for_environment(config.environment),
            max_body_bytes: config.max_body_bytes,
        })
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<dyn UserStore> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.users.clone()
    }
}

impl FromRef<AppState> for SecurityHeaders {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.security_headers
    }
}
