//! Security incident and authentication event logging
//!
//! Records are write-once: the server never reads them back. The tracing
//! sink is used in production; the memory sink lets tests assert on what
//! was recorded.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

/// A blocked or suspicious request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityIncident {
    pub timestamp: DateTime<Utc>,
    pub client_addr: String,
    pub user_agent: String,
    pub path: String,
    pub method: String,
    /// Acting username, or `Anonymous`
    pub user: String,
    pub reason: String,
}

/// Kinds of authentication event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEventKind {
    LoginSucceeded,
    LoginFailed,
    LoginThrottled,
    RegistrationThrottled,
    RegistrationRejected,
    UserRegistered,
    PasswordResetRequested,
    PasswordResetUnknownEmail,
    PasswordResetCompleted,
    PasswordResetInvalid,
    PermissionDenied,
}

impl AuthEventKind {
    /// Whether the event is logged at warn level
    pub fn is_suspicious(&self) -> bool {
        !matches!(
            self,
            AuthEventKind::LoginSucceeded
                | AuthEventKind::UserRegistered
                | AuthEventKind::PasswordResetRequested
                | AuthEventKind::PasswordResetCompleted
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthEventKind::LoginSucceeded => "login_succeeded",
            AuthEventKind::LoginFailed => "login_failed",
            AuthEventKind::LoginThrottled => "login_throttled",
            AuthEventKind::RegistrationThrottled => "registration_throttled",
            AuthEventKind::RegistrationRejected => "registration_rejected",
            AuthEventKind::UserRegistered => "user_registered",
            AuthEventKind::PasswordResetRequested => "password_reset_requested",
            AuthEventKind::PasswordResetUnknownEmail => "password_reset_unknown_email",
            AuthEventKind::PasswordResetCompleted => "password_reset_completed",
            AuthEventKind::PasswordResetInvalid => "password_reset_invalid",
            AuthEventKind::PermissionDenied => "permission_denied",
        }
    }
}

/// Outcome of an authentication-related action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: AuthEventKind,
    pub client_addr: String,
    /// Username or email the event concerns
    pub subject: String,
    pub detail: Option<String>,
}

impl AuthEvent {
    pub fn new(kind: AuthEventKind, client_addr: &str, subject: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            client_addr: client_addr.to_string(),
            subject: subject.to_string(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Sink for incidents and auth events
pub trait SecurityLog: Send + Sync {
    fn incident(&self, incident: SecurityIncident);

    fn auth_event(&self, event: AuthEvent);
}

/// Writes records as structured `tracing` events under target `security`
#[derive(Debug, Default, Clone)]
pub struct TracingSecurityLog;

impl SecurityLog for TracingSecurityLog {
    fn incident(&self, incident: SecurityIncident) {
        tracing::warn!(
            target: "security",
            timestamp = %incident.timestamp.format("%Y-%m-%d %H:%M:%S"),
            ip = %incident.client_addr,
            user_agent = %incident.user_agent,
            path = %incident.path,
            method = %incident.method,
            user = %incident.user,
            "SECURITY INCIDENT: {}",
            incident.reason
        );
    }

    fn auth_event(&self, event: AuthEvent) {
        let detail = event.detail.as_deref().unwrap_or("");
        if event.kind.is_suspicious() {
            tracing::warn!(
                target: "security",
                event = event.kind.as_str(),
                ip = %event.client_addr,
                subject = %event.subject,
                detail,
                "Authentication event"
            );
        } else {
            tracing::info!(
                target: "security",
                event = event.kind.as_str(),
                ip = %event.client_addr,
                subject = %event.subject,
                detail,
                "Authentication event"
            );
        }
    }
}

/// Keeps every record in memory
#[derive(Debug, Default)]
pub struct MemorySecurityLog {
    incidents: Mutex<Vec<SecurityIncident>>,
    events: Mutex<Vec<AuthEvent>>,
}

impl MemorySecurityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incidents(&self) -> Vec<SecurityIncident> {
        self.incidents
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    pub fn events(&self) -> Vec<AuthEvent> {
        self.events.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn events_of(&self, kind: AuthEventKind) -> Vec<AuthEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.kind == kind)
            .collect()
    }
}

impl SecurityLog for MemorySecurityLog {
    fn incident(&self, incident: SecurityIncident) {
        if let Ok(mut incidents) = self.incidents.lock() {
            incidents.push(incident);
        }
    }

    fn auth_event(&self, event: AuthEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
