//! Request screening and security logging

mod incident;
mod screener;

pub use incident::{
    AuthEvent, AuthEventKind, MemorySecurityLog, SecurityIncident, SecurityLog,
    TracingSecurityLog,
};
pub use screener::{
    InputLocation, PatternScreener, RequestInput, Signature, ThreatCategory, Verdict,
};
