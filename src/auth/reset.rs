//! Password reset tokens
//!
//! A reset link carries a `uid` (URL-safe base64 of the user id) and a
//! token of the form `<issued-at in base36>-<hex HMAC-SHA256>`. The MAC
//! covers the user id, a fingerprint of the current password hash and the
//! issue time, so a token stops verifying as soon as the password changes
//! and cannot be replayed. Both parts use only `[0-9a-z]` plus the single
//! separator, which keeps the link clear of every screening signature.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use jsonwebtoken::{crypto, Algorithm, DecodingKey, EncodingKey};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::jwt::JwtError;
use crate::models::User;

/// Encode a user id for use in a reset link
///
/// The hyphenated UUID text only ever yields base64 digits below `6`, so
/// the result never contains `-` or `_`.
pub fn encode_uid(id: Uuid) -> String {
    URL_SAFE_NO_PAD.encode(id.to_string())
}

/// Decode a `uid` from a reset link; `None` on any malformed input
pub fn decode_uid(uid: &str) -> Option<Uuid> {
    let bytes = URL_SAFE_NO_PAD.decode(uid.trim_end_matches('=')).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    Uuid::parse_str(&text).ok()
}

fn password_fingerprint(password_hash: &str) -> String {
    hex::encode(Sha256::digest(password_hash.as_bytes()))
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::new();
    loop {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
        if value == 0 {
            break;
        }
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

fn from_base36(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_lowercase()) {
        return None;
    }
    u64::from_str_radix(text, 36).ok()
}

/// Mints and checks reset tokens
#[derive(Clone)]
pub struct ResetTokenGenerator {
    secret: String,
    ttl_seconds: i64,
}

impl ResetTokenGenerator {
    pub fn new(secret: &str, ttl_seconds: i64) -> Self {
        Self {
            // Separate key space from access/refresh tokens
            secret: format!("{}:password-reset", secret),
            ttl_seconds,
        }
    }

    fn message(user: &User, issued_at: u64) -> String {
        format!(
            "{}:{}:{}",
            user.id,
            password_fingerprint(&user.password_hash),
            issued_at
        )
    }

    pub fn make_token(&self, user: &User) -> Result<String, JwtError> {
        let now = u64::try_from(Utc::now().timestamp())
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))?;
        self.make_token_at(user, now)
    }

    /// Token as minted at `issued_at` (Unix seconds)
    pub fn make_token_at(&self, user: &User, issued_at: u64) -> Result<String, JwtError> {
        let signature = crypto::sign(
            Self::message(user, issued_at).as_bytes(),
            &EncodingKey::from_secret(self.secret.as_bytes()),
            Algorithm::HS256,
        )
        .map_err(|e| JwtError::EncodingFailed(e.to_string()))?;

        let mac = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))?;

        Ok(format!("{}-{}", to_base36(issued_at), hex::encode(mac)))
    }

    /// True only for an unexpired token minted for this user and password
    pub fn check_token(&self, user: &User, token: &str) -> bool {
        self.check_token_at(user, token, Utc::now().timestamp())
    }

    /// `check_token` as seen at `now` (Unix seconds)
    pub fn check_token_at(&self, user: &User, token: &str, now: i64) -> bool {
        let Some((issued, mac_hex)) = token.split_once('-') else {
            return false;
        };
        let Some(issued_at) = from_base36(issued) else {
            return false;
        };
        let Ok(issued_secs) = i64::try_from(issued_at) else {
            return false;
        };

        let age = now.saturating_sub(issued_secs);
        if age < 0 || age > self.ttl_seconds {
            return false;
        }

        if mac_hex.bytes().any(|b| b.is_ascii_uppercase()) {
            return false;
        }
        let Ok(mac) = hex::decode(mac_hex) else {
            return false;
        };

        crypto::verify(
            &URL_SAFE_NO_PAD.encode(mac),
            Self::message(user, issued_at).as_bytes(),
            &DecodingKey::from_secret(self.secret.as_bytes()),
            Algorithm::HS256,
        )
        .unwrap_or(false)
    }
}

/// Path the front end serves the reset form on
pub fn reset_path(uid: &str, token: &str) -> String {
    format!("/reset-password/{}/{}/", uid, token)
}

/// Hands a reset link to the account owner (email in production)
pub trait ResetDelivery: Send + Sync {
    fn deliver(&self, email: &str, reset_path: &str);
}

/// Writes reset links to the debug log; for development without a mailer
#[derive(Debug, Default, Clone)]
pub struct LogResetDelivery;

impl ResetDelivery for LogResetDelivery {
    fn deliver(&self, email: &str, reset_path: &str) {
        tracing::debug!(email = %email, reset_path = %reset_path, "Password reset link issued");
    }
}

/// Keeps delivered links in memory
#[derive(Debug, Default)]
pub struct MemoryResetDelivery {
    sent: std::sync::Mutex<Vec<(String, String)>>,
}

impl MemoryResetDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(email, reset_path)` pairs, oldest first
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl ResetDelivery for MemoryResetDelivery {
    fn deliver(&self, email: &str, reset_path: &str) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((email.to_string(), reset_path.to_string()));
        }
    }
}
