//! Authentication module
//!
//! - Username/password login with JWT access and refresh tokens
//! - Rate-limited registration
//! - Password reset with signed, time-bound tokens

mod jwt;
mod password;
mod reset;
mod service;

pub use jwt::{
    generate_access_token, generate_refresh_token, get_user_id_from_claims, verify_token,
    verify_token_of_type, Claims, JwtError, TokenType,
};
pub use password::{check_password_strength, hash_password, verify_password, PasswordError};
pub use reset::{
    decode_uid, encode_uid, LogResetDelivery, MemoryResetDelivery, ResetDelivery,
    ResetTokenGenerator,
};
pub use service::{
    AuthService, INVALID_CREDENTIALS, RESET_COMPLETED_MESSAGE, RESET_REQUESTED_MESSAGE,
};
