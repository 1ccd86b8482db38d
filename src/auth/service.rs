//! Authentication service
//!
//! Drives login, registration and password reset around the user store,
//! the rate limiter and the token helpers. Branches an outside observer
//! must not be able to tell apart (unknown user vs wrong password, taken
//! username vs taken email) share wording and a fixed added delay.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::config::Config;
use crate::error::ApiError;
use crate::models::{
    AccessTokenResponse, LoginRequest, LoginResponse, NewUser, PasswordResetConfirm,
    PasswordResetRequest, RefreshTokenRequest, RegisterRequest, SuccessResponse, User,
    UserResponse,
};
use crate::rate_limiter::{CounterStore, RateLimiter, RateScope};
use crate::security::{AuthEvent, AuthEventKind, SecurityLog};
use crate::store::UserStore;

use super::jwt::{
    generate_access_token, generate_refresh_token, get_user_id_from_claims, verify_token,
    verify_token_of_type, Claims, TokenType,
};
use super::password::{check_password_strength, hash_password, verify_password};
use super::reset::{decode_uid, encode_uid, reset_path, ResetDelivery, ResetTokenGenerator};

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const RESET_REQUESTED_MESSAGE: &str =
    "If your email exists in our system, a password reset link has been sent.";
pub const RESET_COMPLETED_MESSAGE: &str = "Password has been reset successfully.";

/// Hashed once and verified against when the username is unknown
const DUMMY_PASSWORD: &str = "dummy-password-for-timing";

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    limiter: RateLimiter,
    log: Arc<dyn SecurityLog>,
    reset_delivery: Arc<dyn ResetDelivery>,
    reset_tokens: ResetTokenGenerator,
    jwt_secret: String,
    access_token_ttl_seconds: i64,
    refresh_token_ttl_days: i64,
    failure_delay: Duration,
    bcrypt_cost: u32,
    dummy_hash: Arc<OnceCell<String>>,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(
        config: &Config,
        users: Arc<dyn UserStore>,
        counters: Arc<dyn CounterStore>,
        log: Arc<dyn SecurityLog>,
        reset_delivery: Arc<dyn ResetDelivery>,
    ) -> Self {
        Self {
            users,
            limiter: RateLimiter::from_config(counters, config),
            log,
            reset_delivery,
            reset_tokens: ResetTokenGenerator::new(
                &config.jwt_secret,
                config.password_reset_ttl_seconds,
            ),
            jwt_secret: config.jwt_secret.clone(),
            access_token_ttl_seconds: config.jwt_access_token_ttl_seconds,
            refresh_token_ttl_days: config.jwt_refresh_token_ttl_days,
            failure_delay: config.auth_failure_delay,
            bcrypt_cost: config.bcrypt_cost,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Verify credentials, issuing a token pair on success
    pub async fn login(
        &self,
        client_addr: &str,
        req: LoginRequest,
    ) -> Result<LoginResponse, ApiError> {
        let identity = RateLimiter::login_identity(client_addr, &req.username);
        let decision = self.limiter.check(RateScope::Login, &identity).await?;
        if decision.is_limited() {
            self.log.auth_event(
                AuthEvent::new(AuthEventKind::LoginThrottled, client_addr, &req.username)
                    .with_detail(format!("attempt {}", decision.attempt())),
            );
            return Err(ApiError::TooManyRequests);
        }

        if req.username.is_empty() || req.password.is_empty() {
            return Err(ApiError::BadRequest(
                "Username and password are required".to_string(),
            ));
        }

        match self.authenticate(&req.username, &req.password).await? {
            Some(user) => {
                self.log.auth_event(AuthEvent::new(
                    AuthEventKind::LoginSucceeded,
                    client_addr,
                    &user.username,
                ));

                Ok(LoginResponse {
                    access: generate_access_token(
                        &user,
                        &self.jwt_secret,
                        self.access_token_ttl_seconds,
                    )?,
                    refresh: generate_refresh_token(
                        &user,
                        &self.jwt_secret,
                        self.refresh_token_ttl_days,
                    )?,
                    user: user.into(),
                })
            }
            None => {
                self.log.auth_event(
                    AuthEvent::new(AuthEventKind::LoginFailed, client_addr, &req.username)
                        .with_detail(format!("attempt {}", decision.attempt())),
                );
                self.failure_delay().await;
                Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))
            }
        }
    }

    /// Create an account
    pub async fn register(
        &self,
        client_addr: &str,
        req: RegisterRequest,
    ) -> Result<UserResponse, ApiError> {
        let decision = self.limiter.check(RateScope::Register, client_addr).await?;
        if decision.is_limited() {
            self.log.auth_event(
                AuthEvent::new(AuthEventKind::RegistrationThrottled, client_addr, &req.username)
                    .with_detail(format!("attempt {}", decision.attempt())),
            );
            return Err(ApiError::TooManyRequests);
        }

        if !req.username.is_empty() && self.users.username_exists(&req.username).await? {
            return Err(self
                .reject_registration(client_addr, &req.username, "username")
                .await);
        }

        if !req.email.is_empty() && self.users.email_exists(&req.email).await? {
            return Err(self
                .reject_registration(client_addr, &req.username, "email")
                .await);
        }

        let mut errors = match req.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        if let Some(confirm) = &req.password_confirm {
            if confirm != &req.password {
                let mut err = ValidationError::new("password_mismatch");
                err.message = Some("Passwords do not match".into());
                errors.add("password_confirm", err);
            }
        }
        if !errors.errors().is_empty() {
            return Err(errors.into());
        }

        let password_hash = hash_password(&req.password, self.bcrypt_cost).await?;
        let user = self
            .users
            .create(NewUser {
                username: req.username,
                email: req.email,
                name: req.name,
                password_hash,
            })
            .await?;

        self.log.auth_event(AuthEvent::new(
            AuthEventKind::UserRegistered,
            client_addr,
            &user.username,
        ));

        Ok(user.into())
    }

    /// Start a password reset. The response never reveals whether the
    /// email belongs to an account.
    pub async fn request_password_reset(
        &self,
        client_addr: &str,
        req: PasswordResetRequest,
    ) -> Result<SuccessResponse, ApiError> {
        if req.email.is_empty() {
            return Err(ApiError::Rejected("Email is required".to_string()));
        }

        match self.users.find_by_email(&req.email).await? {
            Some(user) => {
                let token = self.reset_tokens.make_token(&user)?;
                let uid = encode_uid(user.id);
                self.reset_delivery
                    .deliver(&user.email, &reset_path(&uid, &token));
                self.log.auth_event(AuthEvent::new(
                    AuthEventKind::PasswordResetRequested,
                    client_addr,
                    &req.email,
                ));
            }
            None => {
                self.log.auth_event(AuthEvent::new(
                    AuthEventKind::PasswordResetUnknownEmail,
                    client_addr,
                    &req.email,
                ));
            }
        }

        Ok(SuccessResponse::new(RESET_REQUESTED_MESSAGE))
    }

    /// Complete a password reset
    pub async fn confirm_password_reset(
        &self,
        client_addr: &str,
        req: PasswordResetConfirm,
    ) -> Result<SuccessResponse, ApiError> {
        if req.uid.is_empty()
            || req.token.is_empty()
            || req.password.is_empty()
            || req.password_confirm.is_empty()
        {
            return Err(ApiError::Rejected("All fields are required".to_string()));
        }

        if req.password != req.password_confirm {
            return Err(ApiError::Rejected("Passwords do not match".to_string()));
        }

        let problems = check_password_strength(&req.password);
        if !problems.is_empty() {
            return Err(ApiError::PasswordPolicy(problems));
        }

        let user = match decode_uid(&req.uid) {
            Some(id) => self.users.find_by_id(id).await?,
            None => None,
        };

        // Bad uid, unknown user and bad token all collapse to one answer
        let Some(user) = user.filter(|u| self.reset_tokens.check_token(u, &req.token)) else {
            self.log.auth_event(
                AuthEvent::new(AuthEventKind::PasswordResetInvalid, client_addr, &req.uid)
                    .with_detail("invalid token or uid"),
            );
            return Err(ApiError::InvalidToken);
        };

        let password_hash = hash_password(&req.password, self.bcrypt_cost).await?;
        self.users.set_password(user.id, &password_hash).await?;

        self.log.auth_event(AuthEvent::new(
            AuthEventKind::PasswordResetCompleted,
            client_addr,
            &user.email,
        ));

        Ok(SuccessResponse::new(RESET_COMPLETED_MESSAGE))
    }

    /// Exchange a refresh token for a new access token
    pub async fn refresh_access_token(
        &self,
        req: RefreshTokenRequest,
    ) -> Result<AccessTokenResponse, ApiError> {
        let claims = verify_token_of_type(&req.refresh, &self.jwt_secret, TokenType::Refresh)?;
        let user_id = get_user_id_from_claims(&claims)?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Token is invalid or expired".to_string()))?;

        Ok(AccessTokenResponse {
            access: generate_access_token(&user, &self.jwt_secret, self.access_token_ttl_seconds)?,
        })
    }

    /// Check a token's signature and expiry
    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        Ok(verify_token(token, &self.jwt_secret)?)
    }

    pub async fn get_user_by_id(&self, user_id: Uuid) -> Result<User, ApiError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Not found.".to_string()))
    }

    /// Admin flag as currently stored, not as captured in a token
    pub async fn is_admin(&self, user_id: Uuid) -> Result<bool, ApiError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;
        Ok(user.is_admin)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        Ok(self.users.list().await?)
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    pub fn security_log(&self) -> &Arc<dyn SecurityLog> {
        &self.log
    }

    /// `Some(user)` only when the username exists and the password matches
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>, ApiError> {
        match self.users.find_by_username(username).await? {
            Some(user) => {
                if verify_password(password, &user.password_hash).await? {
                    Ok(Some(user))
                } else {
                    Ok(None)
                }
            }
            None => {
                // Pay the same hashing cost as a real verification
                let dummy = self
                    .dummy_hash
                    .get_or_try_init(|| hash_password(DUMMY_PASSWORD, self.bcrypt_cost))
                    .await?;
                verify_password(password, dummy).await?;
                Ok(None)
            }
        }
    }

    async fn reject_registration(&self, client_addr: &str, username: &str, field: &str) -> ApiError {
        self.log.auth_event(
            AuthEvent::new(AuthEventKind::RegistrationRejected, client_addr, username)
                .with_detail(format!("{} already registered", field)),
        );
        self.failure_delay().await;
        ApiError::field(field, &format!("A user with that {} already exists.", field))
    }

    async fn failure_delay(&self) {
        tokio::time::sleep(self.failure_delay).await;
    }
}
