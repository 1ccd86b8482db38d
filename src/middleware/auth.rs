//! Authentication extractors
//!
//! Bearer-token verification and the permission checks built on it.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;
use uuid::Uuid;

use super::client::ClientInfo;
use crate::auth::{get_user_id_from_claims, verify_token_of_type, AuthService, TokenType};
use crate::error::ApiError;
use crate::security::{AuthEvent, AuthEventKind};

pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";
pub const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";

/// Authenticated user extracted from an access token
///
/// Carries identity only. Permission checks read the stored account, so a
/// role change applies to tokens already issued.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub username: String,
}

/// Extractor for authenticated users
///
/// Requires `Authorization: Bearer <access token>`. Refresh tokens are
/// rejected.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(user: AuthenticatedUser) -> impl IntoResponse {
///     format!("Hello, {}", user.username)
/// }
/// ```
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::Unauthorized(NOT_AUTHENTICATED.to_string()))?;

        let auth_service = Arc::<AuthService>::from_ref(state);

        let claims = verify_token_of_type(
            bearer.token(),
            auth_service.jwt_secret(),
            TokenType::Access,
        )?;
        let user_id = get_user_id_from_claims(&claims)?;

        Ok(AuthenticatedUser {
            user_id,
            username: claims.username,
        })
    }
}

/// Requires an administrator
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        let auth_service = Arc::<AuthService>::from_ref(state);

        if !auth_service.is_admin(user.user_id).await? {
            let client = ClientInfo::from_parts(&parts.headers, &parts.extensions);
            auth_service.security_log().auth_event(
                AuthEvent::new(AuthEventKind::PermissionDenied, &client.addr, &user.username)
                    .with_detail(format!("admin required for {}", parts.uri.path())),
            );
            return Err(ApiError::Forbidden(PERMISSION_DENIED.to_string()));
        }

        Ok(AdminUser(user))
    }
}

/// Allow the owner of a resource, or an administrator
pub async fn ensure_owner_or_admin(
    user: &AuthenticatedUser,
    owner_id: Uuid,
    auth_service: &AuthService,
    client_addr: &str,
) -> Result<(), ApiError> {
    if user.user_id == owner_id || auth_service.is_admin(user.user_id).await? {
        return Ok(());
    }

    auth_service.security_log().auth_event(
        AuthEvent::new(AuthEventKind::PermissionDenied, client_addr, &user.username)
            .with_detail(format!("not owner of {}", owner_id)),
    );
    Err(ApiError::Forbidden(PERMISSION_DENIED.to_string()))
}
