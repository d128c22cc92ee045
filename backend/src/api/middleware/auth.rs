//! Bearer token authentication middleware.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};

use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::services::auth_service::{Claims, COMPANY_USER_TYPE};

/// Authenticated caller, attached to the request by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthExtension {
    pub user_id: String,
    pub user_type: Option<String>,
    pub claims: Claims,
}

impl AuthExtension {
    pub fn is_company(&self) -> bool {
        self.user_type.as_deref() == Some(COMPANY_USER_TYPE)
    }
}

impl From<Claims> for AuthExtension {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub.clone(),
            user_type: claims.user_type.clone(),
            claims,
        }
    }
}

/// Pull the token out of an `Authorization` value. The `Bearer ` prefix is
/// optional.
pub fn extract_token(header: &str) -> &str {
    header.strip_prefix("Bearer ").unwrap_or(header).trim()
}

/// Reject requests without a valid token.
pub async fn auth_middleware(
    State(state): State<SharedState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    let invalid = || AppError::Authentication("Invalid authentication token".to_string());
    let token = header
        .to_str()
        .map(|value| extract_token(value).to_string())
        .map_err(|_| invalid())?;

    let claims = state.auth.decode(&token).map_err(|e| {
        tracing::debug!("Token rejected: {}", e);
        invalid()
    })?;

    request.extensions_mut().insert(AuthExtension::from(claims));
    Ok(next.run(request).await)
}
