//! Request authenticator: the per-request entry point the surrounding
//! HTTP layer mounts in front of every protected route.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use crate::cookies::ACCESS_TOKEN_COOKIE;
use crate::models::{Principal, UserStatus};
use crate::services::audit::{AuditEvent, AuditEventType};
use crate::services::error::ServiceError;
use crate::services::session::ClientInfo;
use crate::TrustState;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn unauthorized() -> (StatusCode, Json<ErrorResponse>) {
    // One body for every authentication failure; causes live in the
    // logs only.
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "Unauthorized".to_string(),
        }),
    )
}

/// Middleware to require authentication.
///
/// Pulls the bearer token from the Authorization header or the
/// `access_token` cookie, verifies it, re-checks the account row, and
/// threads the resulting [`Principal`] through request extensions.
pub async fn auth_middleware(
    State(state): State<TrustState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_owned);

    let token = match bearer {
        Some(token) => token,
        None => {
            let jar = CookieJar::from_headers(req.headers());
            match jar.get(ACCESS_TOKEN_COOKIE) {
                Some(cookie) => cookie.value().to_string(),
                None => return Err(unauthorized()),
            }
        }
    };

    let claims = match state.codec.verify_access(&token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(cause = %e, "Access token rejected");
            return Err(unauthorized());
        }
    };

    // Fresh status check: suspension and account removal cut access
    // immediately, independent of the token's remaining lifetime.
    let user = match state.users.find_user_by_id(claims.sub).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(unauthorized()),
        Err(e) => {
            tracing::error!(error = %e, "Credential store error during authentication");
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Internal server error".to_string(),
                }),
            ));
        }
    };

    let principal = match Principal::from_user(&user) {
        Ok(principal) => principal,
        Err(e) => {
            tracing::error!(error = %e, user_id = %user.user_id, "Corrupt user row");
            return Err(unauthorized());
        }
    };

    if principal.status != UserStatus::Active || principal.tenant_id != claims.tenant {
        return Err(unauthorized());
    }

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// Extractor for the authenticated principal in handlers.
pub struct AuthPrincipal(pub Principal);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthPrincipal
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts.extensions.get::<Principal>().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Principal missing from request extensions".to_string(),
            }),
        ))?;

        Ok(AuthPrincipal(principal.clone()))
    }
}

/// Permission gate for mutating handlers. Forbidden is visibly distinct
/// from Unauthorized so clients can tell "log in again" from "you lack
/// permission".
pub async fn authorize(
    state: &TrustState,
    principal: &Principal,
    client: &ClientInfo,
    resource: &str,
    action: &str,
) -> Result<(), ServiceError> {
    let allowed = state
        .authz
        .has_permission(principal, resource, action)
        .await?;

    if !allowed {
        // The audit entry is the only durable trace of the denial.
        state
            .audit
            .record_sync(
                AuditEvent::new(AuditEventType::AuthorizationDenied, &client.ip_address)
                    .with_user(principal.user_id)
                    .with_client(&client.user_agent, &client.device_info)
                    .failed(format!("{}.{}", resource, action)),
            )
            .await;
        return Err(ServiceError::Authorization {
            resource: resource.to_string(),
            action: action.to_string(),
        });
    }

    Ok(())
}
