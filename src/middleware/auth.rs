use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::error::Error;
use crate::utils::token::Claims;
use crate::AppState;

fn reject(status: StatusCode, code: &str) -> Response {
    (status, Json(json!({ "error": code }))).into_response()
}

fn bearer_token(headers: &HeaderMap) -> std::result::Result<&str, Response> {
    let Some(auth_header) = headers.get(AUTHORIZATION) else {
        return Err(reject(StatusCode::UNAUTHORIZED, "missing_authorization"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(reject(StatusCode::UNAUTHORIZED, "bad_authorization"));
    };
    auth_str
        .strip_prefix("Bearer ")
        .or_else(|| auth_str.strip_prefix("bearer "))
        .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "unsupported_scheme"))
}

fn verified_claims(state: &AppState, headers: &HeaderMap) -> std::result::Result<Claims, Response> {
    let token = bearer_token(headers)?;
    state.user_service.verify_token(token).map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        reject(StatusCode::UNAUTHORIZED, "invalid_token")
    })
}

/// Verifies the bearer JWT and stores its `Claims` in request extensions.
pub async fn require_bearer_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    match verified_claims(&state, req.headers()) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(resp) => resp,
    }
}

/// Admin gate. The stored account decides: a deactivated or demoted admin
/// is refused even while their token is still valid.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let claims = match verified_claims(&state, req.headers()) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };
    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };
    let user = match state.user_service.active_user(user_id).await {
        Ok(user) => user,
        Err(e) => return e.into_response(),
    };
    if !user.is_admin {
        tracing::debug!(user_id, "admin route refused");
        return Error::Forbidden("forbidden".to_string()).into_response();
    }
    req.extensions_mut().insert(claims);
    next.run(req).await
}
