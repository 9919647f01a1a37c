use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};

use crate::{
    dto::user_dto::{
        LeaderboardEntry, LimitQuery, LoginRequest, RegisterRequest, TokenResponse,
        UpdateProfileRequest, UserProfile, UserStats,
    },
    error::Result,
    models::user_response::UserResponse,
    utils::token::Claims,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = UserProfile),
        (status = 409, description = "Username or email already taken")
    )
)]
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>)> {
    let profile = state.user_service.register(payload).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access token issued", body = TokenResponse),
        (status = 401, description = "Incorrect username or password")
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let token = state.user_service.login(payload).await?;
    Ok(Json(token))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses((status = 200, description = "Caller profile", body = UserProfile))
)]
#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UserProfile>> {
    let profile = state.user_service.me(claims.user_id()?).await?;
    Ok(Json(profile))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserProfile),
        (status = 409, description = "Username or email already taken")
    )
)]
#[axum::debug_handler]
pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>> {
    let profile = state
        .user_service
        .update_me(claims.user_id()?, payload)
        .await?;
    Ok(Json(profile))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/stats",
    responses((status = 200, description = "Accuracy overall, per category and per difficulty", body = UserStats))
)]
#[axum::debug_handler]
pub async fn stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UserStats>> {
    let user = state.user_service.active_user(claims.user_id()?).await?;
    let stats = state.stats_service.user_stats(user.id).await?;
    Ok(Json(stats))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/history",
    params(
        ("limit" = Option<i64>, Query, description = "Number of responses to return")
    ),
    responses((status = 200, description = "Most recent graded answers", body = [UserResponse]))
)]
#[axum::debug_handler]
pub async fn history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<UserResponse>>> {
    let user = state.user_service.active_user(claims.user_id()?).await?;
    let responses = state
        .stats_service
        .recent_responses(user.id, query.limit)
        .await?;
    Ok(Json(responses))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/leaderboard",
    params(
        ("limit" = Option<i64>, Query, description = "Number of entries to return")
    ),
    responses(
        (status = 200, description = "Top players", body = [LeaderboardEntry]),
        (status = 400, description = "Limit out of range")
    )
)]
#[axum::debug_handler]
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>> {
    let entries = state.stats_service.leaderboard(query.limit).await?;
    Ok(Json(entries))
}
