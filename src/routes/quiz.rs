use axum::{extract::State, response::Json, Extension};

use crate::{
    dto::quiz_dto::{GenerateQuizRequest, QuizPayload, QuizResult, SubmitQuizRequest},
    error::Result,
    utils::token::Claims,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/quiz/generate",
    request_body = GenerateQuizRequest,
    responses(
        (status = 200, description = "Randomized quiz, correctness flags withheld", body = QuizPayload),
        (status = 400, description = "Invalid question count")
    )
)]
#[axum::debug_handler]
pub async fn generate_quiz(
    State(state): State<AppState>,
    Json(payload): Json<GenerateQuizRequest>,
) -> Result<Json<QuizPayload>> {
    let quiz = state.quiz_service.generate_quiz(payload).await?;
    Ok(Json(quiz))
}

#[utoipa::path(
    post,
    path = "/api/v1/quiz/submit",
    request_body = SubmitQuizRequest,
    responses(
        (status = 200, description = "Graded submission", body = QuizResult),
        (status = 401, description = "Missing or invalid token"),
        (status = 503, description = "Storage unavailable, nothing was recorded")
    )
)]
#[axum::debug_handler]
pub async fn submit_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitQuizRequest>,
) -> Result<Json<QuizResult>> {
    let user = state.user_service.active_user(claims.user_id()?).await?;
    let result = state.grading_service.submit_quiz(user.id, payload).await?;
    Ok(Json(result))
}
