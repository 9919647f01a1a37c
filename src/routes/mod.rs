pub mod catalog;
pub mod health;
pub mod quiz;
pub mod users;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    response::Json,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

use crate::dto::catalog_dto::{
    CreateAnswerRequest, CreateCategoryRequest, CreateQuestionRequest, UpdateAnswerRequest,
};
use crate::dto::quiz_dto::{
    CategorySummary, GenerateQuizRequest, QuestionResult, QuizAnswer, QuizPayload, QuizQuestion,
    QuizResult, SubmitQuizRequest, SubmittedAnswer,
};
use crate::dto::user_dto::{
    LeaderboardEntry, LoginRequest, RegisterRequest, StatsBucket, TokenResponse,
    UpdateProfileRequest, UserProfile, UserStats,
};
use crate::middleware::auth::{require_admin, require_bearer_auth};
use crate::models::{
    answer::Answer,
    category::Category,
    question::{Difficulty, Question, QuestionWithAnswers},
    user_response::UserResponse,
};
use crate::AppState;

const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        users::register,
        users::login,
        users::me,
        users::update_me,
        users::stats,
        users::history,
        users::leaderboard,
        quiz::generate_quiz,
        quiz::submit_quiz,
        catalog::list_difficulties,
        catalog::list_categories,
        catalog::create_category,
        catalog::create_question,
        catalog::get_question,
        catalog::delete_question,
        catalog::create_answer,
        catalog::update_answer,
        catalog::delete_answer,
    ),
    components(schemas(
        GenerateQuizRequest,
        SubmitQuizRequest,
        SubmittedAnswer,
        QuizPayload,
        QuizQuestion,
        QuizAnswer,
        CategorySummary,
        QuizResult,
        QuestionResult,
        RegisterRequest,
        LoginRequest,
        TokenResponse,
        UpdateProfileRequest,
        UserProfile,
        UserStats,
        StatsBucket,
        LeaderboardEntry,
        CreateCategoryRequest,
        CreateQuestionRequest,
        CreateAnswerRequest,
        UpdateAnswerRequest,
        Category,
        Difficulty,
        Question,
        QuestionWithAnswers,
        Answer,
        UserResponse,
    )),
    tags((name = "quiz", description = "Quiz session engine"))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Full HTTP surface: public reads, bearer-protected player routes and
/// admin-only catalog writes.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health::health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .route("/api/v1/users/register", post(users::register))
        .route("/api/v1/users/login", post(users::login))
        .route("/api/v1/users/leaderboard", get(users::leaderboard))
        .route("/api/v1/quiz/generate", post(quiz::generate_quiz))
        .route("/api/v1/difficulties", get(catalog::list_difficulties))
        .route(
            "/api/v1/categories",
            get(catalog::list_categories).merge(
                post(catalog::create_category)
                    .route_layer(from_fn_with_state(state.clone(), require_admin)),
            ),
        );

    let player = Router::new()
        .route("/api/v1/users/me", get(users::me).put(users::update_me))
        .route("/api/v1/users/stats", get(users::stats))
        .route("/api/v1/users/history", get(users::history))
        .route("/api/v1/quiz/submit", post(quiz::submit_quiz))
        .route_layer(from_fn_with_state(state.clone(), require_bearer_auth));

    let admin = Router::new()
        .route("/api/v1/questions", post(catalog::create_question))
        .route(
            "/api/v1/questions/:id",
            get(catalog::get_question).delete(catalog::delete_question),
        )
        .route("/api/v1/questions/:id/answers", post(catalog::create_answer))
        .route(
            "/api/v1/answers/:id",
            axum::routing::put(catalog::update_answer).delete(catalog::delete_answer),
        )
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    public
        .merge(player)
        .merge(admin)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
}
