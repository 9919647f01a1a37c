use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};

use crate::{
    dto::catalog_dto::{
        CreateAnswerRequest, CreateCategoryRequest, CreateQuestionRequest, UpdateAnswerRequest,
    },
    error::Result,
    models::{answer::Answer, category::Category, question::QuestionWithAnswers},
    services::catalog_service::CatalogService,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/difficulties",
    responses((status = 200, description = "Difficulty labels", body = [String]))
)]
#[axum::debug_handler]
pub async fn list_difficulties() -> impl IntoResponse {
    Json(CatalogService::difficulties())
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses((status = 200, description = "All categories by name", body = [Category]))
)]
#[axum::debug_handler]
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = state.catalog_service.list_categories().await?;
    Ok(Json(categories))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 409, description = "Category already exists")
    )
)]
#[axum::debug_handler]
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = state.catalog_service.create_category(payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    post,
    path = "/api/v1/questions",
    request_body = CreateQuestionRequest,
    responses(
        (status = 201, description = "Question created", body = QuestionWithAnswers),
        (status = 400, description = "Answer set does not have exactly one correct answer"),
        (status = 404, description = "Category not found")
    )
)]
#[axum::debug_handler]
pub async fn create_question(
    State(state): State<AppState>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<(StatusCode, Json<QuestionWithAnswers>)> {
    let question = state.catalog_service.create_question(payload).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

#[utoipa::path(
    get,
    path = "/api/v1/questions/{id}",
    params(("id" = i64, Path, description = "Question ID")),
    responses(
        (status = 200, description = "Question with its answers", body = QuestionWithAnswers),
        (status = 404, description = "Question not found")
    )
)]
#[axum::debug_handler]
pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<QuestionWithAnswers>> {
    let question = state.catalog_service.get_question(id).await?;
    Ok(Json(question))
}

#[utoipa::path(
    delete,
    path = "/api/v1/questions/{id}",
    params(("id" = i64, Path, description = "Question ID")),
    responses(
        (status = 204, description = "Question deleted"),
        (status = 404, description = "Question not found"),
        (status = 409, description = "Question has recorded responses")
    )
)]
#[axum::debug_handler]
pub async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.catalog_service.delete_question(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/questions/{id}/answers",
    params(("id" = i64, Path, description = "Question ID")),
    request_body = CreateAnswerRequest,
    responses(
        (status = 201, description = "Answer added", body = Answer),
        (status = 409, description = "Question already has a correct answer")
    )
)]
#[axum::debug_handler]
pub async fn create_answer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<CreateAnswerRequest>,
) -> Result<(StatusCode, Json<Answer>)> {
    let answer = state.catalog_service.add_answer(id, payload).await?;
    Ok((StatusCode::CREATED, Json(answer)))
}

#[utoipa::path(
    put,
    path = "/api/v1/answers/{id}",
    params(("id" = i64, Path, description = "Answer ID")),
    request_body = UpdateAnswerRequest,
    responses(
        (status = 200, description = "Answer updated", body = Answer),
        (status = 404, description = "Answer not found"),
        (status = 409, description = "Question already has a correct answer")
    )
)]
#[axum::debug_handler]
pub async fn update_answer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateAnswerRequest>,
) -> Result<Json<Answer>> {
    let answer = state.catalog_service.update_answer(id, payload).await?;
    Ok(Json(answer))
}

#[utoipa::path(
    delete,
    path = "/api/v1/answers/{id}",
    params(("id" = i64, Path, description = "Answer ID")),
    responses(
        (status = 204, description = "Answer deleted"),
        (status = 404, description = "Answer not found"),
        (status = 409, description = "Answer has recorded responses")
    )
)]
#[axum::debug_handler]
pub async fn delete_answer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.catalog_service.delete_answer(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
