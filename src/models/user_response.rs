use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::models::question::Difficulty;

/// One graded answer. Rows are append-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub user_id: i64,
    pub question_id: i64,
    /// `None` when the submitted id was not one of the question's answers.
    pub answer_id: Option<i64>,
    pub is_correct: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserResponse {
    pub question_id: i64,
    pub answer_id: Option<i64>,
    pub is_correct: bool,
}

/// Ledger counts for one user grouped by (category, difficulty).
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ResponseTally {
    pub category: String,
    pub difficulty: Difficulty,
    pub total: i64,
    pub correct: i64,
}
