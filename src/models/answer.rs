use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Answer {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,
    pub created_at: DateTime<Utc>,
}
