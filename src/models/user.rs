use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// `total_score` and `games_played` only ever move through
/// `ResponseLedger::record_submission`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub total_score: i64,
    pub games_played: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
