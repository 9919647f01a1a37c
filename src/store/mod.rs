//! Persistence contracts the engine depends on. Both backends (`postgres`,
//! `memory`) implement all four traits with the same semantics.

pub mod memory;
pub mod postgres;

use axum::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::Result;
use crate::models::answer::Answer;
use crate::models::category::Category;
use crate::models::question::{AnswerKey, Difficulty, Question, QuestionWithAnswers};
use crate::models::user::User;
use crate::models::user_response::{NewUserResponse, ResponseTally, UserResponse};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuestionFilter {
    pub category_id: Option<i64>,
    pub difficulty: Option<Difficulty>,
}

impl QuestionFilter {
    pub fn matches(&self, question: &Question) -> bool {
        self.category_id.map_or(true, |id| question.category_id == id)
            && self.difficulty.map_or(true, |d| question.difficulty == d)
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Profile fields a user may change. Score counters are deliberately absent.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub text: String,
    pub difficulty: Difficulty,
    pub explanation: Option<String>,
    pub category_id: i64,
    pub answers: Vec<NewAnswer>,
}

#[derive(Debug, Clone)]
pub struct NewAnswer {
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AnswerUpdate {
    pub text: Option<String>,
    pub is_correct: Option<bool>,
}

/// Read side of the question catalog used by quiz generation and grading.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Playable questions only: those with exactly one correct answer.
    async fn find_questions(&self, filter: QuestionFilter) -> Result<Vec<Question>>;

    async fn get_question(&self, question_id: i64) -> Result<Option<Question>>;

    async fn answers_for_questions(&self, question_ids: &[i64]) -> Result<Vec<Answer>>;

    async fn answer_keys(&self, question_ids: &[i64]) -> Result<Vec<AnswerKey>>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResponseLedger: Send + Sync {
    /// Appends every response and applies `total_score += score_delta`,
    /// `games_played += 1` as one unit of work. Nothing persists on error.
    async fn record_submission(
        &self,
        user_id: i64,
        responses: &[NewUserResponse],
        score_delta: i64,
    ) -> Result<User>;

    async fn response_tallies(&self, user_id: i64) -> Result<Vec<ResponseTally>>;

    async fn recent_responses(&self, user_id: i64, limit: i64) -> Result<Vec<UserResponse>>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User>;

    async fn find_user(&self, user_id: i64) -> Result<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn update_profile(&self, user_id: i64, update: ProfileUpdate) -> Result<User>;

    async fn set_admin(&self, user_id: i64, is_admin: bool) -> Result<()>;

    /// Users with at least one game, highest `total_score` first.
    async fn leaderboard(&self, limit: i64) -> Result<Vec<User>>;
}

/// Authoring side. Answer writes enforce the one-correct-answer rule.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_category(&self, name: &str) -> Result<Category>;

    async fn list_categories(&self) -> Result<Vec<Category>>;

    async fn create_question(&self, question: NewQuestion) -> Result<QuestionWithAnswers>;

    async fn delete_question(&self, question_id: i64) -> Result<bool>;

    async fn create_answer(&self, question_id: i64, answer: NewAnswer) -> Result<Answer>;

    async fn update_answer(&self, answer_id: i64, update: AnswerUpdate) -> Result<Answer>;

    async fn delete_answer(&self, answer_id: i64) -> Result<bool>;
}
