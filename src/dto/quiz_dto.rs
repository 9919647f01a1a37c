use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::question::Difficulty;

fn default_count() -> i64 {
    10
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct GenerateQuizRequest {
    pub category_id: Option<i64>,
    pub difficulty: Option<Difficulty>,
    #[serde(default = "default_count", alias = "num_questions")]
    #[validate(range(min = 1, message = "count must be at least 1"))]
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategorySummary {
    pub id: i64,
    pub name: String,
}

/// Answers never carry their correctness flag on the way out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QuizAnswer {
    pub id: i64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuizQuestion {
    pub id: i64,
    pub text: String,
    pub category: CategorySummary,
    pub difficulty: Difficulty,
    pub answers: Vec<QuizAnswer>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct QuizPayload {
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct SubmittedAnswer {
    pub question_id: i64,
    pub answer_id: i64,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubmitQuizRequest {
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuestionResult {
    pub question_id: i64,
    pub submitted_answer_id: i64,
    pub correct_answer_id: i64,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuizResult {
    pub score: i64,
    pub total_questions: i64,
    pub percentage: f64,
    pub results: Vec<QuestionResult>,
}
