use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::models::answer::Answer;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    sqlx::Type,
    ToSchema,
)]
#[sqlx(type_name = "difficulty_level")]
pub enum Difficulty {
    #[serde(rename = "Easy", alias = "easy", alias = "EASY")]
    #[sqlx(rename = "Easy")]
    Easy,
    #[serde(rename = "Medium", alias = "medium", alias = "MEDIUM")]
    #[sqlx(rename = "Medium")]
    Medium,
    #[serde(rename = "Hard", alias = "hard", alias = "HARD")]
    #[sqlx(rename = "Hard")]
    Hard,
    #[serde(
        rename = "Very Hard",
        alias = "very hard",
        alias = "VERY HARD",
        alias = "very_hard",
        alias = "VERY_HARD"
    )]
    #[sqlx(rename = "Very Hard")]
    VeryHard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::VeryHard,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::VeryHard => "Very Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('_', " ");
        Difficulty::ALL
            .into_iter()
            .find(|d| d.label().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| format!("unknown difficulty '{}'", s))
    }
}

/// A question as read back from the store, with its category name joined in.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Question {
    pub id: i64,
    pub text: String,
    pub difficulty: Difficulty,
    pub explanation: Option<String>,
    pub category_id: i64,
    pub category_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuestionWithAnswers {
    #[serde(flatten)]
    pub question: Question,
    pub answers: Vec<Answer>,
}

/// Grading key of one question: the correct answer plus every answer id the
/// question owns. A question violating the one-correct-answer rule yields zero
/// or several keys.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct AnswerKey {
    pub question_id: i64,
    pub correct_answer_id: i64,
    pub explanation: Option<String>,
    pub answer_ids: Vec<i64>,
}
