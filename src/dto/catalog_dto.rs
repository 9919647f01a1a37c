use serde::Deserialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::models::question::Difficulty;
use crate::store::{AnswerUpdate, NewAnswer, NewQuestion};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAnswerRequest {
    #[validate(length(min = 1))]
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

impl From<CreateAnswerRequest> for NewAnswer {
    fn from(req: CreateAnswerRequest) -> Self {
        Self {
            text: req.text,
            is_correct: req.is_correct,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "one_correct_answer", skip_on_field_errors = false))]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1))]
    pub text: String,
    pub difficulty: Difficulty,
    pub explanation: Option<String>,
    pub category_id: i64,
    #[serde(default)]
    #[validate(nested)]
    pub answers: Vec<CreateAnswerRequest>,
}

/// An initial answer set, when given, must mark exactly one answer correct.
fn one_correct_answer(req: &CreateQuestionRequest) -> Result<(), ValidationError> {
    if req.answers.is_empty() {
        return Ok(());
    }
    let correct = req.answers.iter().filter(|a| a.is_correct).count();
    if correct != 1 {
        let mut err = ValidationError::new("one_correct_answer");
        err.message = Some(format!("expected exactly one correct answer, got {}", correct).into());
        return Err(err);
    }
    Ok(())
}

impl From<CreateQuestionRequest> for NewQuestion {
    fn from(req: CreateQuestionRequest) -> Self {
        Self {
            text: req.text,
            difficulty: req.difficulty,
            explanation: req.explanation,
            category_id: req.category_id,
            answers: req.answers.into_iter().map(NewAnswer::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateAnswerRequest {
    #[validate(length(min = 1))]
    pub text: Option<String>,
    pub is_correct: Option<bool>,
}

impl From<UpdateAnswerRequest> for AnswerUpdate {
    fn from(req: UpdateAnswerRequest) -> Self {
        Self {
            text: req.text,
            is_correct: req.is_correct,
        }
    }
}
