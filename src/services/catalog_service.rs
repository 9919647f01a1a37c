use std::sync::Arc;

use validator::Validate;

use crate::dto::catalog_dto::{
    CreateAnswerRequest, CreateCategoryRequest, CreateQuestionRequest, UpdateAnswerRequest,
};
use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::category::Category;
use crate::models::question::{Difficulty, QuestionWithAnswers};
use crate::store::{CatalogStore, QuestionStore};

/// Authoring operations over categories, questions and answers.
#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogStore>,
    questions: Arc<dyn QuestionStore>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogStore>, questions: Arc<dyn QuestionStore>) -> Self {
        Self { catalog, questions }
    }

    pub fn difficulties() -> Vec<&'static str> {
        Difficulty::ALL.iter().map(Difficulty::label).collect()
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.catalog.list_categories().await
    }

    pub async fn create_category(&self, req: CreateCategoryRequest) -> Result<Category> {
        req.validate()?;
        let category = self.catalog.create_category(req.name.trim()).await?;
        tracing::info!(category_id = category.id, name = %category.name, "category created");
        Ok(category)
    }

    pub async fn create_question(&self, req: CreateQuestionRequest) -> Result<QuestionWithAnswers> {
        req.validate()?;
        let created = self.catalog.create_question(req.into()).await?;
        tracing::info!(
            question_id = created.question.id,
            category_id = created.question.category_id,
            answers = created.answers.len(),
            "question created"
        );
        Ok(created)
    }

    pub async fn get_question(&self, question_id: i64) -> Result<QuestionWithAnswers> {
        let question = self
            .questions
            .get_question(question_id)
            .await?
            .ok_or_else(|| Error::NotFound("Question not found".to_string()))?;
        let answers = self.questions.answers_for_questions(&[question_id]).await?;
        Ok(QuestionWithAnswers { question, answers })
    }

    pub async fn delete_question(&self, question_id: i64) -> Result<()> {
        if !self.catalog.delete_question(question_id).await? {
            return Err(Error::NotFound("Question not found".to_string()));
        }
        tracing::info!(question_id, "question deleted");
        Ok(())
    }

    pub async fn add_answer(&self, question_id: i64, req: CreateAnswerRequest) -> Result<Answer> {
        req.validate()?;
        let answer = self.catalog.create_answer(question_id, req.into()).await?;
        tracing::info!(question_id, answer_id = answer.id, "answer created");
        Ok(answer)
    }

    pub async fn update_answer(&self, answer_id: i64, req: UpdateAnswerRequest) -> Result<Answer> {
        req.validate()?;
        if req.text.is_none() && req.is_correct.is_none() {
            return Err(Error::BadRequest("Nothing to update".to_string()));
        }
        let answer = self.catalog.update_answer(answer_id, req.into()).await?;
        tracing::info!(answer_id, question_id = answer.question_id, "answer updated");
        Ok(answer)
    }

    pub async fn delete_answer(&self, answer_id: i64) -> Result<()> {
        if !self.catalog.delete_answer(answer_id).await? {
            return Err(Error::NotFound("Answer not found".to_string()));
        }
        tracing::info!(answer_id, "answer deleted");
        Ok(())
    }
}
