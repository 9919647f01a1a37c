use std::collections::HashMap;
use std::sync::Arc;

use crate::dto::quiz_dto::{QuestionResult, QuizResult, SubmitQuizRequest, SubmittedAnswer};
use crate::error::Result;
use crate::models::question::AnswerKey;
use crate::models::user_response::NewUserResponse;
use crate::store::{QuestionStore, ResponseLedger};

/// Outcome of grading a submission before anything is persisted.
#[derive(Debug, Default)]
pub struct GradedSubmission {
    pub score: i64,
    pub results: Vec<QuestionResult>,
    pub responses: Vec<NewUserResponse>,
    pub skipped: usize,
}

impl GradedSubmission {
    pub fn total_questions(&self) -> i64 {
        self.results.len() as i64
    }

    pub fn percentage(&self) -> f64 {
        let total = self.total_questions();
        if total > 0 {
            self.score as f64 / total as f64 * 100.0
        } else {
            0.0
        }
    }

    pub fn into_result(self) -> QuizResult {
        QuizResult {
            score: self.score,
            total_questions: self.total_questions(),
            percentage: self.percentage(),
            results: self.results,
        }
    }
}

enum KeyLookup {
    Single(AnswerKey),
    Ambiguous,
}

fn index_keys(keys: Vec<AnswerKey>) -> HashMap<i64, KeyLookup> {
    let mut index = HashMap::with_capacity(keys.len());
    for key in keys {
        index
            .entry(key.question_id)
            .and_modify(|slot| *slot = KeyLookup::Ambiguous)
            .or_insert(KeyLookup::Single(key));
    }
    index
}

#[derive(Clone)]
pub struct GradingService {
    questions: Arc<dyn QuestionStore>,
    ledger: Arc<dyn ResponseLedger>,
}

impl GradingService {
    pub fn new(questions: Arc<dyn QuestionStore>, ledger: Arc<dyn ResponseLedger>) -> Self {
        Self { questions, ledger }
    }

    /// Grades each pair against the answer keys, in submission order. Pairs
    /// whose question is unknown or breaks the one-correct-answer rule are
    /// skipped.
    pub fn grade(answers: &[SubmittedAnswer], keys: Vec<AnswerKey>) -> GradedSubmission {
        let index = index_keys(keys);
        let mut graded = GradedSubmission::default();

        for submitted in answers {
            let key = match index.get(&submitted.question_id) {
                Some(KeyLookup::Single(key)) => key,
                Some(KeyLookup::Ambiguous) => {
                    tracing::warn!(
                        question_id = submitted.question_id,
                        "question has more than one correct answer, skipping"
                    );
                    graded.skipped += 1;
                    continue;
                }
                None => {
                    tracing::warn!(
                        question_id = submitted.question_id,
                        "question missing or without a correct answer, skipping"
                    );
                    graded.skipped += 1;
                    continue;
                }
            };

            let is_correct = submitted.answer_id == key.correct_answer_id;
            if is_correct {
                graded.score += 1;
            }
            let owned_answer = key
                .answer_ids
                .contains(&submitted.answer_id)
                .then_some(submitted.answer_id);

            graded.responses.push(NewUserResponse {
                question_id: submitted.question_id,
                answer_id: owned_answer,
                is_correct,
            });
            graded.results.push(QuestionResult {
                question_id: submitted.question_id,
                submitted_answer_id: submitted.answer_id,
                correct_answer_id: key.correct_answer_id,
                is_correct,
                explanation: key.explanation.clone(),
            });
        }

        graded
    }

    /// Grades a submission and records it: every response plus the user's
    /// score increment land together or not at all.
    pub async fn submit_quiz(&self, user_id: i64, req: SubmitQuizRequest) -> Result<QuizResult> {
        let mut question_ids: Vec<i64> = req.answers.iter().map(|a| a.question_id).collect();
        question_ids.sort_unstable();
        question_ids.dedup();

        let keys = if question_ids.is_empty() {
            Vec::new()
        } else {
            self.questions.answer_keys(&question_ids).await?
        };

        let graded = Self::grade(&req.answers, keys);
        let user = match self
            .ledger
            .record_submission(user_id, &graded.responses, graded.score)
            .await
        {
            Ok(user) => user,
            Err(e) => {
                tracing::error!(user_id, error = ?e, "failed to record quiz submission");
                return Err(e);
            }
        };

        tracing::info!(
            user_id,
            score = graded.score,
            graded = graded.results.len(),
            skipped = graded.skipped,
            total_score = user.total_score,
            games_played = user.games_played,
            "quiz submission recorded"
        );
        Ok(graded.into_result())
    }
}
