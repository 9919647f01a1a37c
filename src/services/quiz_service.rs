use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use validator::Validate;

use crate::dto::quiz_dto::{CategorySummary, GenerateQuizRequest, QuizAnswer, QuizPayload, QuizQuestion};
use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::question::Question;
use crate::store::{QuestionFilter, QuestionStore};

/// Uniform sample of `count` distinct questions (fewer when the pool is
/// smaller), in random order.
pub fn sample_questions<R: Rng + ?Sized>(
    mut pool: Vec<Question>,
    count: usize,
    rng: &mut R,
) -> Vec<Question> {
    let take = count.min(pool.len());
    let (chosen, _) = pool.partial_shuffle(rng, take);
    chosen.to_vec()
}

pub fn shuffle_answers<R: Rng + ?Sized>(answers: Vec<Answer>, rng: &mut R) -> Vec<QuizAnswer> {
    let mut out: Vec<QuizAnswer> = answers
        .into_iter()
        .map(|a| QuizAnswer {
            id: a.id,
            text: a.text,
        })
        .collect();
    out.shuffle(rng);
    out
}

#[derive(Clone)]
pub struct QuizService {
    questions: Arc<dyn QuestionStore>,
    max_questions: usize,
}

impl QuizService {
    pub fn new(questions: Arc<dyn QuestionStore>, max_questions: usize) -> Self {
        Self {
            questions,
            max_questions,
        }
    }

    pub async fn generate_quiz(&self, req: GenerateQuizRequest) -> Result<QuizPayload> {
        let mut rng = StdRng::from_entropy();
        self.generate_quiz_with_rng(req, &mut rng).await
    }

    pub async fn generate_quiz_with_rng<R>(
        &self,
        req: GenerateQuizRequest,
        rng: &mut R,
    ) -> Result<QuizPayload>
    where
        R: Rng + Send,
    {
        req.validate()?;
        let requested = usize::try_from(req.count)
            .map_err(|_| Error::BadRequest("count must be at least 1".to_string()))?;
        let count = requested.min(self.max_questions);

        let filter = QuestionFilter {
            category_id: req.category_id,
            difficulty: req.difficulty,
        };
        let pool = self.questions.find_questions(filter).await?;
        if pool.is_empty() {
            tracing::info!(?filter, "no questions match quiz filter");
            return Ok(QuizPayload::default());
        }
        let available = pool.len();

        let selected = sample_questions(pool, count, rng);
        let ids: Vec<i64> = selected.iter().map(|q| q.id).collect();
        let mut answers_by_question: HashMap<i64, Vec<Answer>> = HashMap::new();
        for answer in self.questions.answers_for_questions(&ids).await? {
            answers_by_question
                .entry(answer.question_id)
                .or_default()
                .push(answer);
        }

        let questions = selected
            .into_iter()
            .map(|q| {
                let answers = answers_by_question.remove(&q.id).unwrap_or_default();
                QuizQuestion {
                    id: q.id,
                    text: q.text,
                    category: CategorySummary {
                        id: q.category_id,
                        name: q.category_name,
                    },
                    difficulty: q.difficulty,
                    answers: shuffle_answers(answers, rng),
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            requested,
            capped = count,
            available,
            returned = questions.len(),
            "quiz generated"
        );
        Ok(QuizPayload { questions })
    }
}
