use std::collections::{BTreeMap, HashMap};

use axum::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::category::Category;
use crate::models::question::{AnswerKey, Question, QuestionWithAnswers};
use crate::models::user::User;
use crate::models::user_response::{NewUserResponse, ResponseTally, UserResponse};
use crate::services::stats_service::leaderboard_order;
use crate::store::{
    AnswerUpdate, CatalogStore, NewAnswer, NewQuestion, NewUser, ProfileUpdate, QuestionFilter,
    QuestionStore, ResponseLedger, UserStore,
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    categories: BTreeMap<i64, Category>,
    questions: BTreeMap<i64, Question>,
    answers: BTreeMap<i64, Answer>,
    users: BTreeMap<i64, User>,
    responses: Vec<UserResponse>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn answers_of(&self, question_id: i64) -> impl Iterator<Item = &Answer> {
        self.answers
            .values()
            .filter(move |a| a.question_id == question_id)
    }

    fn correct_count(&self, question_id: i64, excluding: Option<i64>) -> usize {
        self.answers_of(question_id)
            .filter(|a| a.is_correct && Some(a.id) != excluding)
            .count()
    }

    fn name_taken(&self, username: &str, email: &str, except: Option<i64>) -> bool {
        self.users.values().any(|u| {
            Some(u.id) != except && (u.username == username || u.email == email)
        })
    }
}

/// Process-local store with the same contract as `PgStore`. Every unit of work
/// runs inside a single write-lock critical section.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_active(&self, user_id: i64, is_active: bool) -> Result<()> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| Error::NotFound(format!("User {} not found", user_id)))?;
        user.is_active = is_active;
        Ok(())
    }

    pub async fn response_count(&self, user_id: i64) -> usize {
        let tables = self.tables.read().await;
        tables.responses.iter().filter(|r| r.user_id == user_id).count()
    }
}

#[async_trait]
impl QuestionStore for MemoryStore {
    async fn find_questions(&self, filter: QuestionFilter) -> Result<Vec<Question>> {
        let tables = self.tables.read().await;
        Ok(tables
            .questions
            .values()
            .filter(|q| filter.matches(q) && tables.correct_count(q.id, None) == 1)
            .cloned()
            .collect())
    }

    async fn get_question(&self, question_id: i64) -> Result<Option<Question>> {
        let tables = self.tables.read().await;
        Ok(tables.questions.get(&question_id).cloned())
    }

    async fn answers_for_questions(&self, question_ids: &[i64]) -> Result<Vec<Answer>> {
        let tables = self.tables.read().await;
        Ok(tables
            .answers
            .values()
            .filter(|a| question_ids.contains(&a.question_id))
            .cloned()
            .collect())
    }

    async fn answer_keys(&self, question_ids: &[i64]) -> Result<Vec<AnswerKey>> {
        let tables = self.tables.read().await;
        let mut keys = Vec::new();
        for question in tables
            .questions
            .values()
            .filter(|q| question_ids.contains(&q.id))
        {
            let answer_ids: Vec<i64> = tables.answers_of(question.id).map(|a| a.id).collect();
            for correct in tables.answers_of(question.id).filter(|a| a.is_correct) {
                keys.push(AnswerKey {
                    question_id: question.id,
                    correct_answer_id: correct.id,
                    explanation: question.explanation.clone(),
                    answer_ids: answer_ids.clone(),
                });
            }
        }
        Ok(keys)
    }
}

#[async_trait]
impl ResponseLedger for MemoryStore {
    async fn record_submission(
        &self,
        user_id: i64,
        responses: &[NewUserResponse],
        score_delta: i64,
    ) -> Result<User> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&user_id) {
            return Err(Error::NotFound(format!("User {} not found", user_id)));
        }
        if let Some(missing) = responses
            .iter()
            .find(|r| !tables.questions.contains_key(&r.question_id))
        {
            return Err(Error::Conflict(format!(
                "Question {} does not exist",
                missing.question_id
            )));
        }

        let now = Utc::now();
        for response in responses {
            let id = tables.next_id();
            tables.responses.push(UserResponse {
                id,
                user_id,
                question_id: response.question_id,
                answer_id: response.answer_id,
                is_correct: response.is_correct,
                created_at: now,
            });
        }

        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| Error::NotFound(format!("User {} not found", user_id)))?;
        user.total_score += score_delta;
        user.games_played += 1;
        user.updated_at = now;
        Ok(user.clone())
    }

    async fn response_tallies(&self, user_id: i64) -> Result<Vec<ResponseTally>> {
        let tables = self.tables.read().await;
        let mut grouped: HashMap<(String, crate::models::question::Difficulty), (i64, i64)> =
            HashMap::new();
        for response in tables.responses.iter().filter(|r| r.user_id == user_id) {
            let Some(question) = tables.questions.get(&response.question_id) else {
                continue;
            };
            let entry = grouped
                .entry((question.category_name.clone(), question.difficulty))
                .or_default();
            entry.0 += 1;
            if response.is_correct {
                entry.1 += 1;
            }
        }
        Ok(grouped
            .into_iter()
            .map(|((category, difficulty), (total, correct))| ResponseTally {
                category,
                difficulty,
                total,
                correct,
            })
            .collect())
    }

    async fn recent_responses(&self, user_id: i64, limit: i64) -> Result<Vec<UserResponse>> {
        let tables = self.tables.read().await;
        Ok(tables
            .responses
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.name_taken(&user.username, &user.email, None) {
            return Err(Error::Conflict(
                "Username or email is already registered".to_string(),
            ));
        }
        let now = Utc::now();
        let created = User {
            id: tables.next_id(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            is_active: true,
            is_admin: false,
            total_score: 0,
            games_played: 0,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_user(&self, user_id: i64) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&user_id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn update_profile(&self, user_id: i64, update: ProfileUpdate) -> Result<User> {
        let mut tables = self.tables.write().await;
        let current = tables
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("User {} not found", user_id)))?;

        let username = update.username.unwrap_or(current.username);
        let email = update.email.unwrap_or(current.email);
        if tables.name_taken(&username, &email, Some(user_id)) {
            return Err(Error::Conflict(
                "Username or email is already registered".to_string(),
            ));
        }

        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| Error::NotFound(format!("User {} not found", user_id)))?;
        user.username = username;
        user.email = email;
        if let Some(hash) = update.password_hash {
            user.password_hash = hash;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn set_admin(&self, user_id: i64, is_admin: bool) -> Result<()> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| Error::NotFound(format!("User {} not found", user_id)))?;
        user.is_admin = is_admin;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn leaderboard(&self, limit: i64) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        let mut ranked: Vec<User> = tables
            .users
            .values()
            .filter(|u| u.games_played > 0)
            .cloned()
            .collect();
        ranked.sort_by(leaderboard_order);
        ranked.truncate(limit.max(0) as usize);
        Ok(ranked)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn create_category(&self, name: &str) -> Result<Category> {
        let mut tables = self.tables.write().await;
        if tables.categories.values().any(|c| c.name == name) {
            return Err(Error::Conflict(format!("Category '{}' already exists", name)));
        }
        let category = Category {
            id: tables.next_id(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn create_question(&self, question: NewQuestion) -> Result<QuestionWithAnswers> {
        let mut tables = self.tables.write().await;
        let category_name = tables
            .categories
            .get(&question.category_id)
            .map(|c| c.name.clone())
            .ok_or_else(|| {
                Error::NotFound(format!("Category {} not found", question.category_id))
            })?;
        if question.answers.iter().filter(|a| a.is_correct).count() > 1 {
            return Err(Error::Conflict(
                "Question already has a correct answer".to_string(),
            ));
        }

        let now = Utc::now();
        let created = Question {
            id: tables.next_id(),
            text: question.text,
            difficulty: question.difficulty,
            explanation: question.explanation,
            category_id: question.category_id,
            category_name,
            created_at: now,
        };
        tables.questions.insert(created.id, created.clone());

        let mut answers = Vec::with_capacity(question.answers.len());
        for answer in question.answers {
            let row = Answer {
                id: tables.next_id(),
                question_id: created.id,
                text: answer.text,
                is_correct: answer.is_correct,
                created_at: now,
            };
            tables.answers.insert(row.id, row.clone());
            answers.push(row);
        }

        Ok(QuestionWithAnswers {
            question: created,
            answers,
        })
    }

    async fn delete_question(&self, question_id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.responses.iter().any(|r| r.question_id == question_id) {
            return Err(Error::Conflict(
                "Question has recorded responses and cannot be deleted".to_string(),
            ));
        }
        let removed = tables.questions.remove(&question_id).is_some();
        tables.answers.retain(|_, a| a.question_id != question_id);
        Ok(removed)
    }

    async fn create_answer(&self, question_id: i64, answer: NewAnswer) -> Result<Answer> {
        let mut tables = self.tables.write().await;
        if !tables.questions.contains_key(&question_id) {
            return Err(Error::NotFound(format!("Question {} not found", question_id)));
        }
        if answer.is_correct && tables.correct_count(question_id, None) > 0 {
            return Err(Error::Conflict(
                "Question already has a correct answer".to_string(),
            ));
        }
        let row = Answer {
            id: tables.next_id(),
            question_id,
            text: answer.text,
            is_correct: answer.is_correct,
            created_at: Utc::now(),
        };
        tables.answers.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_answer(&self, answer_id: i64, update: AnswerUpdate) -> Result<Answer> {
        let mut tables = self.tables.write().await;
        let question_id = tables
            .answers
            .get(&answer_id)
            .map(|a| a.question_id)
            .ok_or_else(|| Error::NotFound(format!("Answer {} not found", answer_id)))?;
        if update.is_correct == Some(true) && tables.correct_count(question_id, Some(answer_id)) > 0
        {
            return Err(Error::Conflict(
                "Question already has a correct answer".to_string(),
            ));
        }

        let answer = tables
            .answers
            .get_mut(&answer_id)
            .ok_or_else(|| Error::NotFound(format!("Answer {} not found", answer_id)))?;
        if let Some(text) = update.text {
            answer.text = text;
        }
        if let Some(is_correct) = update.is_correct {
            answer.is_correct = is_correct;
        }
        Ok(answer.clone())
    }

    async fn delete_answer(&self, answer_id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables
            .responses
            .iter()
            .any(|r| r.answer_id == Some(answer_id))
        {
            return Err(Error::Conflict(
                "Answer has recorded responses and cannot be deleted".to_string(),
            ));
        }
        Ok(tables.answers.remove(&answer_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Difficulty;
    use tokio_test::{assert_err, assert_ok};

    async fn seeded() -> (MemoryStore, QuestionWithAnswers, User) {
        let store = MemoryStore::new();
        let category = store.create_category("Python").await.unwrap();
        let question = store
            .create_question(NewQuestion {
                text: "What does len([]) return?".into(),
                difficulty: Difficulty::Easy,
                explanation: Some("An empty list has length zero.".into()),
                category_id: category.id,
                answers: vec![
                    NewAnswer { text: "0".into(), is_correct: true },
                    NewAnswer { text: "None".into(), is_correct: false },
                ],
            })
            .await
            .unwrap();
        let user = store
            .create_user(NewUser {
                username: "ada".into(),
                email: "ada@example.com".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        (store, question, user)
    }

    #[tokio::test]
    async fn second_correct_answer_is_rejected() {
        let (store, question, _) = seeded().await;
        let err = store
            .create_answer(
                question.question.id,
                NewAnswer { text: "zero".into(), is_correct: true },
            )
            .await;
        assert!(matches!(err, Err(Error::Conflict(_))));

        let wrong = question.answers.iter().find(|a| !a.is_correct).unwrap();
        let err = store
            .update_answer(
                wrong.id,
                AnswerUpdate { text: None, is_correct: Some(true) },
            )
            .await;
        assert!(matches!(err, Err(Error::Conflict(_))));

        // Re-flagging the existing correct answer is not a second one.
        let right = question.answers.iter().find(|a| a.is_correct).unwrap();
        assert_ok!(
            store
                .update_answer(
                    right.id,
                    AnswerUpdate { text: Some("zero".into()), is_correct: Some(true) },
                )
                .await
        );
    }

    #[tokio::test]
    async fn questions_without_a_correct_answer_are_not_playable() {
        let (store, question, _) = seeded().await;
        let right = question.answers.iter().find(|a| a.is_correct).unwrap();
        assert_ok!(
            store
                .update_answer(right.id, AnswerUpdate { text: None, is_correct: Some(false) })
                .await
        );
        let playable = store.find_questions(QuestionFilter::default()).await.unwrap();
        assert!(playable.is_empty());
    }

    #[tokio::test]
    async fn unknown_user_submission_persists_nothing() {
        let (store, question, _) = seeded().await;
        let responses = vec![NewUserResponse {
            question_id: question.question.id,
            answer_id: Some(question.answers[0].id),
            is_correct: true,
        }];
        assert_err!(store.record_submission(9_999, &responses, 1).await);
        assert_eq!(store.response_count(9_999).await, 0);
    }

    #[tokio::test]
    async fn submission_updates_counters_and_ledger_together() {
        let (store, question, user) = seeded().await;
        let responses = vec![NewUserResponse {
            question_id: question.question.id,
            answer_id: Some(question.answers[0].id),
            is_correct: true,
        }];
        let updated = store.record_submission(user.id, &responses, 1).await.unwrap();
        assert_eq!(updated.total_score, 1);
        assert_eq!(updated.games_played, 1);
        assert_eq!(store.response_count(user.id).await, 1);

        let err = store.delete_question(question.question.id).await;
        assert!(matches!(err, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn duplicate_usernames_conflict() {
        let (store, _, _) = seeded().await;
        let err = store
            .create_user(NewUser {
                username: "ada".into(),
                email: "other@example.com".into(),
                password_hash: "hash".into(),
            })
            .await;
        assert!(matches!(err, Err(Error::Conflict(_))));
    }
}
