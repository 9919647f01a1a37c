use axum::async_trait;
use sqlx::PgPool;

use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::category::Category;
use crate::models::question::{AnswerKey, Question, QuestionWithAnswers};
use crate::models::user::User;
use crate::models::user_response::{NewUserResponse, ResponseTally, UserResponse};
use crate::store::{
    AnswerUpdate, CatalogStore, NewAnswer, NewQuestion, NewUser, ProfileUpdate, QuestionFilter,
    QuestionStore, ResponseLedger, UserStore,
};

const QUESTION_SELECT: &str = r#"
    SELECT q.id, q.text, q.difficulty, q.explanation, q.category_id,
           c.name AS category_name, q.created_at
    FROM questions q
    JOIN categories c ON c.id = q.category_id
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn question_by_id<'e, E>(executor: E, question_id: i64) -> Result<Option<Question>>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let sql = format!("{QUESTION_SELECT} WHERE q.id = $1");
        let question = sqlx::query_as::<_, Question>(&sql)
            .bind(question_id)
            .fetch_optional(executor)
            .await?;
        Ok(question)
    }
}

#[async_trait]
impl QuestionStore for PgStore {
    async fn find_questions(&self, filter: QuestionFilter) -> Result<Vec<Question>> {
        let sql = format!(
            r#"{QUESTION_SELECT}
            WHERE ($1::bigint IS NULL OR q.category_id = $1)
              AND ($2::difficulty_level IS NULL OR q.difficulty = $2)
              AND (SELECT COUNT(*) FROM answers a WHERE a.question_id = q.id AND a.is_correct) = 1
            ORDER BY q.id
            "#
        );
        let questions = sqlx::query_as::<_, Question>(&sql)
            .bind(filter.category_id)
            .bind(filter.difficulty)
            .fetch_all(&self.pool)
            .await?;
        Ok(questions)
    }

    async fn get_question(&self, question_id: i64) -> Result<Option<Question>> {
        Self::question_by_id(&self.pool, question_id).await
    }

    async fn answers_for_questions(&self, question_ids: &[i64]) -> Result<Vec<Answer>> {
        let answers = sqlx::query_as::<_, Answer>(
            r#"
            SELECT id, question_id, text, is_correct, created_at
            FROM answers
            WHERE question_id = ANY($1)
            ORDER BY question_id, id
            "#,
        )
        .bind(question_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(answers)
    }

    async fn answer_keys(&self, question_ids: &[i64]) -> Result<Vec<AnswerKey>> {
        let keys = sqlx::query_as::<_, AnswerKey>(
            r#"
            SELECT q.id AS question_id,
                   a.id AS correct_answer_id,
                   q.explanation,
                   ARRAY(SELECT o.id FROM answers o WHERE o.question_id = q.id ORDER BY o.id) AS answer_ids
            FROM questions q
            JOIN answers a ON a.question_id = q.id AND a.is_correct
            WHERE q.id = ANY($1)
            "#,
        )
        .bind(question_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(keys)
    }
}

#[async_trait]
impl ResponseLedger for PgStore {
    async fn record_submission(
        &self,
        user_id: i64,
        responses: &[NewUserResponse],
        score_delta: i64,
    ) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        // Relative update; the row lock also serializes submissions of the same user.
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET total_score = total_score + $1,
                games_played = games_played + 1,
                updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(score_delta)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User {} not found", user_id)))?;

        for response in responses {
            sqlx::query(
                r#"
                INSERT INTO user_responses (user_id, question_id, answer_id, is_correct)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(user_id)
            .bind(response.question_id)
            .bind(response.answer_id)
            .bind(response.is_correct)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(user)
    }

    async fn response_tallies(&self, user_id: i64) -> Result<Vec<ResponseTally>> {
        let tallies = sqlx::query_as::<_, ResponseTally>(
            r#"
            SELECT c.name AS category,
                   q.difficulty,
                   COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE r.is_correct) AS correct
            FROM user_responses r
            JOIN questions q ON q.id = r.question_id
            JOIN categories c ON c.id = q.category_id
            WHERE r.user_id = $1
            GROUP BY c.name, q.difficulty
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tallies)
    }

    async fn recent_responses(&self, user_id: i64, limit: i64) -> Result<Vec<UserResponse>> {
        let rows = sqlx::query_as::<_, UserResponse>(
            r#"
            SELECT id, user_id, question_id, answer_id, is_correct, created_at
            FROM user_responses
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match Error::from(e) {
            Error::Conflict(_) => {
                Error::Conflict("Username or email is already registered".to_string())
            }
            other => other,
        })?;
        Ok(created)
    }

    async fn find_user(&self, user_id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_profile(&self, user_id: i64, update: ProfileUpdate) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = COALESCE($1, username),
                email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash),
                updated_at = NOW()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(update.username)
        .bind(update.email)
        .bind(update.password_hash)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match Error::from(e) {
            Error::Conflict(_) => {
                Error::Conflict("Username or email is already registered".to_string())
            }
            other => other,
        })?;
        user.ok_or_else(|| Error::NotFound(format!("User {} not found", user_id)))
    }

    async fn set_admin(&self, user_id: i64, is_admin: bool) -> Result<()> {
        let result = sqlx::query("UPDATE users SET is_admin = $1, updated_at = NOW() WHERE id = $2")
            .bind(is_admin)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    async fn leaderboard(&self, limit: i64) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE games_played > 0
            ORDER BY total_score DESC, games_played ASC, id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn create_category(&self, name: &str) -> Result<Category> {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match Error::from(e) {
            Error::Conflict(_) => Error::Conflict(format!("Category '{}' already exists", name)),
            other => other,
        })?;
        Ok(category)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn create_question(&self, question: NewQuestion) -> Result<QuestionWithAnswers> {
        let mut tx = self.pool.begin().await?;

        let category_exists: Option<i64> =
            sqlx::query_scalar("SELECT id FROM categories WHERE id = $1")
                .bind(question.category_id)
                .fetch_optional(&mut *tx)
                .await?;
        if category_exists.is_none() {
            return Err(Error::NotFound(format!(
                "Category {} not found",
                question.category_id
            )));
        }

        let question_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO questions (text, difficulty, explanation, category_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&question.text)
        .bind(question.difficulty)
        .bind(&question.explanation)
        .bind(question.category_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut answers = Vec::with_capacity(question.answers.len());
        for answer in &question.answers {
            let created = sqlx::query_as::<_, Answer>(
                r#"
                INSERT INTO answers (question_id, text, is_correct)
                VALUES ($1, $2, $3)
                RETURNING id, question_id, text, is_correct, created_at
                "#,
            )
            .bind(question_id)
            .bind(&answer.text)
            .bind(answer.is_correct)
            .fetch_one(&mut *tx)
            .await?;
            answers.push(created);
        }

        let created = Self::question_by_id(&mut *tx, question_id)
            .await?
            .ok_or_else(|| Error::Internal("Inserted question vanished".to_string()))?;
        tx.commit().await?;

        Ok(QuestionWithAnswers {
            question: created,
            answers,
        })
    }

    async fn delete_question(&self, question_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(question_id)
            .execute(&self.pool)
            .await
            .map_err(|e| match Error::from(e) {
                Error::Conflict(_) => Error::Conflict(
                    "Question has recorded responses and cannot be deleted".to_string(),
                ),
                other => other,
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_answer(&self, question_id: i64, answer: NewAnswer) -> Result<Answer> {
        let mut tx = self.pool.begin().await?;

        lock_question(&mut tx, question_id).await?;
        if answer.is_correct && count_correct(&mut tx, question_id, None).await? > 0 {
            return Err(Error::Conflict(
                "Question already has a correct answer".to_string(),
            ));
        }

        let created = sqlx::query_as::<_, Answer>(
            r#"
            INSERT INTO answers (question_id, text, is_correct)
            VALUES ($1, $2, $3)
            RETURNING id, question_id, text, is_correct, created_at
            "#,
        )
        .bind(question_id)
        .bind(&answer.text)
        .bind(answer.is_correct)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn update_answer(&self, answer_id: i64, update: AnswerUpdate) -> Result<Answer> {
        let mut tx = self.pool.begin().await?;

        let question_id: i64 = sqlx::query_scalar("SELECT question_id FROM answers WHERE id = $1")
            .bind(answer_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Answer {} not found", answer_id)))?;

        lock_question(&mut tx, question_id).await?;
        if update.is_correct == Some(true)
            && count_correct(&mut tx, question_id, Some(answer_id)).await? > 0
        {
            return Err(Error::Conflict(
                "Question already has a correct answer".to_string(),
            ));
        }

        let updated = sqlx::query_as::<_, Answer>(
            r#"
            UPDATE answers
            SET text = COALESCE($1, text),
                is_correct = COALESCE($2, is_correct)
            WHERE id = $3
            RETURNING id, question_id, text, is_correct, created_at
            "#,
        )
        .bind(update.text)
        .bind(update.is_correct)
        .bind(answer_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_answer(&self, answer_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM answers WHERE id = $1")
            .bind(answer_id)
            .execute(&self.pool)
            .await
            .map_err(|e| match Error::from(e) {
                Error::Conflict(_) => Error::Conflict(
                    "Answer has recorded responses and cannot be deleted".to_string(),
                ),
                other => other,
            })?;
        Ok(result.rows_affected() > 0)
    }
}

async fn lock_question(tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, question_id: i64) -> Result<()> {
    let locked: Option<i64> = sqlx::query_scalar("SELECT id FROM questions WHERE id = $1 FOR UPDATE")
        .bind(question_id)
        .fetch_optional(&mut **tx)
        .await?;
    locked
        .map(|_| ())
        .ok_or_else(|| Error::NotFound(format!("Question {} not found", question_id)))
}

async fn count_correct(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    question_id: i64,
    excluding_answer: Option<i64>,
) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM answers
        WHERE question_id = $1
          AND is_correct
          AND ($2::bigint IS NULL OR id <> $2)
        "#,
    )
    .bind(question_id)
    .bind(excluding_answer)
    .fetch_one(&mut **tx)
    .await?;
    Ok(count)
}
