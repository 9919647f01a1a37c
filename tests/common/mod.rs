#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use quiz_backend::{config::Config, routes, store::MemoryStore, AppState};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

pub const ADMIN_PASSWORD: &str = "admin-password";

pub fn test_config() -> Config {
    Config {
        server_address: "127.0.0.1:0".to_string(),
        database_url: None,
        db_max_connections: 5,
        jwt_secret: "test_secret_key".to_string(),
        access_token_expire_minutes: 30,
        max_quiz_questions: 50,
        max_leaderboard_limit: 100,
        admin_username: Some("admin".to_string()),
        admin_email: "admin@quiz.local".to_string(),
        admin_password: Some(ADMIN_PASSWORD.to_string()),
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let config = test_config();
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), &config);
        state
            .user_service
            .ensure_admin("admin", &config.admin_email, ADMIN_PASSWORD)
            .await
            .expect("bootstrap admin");
        Self {
            router: routes::router(state.clone()),
            store,
            state,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<JsonValue>,
    ) -> (StatusCode, JsonValue) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        let resp = self.router.clone().oneshot(req).await.expect("response");
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
        let json = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/users/login",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["access_token"].as_str().expect("token").to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login("admin", ADMIN_PASSWORD).await
    }

    /// Registers `username` and returns `(user_id, token)`.
    pub async fn player(&self, username: &str) -> (i64, String) {
        let password = format!("{}-password", username);
        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/users/register",
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": password,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        let id = body["id"].as_i64().expect("user id");
        (id, self.login(username, &password).await)
    }

    pub async fn category(&self, admin: &str, name: &str) -> i64 {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/categories",
                Some(admin),
                Some(json!({ "name": name })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "category failed: {}", body);
        body["id"].as_i64().expect("category id")
    }

    /// Creates a question with four answers, the first one correct. Returns
    /// `(question_id, correct_answer_id, a_wrong_answer_id)`.
    pub async fn question(
        &self,
        admin: &str,
        category_id: i64,
        difficulty: &str,
        text: &str,
    ) -> (i64, i64, i64) {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/questions",
                Some(admin),
                Some(json!({
                    "text": text,
                    "difficulty": difficulty,
                    "explanation": format!("Explanation for {}", text),
                    "category_id": category_id,
                    "answers": [
                        { "text": "right", "is_correct": true },
                        { "text": "wrong 1", "is_correct": false },
                        { "text": "wrong 2", "is_correct": false },
                        { "text": "wrong 3", "is_correct": false },
                    ],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "question failed: {}", body);
        let answers = body["answers"].as_array().expect("answers");
        let correct = answers
            .iter()
            .find(|a| a["is_correct"] == true)
            .and_then(|a| a["id"].as_i64())
            .expect("correct answer");
        let wrong = answers
            .iter()
            .find(|a| a["is_correct"] == false)
            .and_then(|a| a["id"].as_i64())
            .expect("wrong answer");
        (body["id"].as_i64().expect("question id"), correct, wrong)
    }
}
