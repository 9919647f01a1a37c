pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod telemetry;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::services::{
    catalog_service::CatalogService, grading_service::GradingService, quiz_service::QuizService,
    stats_service::StatsService, user_service::UserService,
};
use crate::store::{CatalogStore, QuestionStore, ResponseLedger, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub quiz_service: QuizService,
    pub grading_service: GradingService,
    pub stats_service: StatsService,
    pub user_service: UserService,
    pub catalog_service: CatalogService,
}

impl AppState {
    /// Wires every service to one backing store.
    pub fn new<S>(store: Arc<S>, config: &Config) -> Self
    where
        S: QuestionStore + ResponseLedger + UserStore + CatalogStore + 'static,
    {
        let questions: Arc<dyn QuestionStore> = store.clone();
        let ledger: Arc<dyn ResponseLedger> = store.clone();
        let users: Arc<dyn UserStore> = store.clone();
        let catalog: Arc<dyn CatalogStore> = store;

        Self {
            quiz_service: QuizService::new(questions.clone(), config.max_quiz_questions),
            grading_service: GradingService::new(questions.clone(), ledger.clone()),
            stats_service: StatsService::new(ledger, users.clone(), config.max_leaderboard_limit),
            user_service: UserService::new(
                users,
                config.jwt_secret.clone(),
                config.access_token_expire_minutes,
            ),
            catalog_service: CatalogService::new(catalog, questions),
        }
    }
}
