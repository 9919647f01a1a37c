use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::dto::user_dto::{LeaderboardEntry, StatsBucket, UserStats};
use crate::error::{Error, Result};
use crate::models::user::User;
use crate::models::user_response::{ResponseTally, UserResponse};
use crate::store::{ResponseLedger, UserStore};

pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 10;
pub const DEFAULT_HISTORY_LIMIT: i64 = 20;

/// Ranking rule: higher `total_score` first, then fewer `games_played`,
/// then lower user id.
pub fn leaderboard_order(a: &User, b: &User) -> Ordering {
    b.total_score
        .cmp(&a.total_score)
        .then(a.games_played.cmp(&b.games_played))
        .then(a.id.cmp(&b.id))
}

pub fn accuracy(correct: i64, total: i64) -> f64 {
    if total > 0 {
        correct as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Default)]
struct Counter {
    total: i64,
    correct: i64,
}

impl Counter {
    fn add(&mut self, tally: &ResponseTally) {
        self.total += tally.total;
        self.correct += tally.correct;
    }

    fn bucket(&self) -> StatsBucket {
        StatsBucket {
            total: self.total,
            correct: self.correct,
            accuracy: accuracy(self.correct, self.total),
        }
    }
}

/// Folds grouped ledger counts into overall, per-category and per-difficulty
/// figures.
pub fn summarize(user: &User, tallies: &[ResponseTally]) -> UserStats {
    let mut overall = Counter::default();
    let mut by_category: BTreeMap<String, Counter> = BTreeMap::new();
    let mut by_difficulty: BTreeMap<String, Counter> = BTreeMap::new();

    for tally in tallies {
        overall.add(tally);
        by_category
            .entry(tally.category.clone())
            .or_default()
            .add(tally);
        by_difficulty
            .entry(tally.difficulty.label().to_string())
            .or_default()
            .add(tally);
    }

    UserStats {
        total_score: user.total_score,
        games_played: user.games_played,
        total_answers: overall.total,
        correct_answers: overall.correct,
        accuracy: accuracy(overall.correct, overall.total),
        by_category: by_category
            .into_iter()
            .map(|(k, c)| (k, c.bucket()))
            .collect(),
        by_difficulty: by_difficulty
            .into_iter()
            .map(|(k, c)| (k, c.bucket()))
            .collect(),
    }
}

pub fn rank(mut users: Vec<User>, limit: usize) -> Vec<LeaderboardEntry> {
    users.retain(|u| u.games_played > 0);
    users.sort_by(leaderboard_order);
    users
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(idx, u)| LeaderboardEntry {
            rank: idx + 1,
            avg_score: round2(if u.games_played > 0 {
                u.total_score as f64 / u.games_played as f64
            } else {
                0.0
            }),
            username: u.username,
            total_score: u.total_score,
            games_played: u.games_played,
        })
        .collect()
}

#[derive(Clone)]
pub struct StatsService {
    ledger: Arc<dyn ResponseLedger>,
    users: Arc<dyn UserStore>,
    max_leaderboard_limit: i64,
}

impl StatsService {
    pub fn new(
        ledger: Arc<dyn ResponseLedger>,
        users: Arc<dyn UserStore>,
        max_leaderboard_limit: i64,
    ) -> Self {
        Self {
            ledger,
            users,
            max_leaderboard_limit,
        }
    }

    pub async fn user_stats(&self, user_id: i64) -> Result<UserStats> {
        let user = self
            .users
            .find_user(user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User {} not found", user_id)))?;
        let tallies = self.ledger.response_tallies(user_id).await?;
        Ok(summarize(&user, &tallies))
    }

    pub async fn leaderboard(&self, limit: Option<i64>) -> Result<Vec<LeaderboardEntry>> {
        let limit = self.clamp_limit(limit, DEFAULT_LEADERBOARD_LIMIT)?;
        let users = self.users.leaderboard(limit).await?;
        Ok(rank(users, limit as usize))
    }

    pub async fn recent_responses(
        &self,
        user_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<UserResponse>> {
        let limit = self.clamp_limit(limit, DEFAULT_HISTORY_LIMIT)?;
        self.ledger.recent_responses(user_id, limit).await
    }

    /// Non-positive limits are rejected; anything above the configured
    /// maximum is capped to it.
    fn clamp_limit(&self, limit: Option<i64>, default: i64) -> Result<i64> {
        let limit = limit.unwrap_or(default);
        if limit < 1 {
            return Err(Error::BadRequest("limit must be at least 1".to_string()));
        }
        Ok(limit.min(self.max_leaderboard_limit))
    }
}
