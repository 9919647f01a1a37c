use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    /// When unset the service runs on the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub access_token_expire_minutes: i64,
    pub max_quiz_questions: usize,
    pub max_leaderboard_limit: i64,
    /// Bootstrap admin account, created or promoted at startup when both
    /// username and password are set.
    pub admin_username: Option<String>,
    pub admin_email: String,
    pub admin_password: Option<String>,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env_opt("DATABASE_URL"),
            db_max_connections: get_env_parse_or("DB_MAX_CONNECTIONS", 20)?,
            jwt_secret: get_env("JWT_SECRET")?,
            access_token_expire_minutes: get_env_parse_or("ACCESS_TOKEN_EXPIRE_MINUTES", 30)?,
            max_quiz_questions: get_env_parse_or("MAX_QUIZ_QUESTIONS", 50)?,
            max_leaderboard_limit: get_env_parse_or("MAX_LEADERBOARD_LIMIT", 100)?,
            admin_username: get_env_opt("ADMIN_USERNAME"),
            admin_email: get_env_opt("ADMIN_EMAIL").unwrap_or_else(|| "admin@quiz.local".to_string()),
            admin_password: get_env_opt("ADMIN_PASSWORD"),
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
