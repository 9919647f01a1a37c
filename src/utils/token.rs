use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_PLAYER: &str = "player";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64> {
        self.sub
            .parse()
            .map_err(|_| Error::Unauthorized("Token subject is not a user id".to_string()))
    }

    pub fn is_admin(&self) -> bool {
        self.role
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case(ROLE_ADMIN))
    }
}

pub fn issue_access_token(
    user_id: i64,
    role: &str,
    secret: &str,
    ttl_minutes: i64,
) -> Result<String> {
    let exp = (Utc::now() + Duration::minutes(ttl_minutes)).timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: exp.max(0) as usize,
        role: Some(role.to_string()),
    };
    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

pub fn decode_access_token(token: &str, secret: &str) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}
