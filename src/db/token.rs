use chrono::{DateTime, TimeDelta, Utc};
use sqlx::query_as;

use crate::db::{User, UserId};
use crate::{AppResult, AppState};

/// How long a token is valid for.
const TOKEN_DURATION: TimeDelta = TimeDelta::days(365);
/// Total numbers of characters in a token.
///
/// These must be unique and cryptographically secure because we don't check
/// for overlaps.
const TOKEN_LEN: usize = 64;

id_struct!(TokenId, Token);
/// Token for staying logged in.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Token {
    #[allow(unused)]
    pub id: TokenId, // stored in DB; never actually read by Rust code
    pub user_id: UserId,
    pub string: String,
    pub expiry: DateTime<Utc>,
}

impl Token {
    /// Returns whether the token has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expiry
    }
}

#[derive(Debug)]
pub enum TokenStatus {
    /// No token cookie was sent.
    None,
    /// The token does not match any session.
    Unknown,
    Expired,
    Valid(User),
}

impl AppState {
    /// Returns the status of a token, including the user the token belongs to
    /// if it is valid.
    pub async fn token_status(&self, string: Option<&str>) -> sqlx::Result<TokenStatus> {
        let Some(string) = string else {
            return Ok(TokenStatus::None);
        };

        let token: Option<Token> = query_as("SELECT * FROM Token WHERE string = ?")
            .bind(string)
            .fetch_optional(&self.pool)
            .await?;

        let Some(token) = token else {
            return Ok(TokenStatus::Unknown);
        };

        if token.is_expired() {
            return Ok(TokenStatus::Expired);
        }

        let Some(user) = self.get_user(token.user_id).await? else {
            return Ok(TokenStatus::Unknown);
        };

        Ok(TokenStatus::Valid(user))
    }

    /// Creates a fresh session token for a user.
    pub async fn create_token(&self, user_id: UserId) -> AppResult<Token> {
        let string = crate::util::random_b64_string(TOKEN_LEN);
        let expiry = Utc::now() + TOKEN_DURATION;
        Ok(
            query_as("INSERT INTO Token (user_id, string, expiry) VALUES (?, ?, ?) RETURNING *")
                .bind(user_id)
                .bind(string)
                .bind(expiry)
                .fetch_one(&self.pool)
                .await?,
        )
    }
}
