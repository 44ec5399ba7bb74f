use sqlx::query_as;

use crate::AppState;

id_struct!(UserId, User);
#[derive(sqlx::FromRow, serde::Serialize, Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub admin: bool,
    pub bio: String,
}

impl User {
    /// Fields exposed to every page's header.
    pub fn to_header_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "username": self.username,
            "admin": self.admin,
        })
    }
}

impl AppState {
    pub async fn get_user(&self, id: UserId) -> sqlx::Result<Option<User>> {
        query_as("SELECT * FROM UserAccount WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_user_from_username(&self, username: &str) -> sqlx::Result<Option<User>> {
        query_as("SELECT * FROM UserAccount WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        admin: bool,
    ) -> sqlx::Result<User> {
        query_as(
            "INSERT INTO UserAccount (username, email, admin) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(username)
        .bind(email)
        .bind(admin)
        .fetch_one(&self.pool)
        .await
    }
}
