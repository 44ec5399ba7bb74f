use eyre::{Context, Result};
use sqlx::query;

use crate::AppState;

impl AppState {
    /// Drops every table. The next `migrate` starts from scratch.
    pub async fn reset(&self) -> Result<()> {
        let mut transaction = self.pool.begin().await?;

        for table in [
            "Score",
            "Participant",
            "Entry",
            "Competition",
            "Token",
            "UserAccount",
            "_sqlx_migrations",
        ] {
            query(&format!("DROP TABLE IF EXISTS {table}"))
                .execute(&mut *transaction)
                .await?;
        }

        transaction.commit().await?;
        tracing::info!("database reset");
        Ok(())
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }

    /// Creates a handful of local accounts and prints a session token for
    /// each, so a development instance is usable without any sign-in flow.
    pub async fn seed(&self) -> Result<()> {
        for (username, admin) in [("admin", true), ("alice", false), ("bob", false)] {
            if self
                .get_user_from_username(username)
                .await
                .wrap_err("error looking up seed user")?
                .is_some()
            {
                tracing::info!(username, "seed user already exists, skipping");
                continue;
            }
            let user = self
                .create_user(username, &format!("{username}@example.com"), admin)
                .await
                .wrap_err("error creating seed user")?;
            let token = self
                .create_token(user.id)
                .await
                .map_err(|e| eyre::eyre!(e.message()))?;
            tracing::info!(
                username,
                admin,
                "seeded user; sign in with cookie token={}",
                token.string,
            );
        }
        Ok(())
    }
}
