use chrono::{DateTime, Utc};
use sqlx::{query, query_as};

use crate::db::{CompetitionId, CompetitionStatus, User, UserId};
use crate::error::{AppError, AppResult};
use crate::traits::Linkable;
use crate::AppState;

id_struct!(EntryId, Entry);
impl Linkable for EntryId {
    fn relative_url(&self) -> String {
        format!("/entry?id={}", self.0)
    }
}

/// A photograph. `competition_id` is `None` for "extra" photos that are not
/// competing anywhere.
#[derive(sqlx::FromRow, serde::Serialize, Debug, Clone)]
pub struct Entry {
    pub id: EntryId,
    pub user_id: UserId,
    pub competition_id: Option<CompetitionId>,
    pub title: String,
    pub blob_key: String,
    pub upload_date: DateTime<Utc>,
    /// Final rank; 0 until the competition completes.
    pub position: i64,
    /// Sum of peer scores; 0 until the competition completes.
    pub total_score: i64,
}

impl Entry {
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "Untitled"
        } else {
            &self.title
        }
    }

    pub fn image_url(&self) -> String {
        crate::blob::serving_url(&self.blob_key, 800)
    }

    pub fn thumb_url(&self) -> String {
        crate::blob::serving_url(&self.blob_key, 211)
    }
}

impl Linkable for Entry {
    fn relative_url(&self) -> String {
        self.id.relative_url()
    }
}

/// View of an entry together with its owner's username.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct FullEntry {
    #[sqlx(flatten)]
    pub entry: Entry,
    pub username: String,
}

impl FullEntry {
    /// Fields handed to page templates.
    pub fn to_template_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.entry.id,
            "title": self.entry.display_title(),
            "username": self.username,
            "url": self.entry.image_url(),
            "thumb": self.entry.thumb_url(),
            "upload_date": self.entry.upload_date.format("%d %B, %Y").to_string(),
            "position": self.entry.position,
            "position_ordinal": crate::util::ordinal(self.entry.position),
            "total_score": self.entry.total_score,
        })
    }
}

impl AppState {
    /// Submits a photo into a competition, recording the user's
    /// participation alongside it.
    ///
    /// Only valid while the competition is `Open`, and each user gets one
    /// entry per competition.
    pub async fn submit_entry(
        &self,
        user: &User,
        competition_id: CompetitionId,
        title: &str,
        blob_key: &str,
    ) -> AppResult<Entry> {
        let competition = self
            .get_competition(competition_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if competition.status != CompetitionStatus::Open {
            return Err(AppError::Validation(format!(
                "'{}' is no longer open for entries.",
                competition.title
            )));
        }
        if self.user_entry(user.id, competition_id).await?.is_some() {
            return Err(AppError::Conflict(
                "You have already entered this competition.".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let entry: Entry = query_as(
            "INSERT INTO Entry (user_id, competition_id, title, blob_key, upload_date)
             VALUES (?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(user.id)
        .bind(competition_id)
        .bind(title.trim())
        .bind(blob_key)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;
        super::participant::record_participant(&mut *tx, user.id, competition_id).await?;
        tx.commit().await?;

        self.cache.invalidate(crate::cache::keys::COMPETITION_LIST);
        self.cache
            .invalidate(&crate::cache::keys::competition(competition_id));
        tracing::info!(entry = %entry.id, user = %user.id, %competition_id, "new entry");
        Ok(entry)
    }

    pub async fn get_entry(&self, id: EntryId) -> sqlx::Result<Option<FullEntry>> {
        query_as(
            "SELECT Entry.*, UserAccount.username
             FROM Entry JOIN UserAccount ON Entry.user_id = UserAccount.id
             WHERE Entry.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Returns a competition's entries, best-scored first (upload order
    /// until the competition completes).
    pub async fn competition_entries(
        &self,
        competition_id: CompetitionId,
    ) -> sqlx::Result<Vec<FullEntry>> {
        query_as(
            "SELECT Entry.*, UserAccount.username
             FROM Entry JOIN UserAccount ON Entry.user_id = UserAccount.id
             WHERE Entry.competition_id = ?
             ORDER BY Entry.total_score DESC, Entry.upload_date ASC",
        )
        .bind(competition_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Returns the entry a user submitted to a competition, if any.
    pub async fn user_entry(
        &self,
        user_id: UserId,
        competition_id: CompetitionId,
    ) -> sqlx::Result<Option<Entry>> {
        query_as("SELECT * FROM Entry WHERE user_id = ? AND competition_id = ?")
            .bind(user_id)
            .bind(competition_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Returns the ids of every competition a user has entered.
    pub async fn entered_competition_ids(
        &self,
        user_id: UserId,
    ) -> sqlx::Result<Vec<CompetitionId>> {
        let rows: Vec<(CompetitionId,)> = query_as(
            "SELECT competition_id FROM Entry
             WHERE user_id = ? AND competition_id IS NOT NULL",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Deletes an entry. The owner or an admin may delete it, but only while
    /// the competition is still open: once scoring starts, the given scores
    /// back everyone else's totals, and completed results never change.
    /// Admin cleanup of a closed competition goes through
    /// [`Self::delete_competition`]. Extra photos can be deleted at any time.
    ///
    /// Takes the participation record, any scores against the entry and the
    /// stored blob with it.
    pub async fn delete_entry(&self, acting_user: &User, id: EntryId) -> AppResult {
        let full = self.get_entry(id).await?.ok_or(AppError::NotFound)?;
        let entry = &full.entry;

        if entry.user_id != acting_user.id && !acting_user.admin {
            return Err(AppError::NotAdmin);
        }
        if let Some(competition_id) = entry.competition_id {
            let competition = self
                .get_competition(competition_id)
                .await?
                .ok_or(AppError::NotFound)?;
            if competition.status != CompetitionStatus::Open {
                return Err(AppError::Validation(
                    "Entries can only be withdrawn while the competition is open.".to_string(),
                ));
            }
        }

        let mut tx = self.pool.begin().await?;
        query("DELETE FROM Score WHERE entry_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if let Some(competition_id) = entry.competition_id {
            query("DELETE FROM Participant WHERE user_id = ? AND competition_id = ?")
                .bind(entry.user_id)
                .bind(competition_id)
                .execute(&mut *tx)
                .await?;
        }
        query("DELETE FROM Entry WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        crate::blob::delete(&entry.blob_key).await;
        self.cache.invalidate(crate::cache::keys::COMPETITION_LIST);
        if let Some(competition_id) = entry.competition_id {
            self.cache
                .invalidate(&crate::cache::keys::competition(competition_id));
        }
        tracing::info!(entry = %id, by = %acting_user.id, "deleted entry");
        Ok(())
    }
}
