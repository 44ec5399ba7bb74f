use sqlx::{query, query_as};

use crate::db::{CompetitionId, UserId};
use crate::error::{AppError, AppResult};
use crate::AppState;

id_struct!(ParticipantId, Participant);

/// Bookkeeping row linking a user to a competition they entered, tracking
/// whether they have met their peer-scoring obligation.
///
/// One record exists per (user, competition) pair with an entry; it is
/// created alongside the entry, and `submitted_scores` flips to true exactly
/// once.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Participant {
    #[allow(unused)]
    pub id: ParticipantId,
    pub user_id: UserId,
    pub competition_id: CompetitionId,
    pub submitted_scores: bool,
}

/// Inserts a participation record unless one already exists for the pair.
pub(super) async fn record_participant<'e, E: sqlx::SqliteExecutor<'e>>(
    executor: E,
    user_id: UserId,
    competition_id: CompetitionId,
) -> sqlx::Result<()> {
    query(
        "INSERT INTO Participant (user_id, competition_id) VALUES (?, ?)
         ON CONFLICT (user_id, competition_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(competition_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Returns each participant's `submitted_scores` flag for a competition.
pub(super) async fn submitted_flags<'e, E: sqlx::SqliteExecutor<'e>>(
    executor: E,
    competition_id: CompetitionId,
) -> sqlx::Result<Vec<bool>> {
    let flags: Vec<(bool,)> =
        query_as("SELECT submitted_scores FROM Participant WHERE competition_id = ?")
            .bind(competition_id)
            .fetch_all(executor)
            .await?;
    Ok(flags.into_iter().map(|(submitted,)| submitted).collect())
}

/// Flips `submitted_scores` to true, returning how many records matched.
pub(super) async fn mark_participant_scored<'e, E: sqlx::SqliteExecutor<'e>>(
    executor: E,
    user_id: UserId,
    competition_id: CompetitionId,
) -> sqlx::Result<u64> {
    Ok(query(
        "UPDATE Participant SET submitted_scores = TRUE
         WHERE user_id = ? AND competition_id = ?",
    )
    .bind(user_id)
    .bind(competition_id)
    .execute(executor)
    .await?
    .rows_affected())
}

impl AppState {
    /// Records that a user has entered a competition. Idempotent: calling it
    /// again for the same pair leaves the single existing record alone.
    pub async fn record_entry(
        &self,
        user_id: UserId,
        competition_id: CompetitionId,
    ) -> AppResult {
        record_participant(&self.pool, user_id, competition_id).await?;
        Ok(())
    }

    /// Marks a participant's scores as submitted. A user without an entry has
    /// no participation record and cannot submit scores.
    pub async fn mark_scores_submitted(
        &self,
        user_id: UserId,
        competition_id: CompetitionId,
    ) -> AppResult {
        if mark_participant_scored(&self.pool, user_id, competition_id).await? == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Whether every participant has submitted their scores. Vacuously true
    /// when the competition has no participants.
    pub async fn all_scores_submitted(&self, competition_id: CompetitionId) -> AppResult<bool> {
        let flags = submitted_flags(&self.pool, competition_id).await?;
        Ok(flags.into_iter().all(|submitted| submitted))
    }

    pub async fn get_participant(
        &self,
        user_id: UserId,
        competition_id: CompetitionId,
    ) -> sqlx::Result<Option<Participant>> {
        query_as("SELECT * FROM Participant WHERE user_id = ? AND competition_id = ?")
            .bind(user_id)
            .bind(competition_id)
            .fetch_optional(&self.pool)
            .await
    }
}
