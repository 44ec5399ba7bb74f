use chrono::NaiveDate;
use sqlx::{query, query_as};

use crate::db::EntryId;
use crate::error::{AppError, AppResult};
use crate::scoring;
use crate::traits::Linkable;
use crate::AppState;

id_struct!(CompetitionId, Competition);
impl Linkable for CompetitionId {
    fn relative_url(&self) -> String {
        format!("/competition?id={}", self.0)
    }
}

/// Lifecycle state of a competition. Transitions only ever move forward.
#[derive(
    sqlx::Type, serde::Serialize, serde::Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash,
)]
#[repr(i32)]
pub enum CompetitionStatus {
    Open = 0,
    Scoring = 1,
    Completed = 2,
}

impl CompetitionStatus {
    pub fn name(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Scoring => "Scoring",
            Self::Completed => "Completed",
        }
    }

    pub fn from_i64(n: i64) -> Option<Self> {
        match n {
            0 => Some(Self::Open),
            1 => Some(Self::Scoring),
            2 => Some(Self::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for CompetitionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A monthly scoring round.
#[derive(sqlx::FromRow, serde::Serialize, Debug, Clone)]
pub struct Competition {
    pub id: CompetitionId,
    pub title: String,
    pub description: String,
    pub year: i32,
    pub month: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: CompetitionStatus,
}

impl Competition {
    pub fn finished(&self) -> bool {
        self.status == CompetitionStatus::Completed
    }

    pub fn month_name(&self) -> &'static str {
        crate::util::month_name(self.month)
    }

    /// Fields handed to page templates.
    pub fn to_template_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "title": self.title,
            "description": self.description,
            "year": self.year,
            "month": self.month,
            "month_name": self.month_name(),
            "status": self.status.name(),
            "finished": self.finished(),
        })
    }
}

impl Linkable for Competition {
    fn relative_url(&self) -> String {
        self.id.relative_url()
    }
}

impl AppState {
    /// Creates a competition in the `Open` state covering one calendar month.
    ///
    /// Rejects a duplicate (title, month, year) with a conflict error; this
    /// is a pre-check, not a storage constraint.
    pub async fn create_competition(
        &self,
        title: &str,
        description: &str,
        month: i32,
        year: i32,
    ) -> AppResult<Competition> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::Validation(
                "You forgot to give this competition a title.".to_string(),
            ));
        }
        if !(1..=12).contains(&month) {
            return Err(AppError::Validation(format!("{month} is not a month")));
        }

        if let Some(existing) = self
            .get_competition_by_title_date(title, month, year)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "A competition '{}' already exists for {}, {year}",
                existing.title,
                crate::util::month_name(month),
            )));
        }

        let start = NaiveDate::from_ymd_opt(year, month as u32, 1)
            .ok_or_else(|| AppError::Validation(format!("no such month: {year}-{month}")))?;
        let end = crate::util::last_day_of_month(year, month as u32);

        let competition: Competition = query_as(
            "INSERT INTO Competition (title, description, year, month, start_date, end_date, status)
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(title)
        .bind(description)
        .bind(year)
        .bind(month)
        .bind(start)
        .bind(end)
        .bind(CompetitionStatus::Open)
        .fetch_one(&self.pool)
        .await?;

        self.cache.invalidate(crate::cache::keys::COMPETITION_LIST);
        tracing::info!(id = %competition.id, title, "created competition");
        Ok(competition)
    }

    pub async fn get_competition(&self, id: CompetitionId) -> sqlx::Result<Option<Competition>> {
        query_as("SELECT * FROM Competition WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_competition_by_title_date(
        &self,
        title: &str,
        month: i32,
        year: i32,
    ) -> sqlx::Result<Option<Competition>> {
        query_as("SELECT * FROM Competition WHERE title = ? AND month = ? AND year = ?")
            .bind(title)
            .bind(month)
            .bind(year)
            .fetch_optional(&self.pool)
            .await
    }

    /// Returns all competitions, newest first.
    pub async fn all_competitions(&self) -> sqlx::Result<Vec<Competition>> {
        query_as("SELECT * FROM Competition ORDER BY start_date DESC, id DESC")
            .fetch_all(&self.pool)
            .await
    }

    /// Returns the newest competition, if any exist.
    pub async fn latest_competition(&self) -> sqlx::Result<Option<Competition>> {
        query_as("SELECT * FROM Competition ORDER BY start_date DESC, id DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await
    }

    /// Applies an administrator's update to a competition: title and
    /// description edits plus the requested status transition.
    ///
    /// Legal transitions are `Open -> Scoring` and `Scoring -> Completed`;
    /// requesting the current status edits title/description only. Completion
    /// requires every participant to have submitted their scores, and is the
    /// single point where the scoring engine runs and entry positions are
    /// written. Everything happens in one transaction; a rejected update
    /// leaves no partial writes.
    pub async fn update_competition(
        &self,
        id: CompetitionId,
        new_title: &str,
        new_description: &str,
        new_status: CompetitionStatus,
    ) -> AppResult {
        use CompetitionStatus::*;

        let new_title = new_title.trim();
        if new_title.is_empty() {
            return Err(AppError::Validation(
                "You forgot to give this competition a title.".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let competition: Competition = query_as("SELECT * FROM Competition WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound)?;

        match (competition.status, new_status) {
            (Open, Completed) => {
                return Err(AppError::IllegalTransition(
                    "Cannot complete an open competition - it must enter scoring first."
                        .to_string(),
                ));
            }
            (Scoring, Open) => {
                return Err(AppError::IllegalTransition(
                    "Cannot re-open a competition once scoring has started.".to_string(),
                ));
            }
            (Completed, Open | Scoring) => {
                return Err(AppError::IllegalTransition(
                    "Competition has been completed - cannot change status.".to_string(),
                ));
            }
            (Open, Open) | (Open, Scoring) | (Scoring, Scoring) | (Completed, Completed) => {
                query("UPDATE Competition SET title = ?, description = ?, status = ? WHERE id = ?")
                    .bind(new_title)
                    .bind(new_description)
                    .bind(new_status)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
            (Scoring, Completed) => {
                let participants =
                    super::participant::submitted_flags(&mut *tx, id).await?;
                if !participants.iter().all(|&submitted| submitted) {
                    return Err(AppError::NotReady(
                        "Cannot complete competition - not all competitors have submitted scores."
                            .to_string(),
                    ));
                }
                if participants.is_empty() {
                    tracing::warn!(%id, "completing a competition with no participants");
                }

                let results = compute_competition_results(&mut tx, id).await?;
                for result in &results {
                    query("UPDATE Entry SET total_score = ?, position = ? WHERE id = ?")
                        .bind(result.total_score)
                        .bind(result.position)
                        .bind(result.entry_id)
                        .execute(&mut *tx)
                        .await?;
                }

                // Optimistic check: a concurrent completion attempt that won
                // the race has already moved the status off Scoring.
                let updated = query(
                    "UPDATE Competition SET title = ?, description = ?, status = ?
                     WHERE id = ? AND status = ?",
                )
                .bind(new_title)
                .bind(new_description)
                .bind(Completed)
                .bind(id)
                .bind(Scoring)
                .execute(&mut *tx)
                .await?
                .rows_affected();
                if updated != 1 {
                    return Err(AppError::Conflict(
                        "The competition changed while completing it - please retry.".to_string(),
                    ));
                }
            }
        }

        tx.commit().await?;

        self.cache.invalidate(crate::cache::keys::COMPETITION_LIST);
        self.cache.invalidate(&crate::cache::keys::competition(id));

        if competition.status == Scoring && new_status == Completed {
            tracing::info!(%id, "competition completed; results stored");
            self.notify_results(id).await;
        }
        Ok(())
    }

    /// Deletes a competition and everything hanging off it: participation
    /// records, entries, scores and stored photo blobs.
    pub async fn delete_competition(&self, id: CompetitionId) -> AppResult {
        let mut tx = self.pool.begin().await?;

        if query("SELECT id FROM Competition WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound);
        }

        let blob_keys: Vec<(String,)> =
            query_as("SELECT blob_key FROM Entry WHERE competition_id = ?")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        query(
            "DELETE FROM Score WHERE entry_id IN
                (SELECT id FROM Entry WHERE competition_id = ?)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        query("DELETE FROM Participant WHERE competition_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        query("DELETE FROM Entry WHERE competition_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        query("DELETE FROM Competition WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        for (key,) in blob_keys {
            crate::blob::delete(&key).await;
        }
        self.cache.invalidate(crate::cache::keys::COMPETITION_LIST);
        self.cache.invalidate(&crate::cache::keys::competition(id));
        tracing::info!(%id, "deleted competition");
        Ok(())
    }

    /// Emails each participant their result. Failures are logged, never
    /// surfaced; the transition has already committed.
    async fn notify_results(&self, id: CompetitionId) {
        let recipients: Result<Vec<(String, String, i64, i64)>, _> = query_as(
            "SELECT UserAccount.email, UserAccount.username, Entry.position, Entry.total_score
             FROM Entry JOIN UserAccount ON Entry.user_id = UserAccount.id
             WHERE Entry.competition_id = ?",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await;
        let competition = self.get_competition(id).await;

        match (recipients, competition) {
            (Ok(recipients), Ok(Some(competition))) => {
                crate::email::send_results_notifications(&competition, recipients);
            }
            (Err(err), _) | (_, Err(err)) => {
                tracing::warn!(%id, %err, "failed to gather result notification recipients");
            }
            (_, Ok(None)) => {}
        }
    }
}

/// Runs the scoring engine over a competition's entries and scores.
async fn compute_competition_results(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    id: CompetitionId,
) -> AppResult<Vec<scoring::EntryResult>> {
    let entries: Vec<(EntryId,)> = query_as("SELECT id FROM Entry WHERE competition_id = ?")
        .bind(id)
        .fetch_all(&mut **tx)
        .await?;
    let entries: Vec<EntryId> = entries.into_iter().map(|(id,)| id).collect();

    let scores: Vec<(EntryId, i64)> = query_as(
        "SELECT Score.entry_id, Score.value
         FROM Score JOIN Entry ON Score.entry_id = Entry.id
         WHERE Entry.competition_id = ?",
    )
    .bind(id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(scoring::compute_results(&entries, &scores))
}

#[cfg(test)]
mod tests {
    use sqlx::SqlitePool;

    use super::*;
    use crate::db::test_fixtures::*;

    #[sqlx::test]
    async fn create_rejects_blank_title_and_bad_month(pool: SqlitePool) -> AppResult {
        let state = test_state(pool);
        assert!(matches!(
            state.create_competition("   ", "", 5, 2013).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            state.create_competition("May", "", 13, 2013).await,
            Err(AppError::Validation(_))
        ));
        Ok(())
    }

    #[sqlx::test]
    async fn create_rejects_duplicate_title_month_year(pool: SqlitePool) -> AppResult {
        let state = test_state(pool);
        state.create_competition("May", "", 5, 2013).await?;
        assert!(matches!(
            state.create_competition("May", "different text", 5, 2013).await,
            Err(AppError::Conflict(_))
        ));
        // same title in a different month is fine
        state.create_competition("May", "", 6, 2013).await?;
        Ok(())
    }

    #[sqlx::test]
    async fn competition_covers_the_calendar_month(pool: SqlitePool) -> AppResult {
        let state = test_state(pool);
        let competition = state.create_competition("Feb", "", 2, 2013).await?;
        assert_eq!(competition.start_date.to_string(), "2013-02-01");
        assert_eq!(competition.end_date.to_string(), "2013-02-28");
        assert_eq!(competition.status, CompetitionStatus::Open);
        Ok(())
    }

    #[sqlx::test]
    async fn status_only_moves_forward(pool: SqlitePool) -> AppResult {
        let state = test_state(pool);
        let competition = state.create_competition("May", "", 5, 2013).await?;
        let id = competition.id;

        // Open -> Completed is forbidden
        assert!(matches!(
            state
                .update_competition(id, "May", "", CompetitionStatus::Completed)
                .await,
            Err(AppError::IllegalTransition(_))
        ));

        state
            .update_competition(id, "May", "", CompetitionStatus::Scoring)
            .await?;

        // Scoring -> Open is forbidden
        assert!(matches!(
            state
                .update_competition(id, "May", "", CompetitionStatus::Open)
                .await,
            Err(AppError::IllegalTransition(_))
        ));

        state
            .update_competition(id, "May", "", CompetitionStatus::Completed)
            .await?;

        // Completed is terminal
        for status in [CompetitionStatus::Open, CompetitionStatus::Scoring] {
            assert!(matches!(
                state.update_competition(id, "May", "", status).await,
                Err(AppError::IllegalTransition(_))
            ));
        }
        let competition = state.get_competition(id).await?.expect("still exists");
        assert_eq!(competition.status, CompetitionStatus::Completed);
        Ok(())
    }

    #[sqlx::test]
    async fn same_status_update_edits_title_and_description(pool: SqlitePool) -> AppResult {
        let state = test_state(pool);
        let competition = state.create_competition("May", "old", 5, 2013).await?;

        state
            .update_competition(competition.id, "Spring", "new", CompetitionStatus::Open)
            .await?;
        let competition = state
            .get_competition(competition.id)
            .await?
            .expect("still exists");
        assert_eq!(competition.title, "Spring");
        assert_eq!(competition.description, "new");
        assert_eq!(competition.status, CompetitionStatus::Open);
        Ok(())
    }

    #[sqlx::test]
    async fn blank_title_rejected_before_any_transition(pool: SqlitePool) -> AppResult {
        let state = test_state(pool);
        let competition = state.create_competition("May", "", 5, 2013).await?;
        assert!(matches!(
            state
                .update_competition(competition.id, "  ", "", CompetitionStatus::Scoring)
                .await,
            Err(AppError::Validation(_))
        ));
        let competition = state
            .get_competition(competition.id)
            .await?
            .expect("still exists");
        assert_eq!(competition.status, CompetitionStatus::Open);
        assert_eq!(competition.title, "May");
        Ok(())
    }

    #[sqlx::test]
    async fn completion_gated_on_all_scores_submitted(pool: SqlitePool) -> AppResult {
        let state = test_state(pool.clone());
        let (competition, users) = competition_with_entries(&state, 3).await?;
        let id = competition.id;
        state
            .update_competition(id, "May", "", CompetitionStatus::Scoring)
            .await?;

        submit_full_ballot(&state, &users[0], id, 7).await?;
        let err = state
            .update_competition(id, "May", "", CompetitionStatus::Completed)
            .await;
        assert!(matches!(err, Err(AppError::NotReady(_))));
        let competition = state.get_competition(id).await?.expect("still exists");
        assert_eq!(competition.status, CompetitionStatus::Scoring);

        submit_full_ballot(&state, &users[1], id, 5).await?;
        submit_full_ballot(&state, &users[2], id, 3).await?;
        state
            .update_competition(id, "May", "", CompetitionStatus::Completed)
            .await?;
        let competition = state.get_competition(id).await?.expect("still exists");
        assert_eq!(competition.status, CompetitionStatus::Completed);
        Ok(())
    }

    #[sqlx::test]
    async fn completion_writes_totals_and_shared_positions(pool: SqlitePool) -> AppResult {
        let state = test_state(pool);
        let (competition, users) = competition_with_entries(&state, 3).await?;
        let id = competition.id;
        state
            .update_competition(id, "May", "", CompetitionStatus::Scoring)
            .await?;

        // users[0] and users[1] give everyone the same value; users[2]'s two
        // peers end up tied ahead of them.
        submit_full_ballot(&state, &users[0], id, 6).await?;
        submit_full_ballot(&state, &users[1], id, 6).await?;
        submit_full_ballot(&state, &users[2], id, 2).await?;
        state
            .update_competition(id, "May", "", CompetitionStatus::Completed)
            .await?;

        let entries = state.competition_entries(id).await?;
        let ranked: Vec<(String, i64, i64)> = entries
            .iter()
            .map(|e| (e.username.clone(), e.entry.total_score, e.entry.position))
            .collect();
        // users[0] and users[1] each received 6+2=8; users[2] received 6+6=12
        assert_eq!(ranked[0], (users[2].username.clone(), 12, 1));
        assert_eq!(ranked[1].1, 8);
        assert_eq!(ranked[1].2, 2);
        assert_eq!(ranked[2].1, 8);
        assert_eq!(ranked[2].2, 2);
        Ok(())
    }

    #[sqlx::test]
    async fn vacuous_completion_with_no_participants(pool: SqlitePool) -> AppResult {
        let state = test_state(pool);
        let competition = state.create_competition("May", "", 5, 2013).await?;
        state
            .update_competition(competition.id, "May", "", CompetitionStatus::Scoring)
            .await?;
        // no entries, no participants: the guard is vacuously true
        state
            .update_competition(competition.id, "May", "", CompetitionStatus::Completed)
            .await?;
        Ok(())
    }

    #[sqlx::test]
    async fn delete_cascades_to_dependents(pool: SqlitePool) -> AppResult {
        let state = test_state(pool.clone());
        let (competition, users) = competition_with_entries(&state, 2).await?;
        let id = competition.id;
        state
            .update_competition(id, "May", "", CompetitionStatus::Scoring)
            .await?;
        submit_full_ballot(&state, &users[0], id, 9).await?;

        state.delete_competition(id).await?;

        assert!(state.get_competition(id).await?.is_none());
        for table in ["Entry", "Participant"] {
            let (count,): (i64,) = sqlx::query_as(&format!(
                "SELECT COUNT(*) FROM {table} WHERE competition_id = ?"
            ))
            .bind(id)
            .fetch_one(&pool)
            .await?;
            assert_eq!(count, 0, "{table} rows should be gone");
        }
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM Score")
            .fetch_one(&pool)
            .await?;
        assert_eq!(count, 0);
        Ok(())
    }
}
