use std::collections::HashMap;

use itertools::Itertools;
use sqlx::{query, query_as};

use crate::db::{CompetitionId, CompetitionStatus, EntryId, User, UserId};
use crate::error::{AppError, AppResult};
use crate::AppState;

/// Scores must fall in this range, inclusive.
pub const SCORE_MIN: i64 = 0;
pub const SCORE_MAX: i64 = 10;

id_struct!(ScoreId, Score);

/// One peer judgment: a value given by one user to another user's entry.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Score {
    #[allow(unused)]
    pub id: ScoreId,
    pub entry_id: EntryId,
    // always constrained in queries rather than read back
    #[allow(unused)]
    pub from_user_id: UserId,
    pub value: i64,
}

impl AppState {
    /// Accepts a user's complete scoring ballot for a competition.
    ///
    /// The ballot must cover exactly the other participants' entries - the
    /// submitter's own entry is rejected, as are missing or unknown entries
    /// and out-of-range values. Valid ballots insert all score rows and mark
    /// the participation record in one transaction; a second ballot for the
    /// same (user, competition) pair is rejected outright so scores can never
    /// be double-counted.
    pub async fn submit_scores(
        &self,
        user: &User,
        competition_id: CompetitionId,
        ballot: &HashMap<EntryId, i64>,
    ) -> AppResult {
        let competition = self
            .get_competition(competition_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if competition.status != CompetitionStatus::Scoring {
            return Err(AppError::Validation(format!(
                "'{}' is not accepting scores.",
                competition.title
            )));
        }

        let mut tx = self.pool.begin().await?;

        let participant: Option<(bool,)> = query_as(
            "SELECT submitted_scores FROM Participant
             WHERE user_id = ? AND competition_id = ?",
        )
        .bind(user.id)
        .bind(competition_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((already_submitted,)) = participant else {
            return Err(AppError::Validation(
                "Only competitors may submit scores.".to_string(),
            ));
        };
        if already_submitted {
            return Err(AppError::Conflict(
                "You have already submitted scores for this competition.".to_string(),
            ));
        }

        let entries: Vec<(EntryId, UserId)> =
            query_as("SELECT id, user_id FROM Entry WHERE competition_id = ?")
                .bind(competition_id)
                .fetch_all(&mut *tx)
                .await?;

        let mut others = 0;
        for (entry_id, owner) in &entries {
            if *owner == user.id {
                if ballot.contains_key(entry_id) {
                    return Err(AppError::Validation(
                        "You cannot score your own photo.".to_string(),
                    ));
                }
            } else {
                others += 1;
                if !ballot.contains_key(entry_id) {
                    return Err(AppError::Validation(
                        "Your ballot must score every other competitor's photo.".to_string(),
                    ));
                }
            }
        }
        if ballot.len() != others {
            return Err(AppError::Validation(
                "Your ballot contains photos that are not in this competition.".to_string(),
            ));
        }

        for (&entry_id, &value) in ballot {
            if !(SCORE_MIN..=SCORE_MAX).contains(&value) {
                return Err(AppError::Validation(format!(
                    "Scores must be between {SCORE_MIN} and {SCORE_MAX}."
                )));
            }
            query("INSERT INTO Score (entry_id, from_user_id, value) VALUES (?, ?, ?)")
                .bind(entry_id)
                .bind(user.id)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }

        super::participant::mark_participant_scored(&mut *tx, user.id, competition_id).await?;

        tx.commit().await?;

        self.cache
            .invalidate(&crate::cache::keys::competition(competition_id));
        tracing::info!(user = %user.id, %competition_id, "ballot accepted");
        Ok(())
    }

    /// Returns the scores a user has given in a competition, by entry.
    pub async fn scores_from_user(
        &self,
        user_id: UserId,
        competition_id: CompetitionId,
    ) -> sqlx::Result<HashMap<EntryId, i64>> {
        let rows: Vec<Score> = query_as(
            "SELECT Score.*
             FROM Score JOIN Entry ON Score.entry_id = Entry.id
             WHERE Score.from_user_id = ? AND Entry.competition_id = ?",
        )
        .bind(user_id)
        .bind(competition_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|s| (s.entry_id, s.value)).collect())
    }

    /// Builds the admin score matrix for a competition as CSV text.
    ///
    /// One row per recipient entry's owner and one column per scoring user,
    /// both ascending by username; cells are the given score, blank where no
    /// score was recorded (including the diagonal).
    pub async fn export_scores_csv(&self, competition_id: CompetitionId) -> AppResult<String> {
        let owners: Vec<(EntryId, String)> = query_as(
            "SELECT Entry.id, UserAccount.username
             FROM Entry JOIN UserAccount ON Entry.user_id = UserAccount.id
             WHERE Entry.competition_id = ?
             ORDER BY UserAccount.username ASC",
        )
        .bind(competition_id)
        .fetch_all(&self.pool)
        .await?;

        let given: Vec<(EntryId, String, i64)> = query_as(
            "SELECT Score.entry_id, UserAccount.username, Score.value
             FROM Score
             JOIN Entry ON Score.entry_id = Entry.id
             JOIN UserAccount ON Score.from_user_id = UserAccount.id
             WHERE Entry.competition_id = ?",
        )
        .bind(competition_id)
        .fetch_all(&self.pool)
        .await?;
        let cells: HashMap<(EntryId, &str), i64> = given
            .iter()
            .map(|(entry_id, scorer, value)| ((*entry_id, scorer.as_str()), *value))
            .collect();

        let mut csv = String::from("Recipient");
        for (_, username) in &owners {
            csv.push(',');
            csv.push_str(&csv_field(username));
        }
        csv.push('\n');

        for (entry_id, recipient) in &owners {
            let row = owners
                .iter()
                .map(|(_, scorer)| match cells.get(&(*entry_id, scorer.as_str())) {
                    Some(value) => value.to_string(),
                    None => String::new(),
                })
                .join(",");
            csv.push_str(&csv_field(recipient));
            csv.push(',');
            csv.push_str(&row);
            csv.push('\n');
        }

        Ok(csv)
    }
}

/// Quotes a CSV field when its content would break the matrix shape.
fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use sqlx::SqlitePool;

    use super::*;
    use crate::db::test_fixtures::*;

    #[sqlx::test]
    async fn ballot_rejected_outside_scoring(pool: SqlitePool) -> AppResult {
        let state = test_state(pool);
        let (competition, users) = competition_with_entries(&state, 2).await?;
        // still Open
        let err = submit_full_ballot(&state, &users[0], competition.id, 5).await;
        assert!(matches!(err, Err(AppError::Validation(_))));
        Ok(())
    }

    #[sqlx::test]
    async fn non_competitors_cannot_score(pool: SqlitePool) -> AppResult {
        let state = test_state(pool);
        let (competition, _) = competition_with_entries(&state, 2).await?;
        state
            .update_competition(competition.id, "May", "", CompetitionStatus::Scoring)
            .await?;

        let outsider = state.create_user("zack", "zack@example.com", false).await?;
        let err = submit_full_ballot(&state, &outsider, competition.id, 5).await;
        assert!(matches!(err, Err(AppError::Validation(_))));
        Ok(())
    }

    #[sqlx::test]
    async fn second_ballot_is_rejected(pool: SqlitePool) -> AppResult {
        let state = test_state(pool.clone());
        let (competition, users) = competition_with_entries(&state, 2).await?;
        state
            .update_competition(competition.id, "May", "", CompetitionStatus::Scoring)
            .await?;

        submit_full_ballot(&state, &users[0], competition.id, 5).await?;
        let err = submit_full_ballot(&state, &users[0], competition.id, 5).await;
        assert!(matches!(err, Err(AppError::Conflict(_))));

        // the failed resubmission inserted nothing
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM Score")
            .fetch_one(&pool)
            .await?;
        assert_eq!(count, 1);
        Ok(())
    }

    #[sqlx::test]
    async fn self_scores_are_rejected(pool: SqlitePool) -> AppResult {
        let state = test_state(pool.clone());
        let (competition, users) = competition_with_entries(&state, 2).await?;
        state
            .update_competition(competition.id, "May", "", CompetitionStatus::Scoring)
            .await?;

        // hand-build a ballot that includes the submitter's own entry
        let entries = state.competition_entries(competition.id).await?;
        let ballot: HashMap<EntryId, i64> =
            entries.iter().map(|e| (e.entry.id, 5)).collect();
        let err = state.submit_scores(&users[0], competition.id, &ballot).await;
        assert!(matches!(err, Err(AppError::Validation(_))));

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM Score")
            .fetch_one(&pool)
            .await?;
        assert_eq!(count, 0, "rejected ballot must write nothing");
        Ok(())
    }

    #[sqlx::test]
    async fn out_of_range_values_are_rejected(pool: SqlitePool) -> AppResult {
        let state = test_state(pool);
        let (competition, users) = competition_with_entries(&state, 2).await?;
        state
            .update_competition(competition.id, "May", "", CompetitionStatus::Scoring)
            .await?;

        let err = submit_full_ballot(&state, &users[0], competition.id, 11).await;
        assert!(matches!(err, Err(AppError::Validation(_))));
        let err = submit_full_ballot(&state, &users[0], competition.id, -1).await;
        assert!(matches!(err, Err(AppError::Validation(_))));
        Ok(())
    }

    #[sqlx::test]
    async fn incomplete_ballot_is_rejected(pool: SqlitePool) -> AppResult {
        let state = test_state(pool);
        let (competition, users) = competition_with_entries(&state, 3).await?;
        state
            .update_competition(competition.id, "May", "", CompetitionStatus::Scoring)
            .await?;

        let ballot = HashMap::new();
        let err = state.submit_scores(&users[0], competition.id, &ballot).await;
        assert!(matches!(err, Err(AppError::Validation(_))));
        Ok(())
    }

    #[sqlx::test]
    async fn scores_from_user_returns_the_given_ballot(pool: SqlitePool) -> AppResult {
        let state = test_state(pool);
        let (competition, users) = competition_with_entries(&state, 3).await?;
        state
            .update_competition(competition.id, "May", "", CompetitionStatus::Scoring)
            .await?;
        submit_full_ballot(&state, &users[0], competition.id, 6).await?;

        let given = state.scores_from_user(users[0].id, competition.id).await?;
        let own = state
            .user_entry(users[0].id, competition.id)
            .await?
            .expect("entry exists");
        assert_eq!(given.len(), 2);
        assert!(!given.contains_key(&own.id));
        assert!(given.values().all(|&v| v == 6));
        Ok(())
    }

    #[sqlx::test]
    async fn csv_matrix_round_trip(pool: SqlitePool) -> AppResult {
        let state = test_state(pool);
        let competition = state.create_competition("May", "", 5, 2013).await?;
        let alice = state.create_user("alice", "alice@example.com", false).await?;
        let bob = state.create_user("bob", "bob@example.com", false).await?;
        let alice_entry = state
            .submit_entry(&alice, competition.id, "Sunrise", "blob-a")
            .await?;
        let bob_entry = state
            .submit_entry(&bob, competition.id, "Sunset", "blob-b")
            .await?;
        state
            .update_competition(competition.id, "May", "", CompetitionStatus::Scoring)
            .await?;

        state
            .submit_scores(
                &alice,
                competition.id,
                &HashMap::from([(bob_entry.id, 7)]),
            )
            .await?;
        state
            .submit_scores(
                &bob,
                competition.id,
                &HashMap::from([(alice_entry.id, 9)]),
            )
            .await?;

        let csv = state.export_scores_csv(competition.id).await?;
        assert_eq!(csv, "Recipient,alice,bob\nalice,,9\nbob,7,\n");
        Ok(())
    }

    #[sqlx::test]
    async fn csv_quotes_awkward_usernames(pool: SqlitePool) -> AppResult {
        let state = test_state(pool);
        let competition = state.create_competition("May", "", 5, 2013).await?;
        let bob = state.create_user("bob", "bob@example.com", false).await?;
        let smith = state
            .create_user("smith, j", "smith@example.com", false)
            .await?;
        state
            .submit_entry(&bob, competition.id, "Sunrise", "blob-a")
            .await?;
        state
            .submit_entry(&smith, competition.id, "Sunset", "blob-b")
            .await?;

        let csv = state.export_scores_csv(competition.id).await?;
        assert_eq!(
            csv,
            "Recipient,bob,\"smith, j\"\nbob,,\n\"smith, j\",,\n"
        );
        Ok(())
    }
}
