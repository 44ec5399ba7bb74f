//! Shared fixtures for database tests.

use std::collections::HashMap;

use sqlx::SqlitePool;

use crate::db::{Competition, CompetitionId, EntryId, User};
use crate::error::AppResult;
use crate::AppState;

pub fn test_state(pool: SqlitePool) -> AppState {
    AppState::new(pool)
}

/// Creates an open competition for May 2013 with `n` users each holding one
/// entry.
pub async fn competition_with_entries(
    state: &AppState,
    n: usize,
) -> AppResult<(Competition, Vec<User>)> {
    let competition = state.create_competition("May", "", 5, 2013).await?;
    let mut users = Vec::new();
    for i in 1..=n {
        let user = state
            .create_user(&format!("user{i}"), &format!("user{i}@example.com"), false)
            .await?;
        state
            .submit_entry(&user, competition.id, &format!("Photo {i}"), &format!("blob-{i}"))
            .await?;
        users.push(user);
    }
    Ok((competition, users))
}

/// Submits a ballot giving `value` to every entry except the user's own.
pub async fn submit_full_ballot(
    state: &AppState,
    user: &User,
    competition_id: CompetitionId,
    value: i64,
) -> AppResult {
    let entries = state.competition_entries(competition_id).await?;
    let ballot: HashMap<EntryId, i64> = entries
        .iter()
        .filter(|e| e.entry.user_id != user.id)
        .map(|e| (e.entry.id, value))
        .collect();
    state.submit_scores(user, competition_id, &ballot).await
}
