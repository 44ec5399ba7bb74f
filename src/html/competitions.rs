use std::collections::HashSet;
use std::time::Duration;

use axum::response::Response;

use crate::cache::keys;
use crate::db::User;
use crate::traits::RequestBody;
use crate::{AppError, AppState};

/// How long the competition list may be served from cache.
const LIST_TTL: Duration = Duration::from_secs(60);

#[derive(serde::Deserialize)]
pub struct CompetitionsPage {}

impl RequestBody for CompetitionsPage {
    type Response = Response;

    async fn request(
        self,
        state: AppState,
        user: Option<User>,
    ) -> Result<Self::Response, AppError> {
        let competitions = match state.cache.get(keys::COMPETITION_LIST) {
            Some(cached) => cached,
            None => {
                let rows: Vec<serde_json::Value> = state
                    .all_competitions()
                    .await?
                    .iter()
                    .map(|c| c.to_template_json())
                    .collect();
                let rows = serde_json::Value::Array(rows);
                state.cache.set(keys::COMPETITION_LIST, rows.clone(), LIST_TTL);
                rows
            }
        };

        // per-user flags are never cached
        let entered: HashSet<i64> = match &user {
            Some(user) => state
                .entered_competition_ids(user.id)
                .await?
                .into_iter()
                .map(|id| id.0)
                .collect(),
            None => HashSet::new(),
        };
        let competitions: Vec<serde_json::Value> = competitions
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|mut row| {
                let id = row["id"].as_i64().unwrap_or_default();
                row["entered"] = serde_json::json!(entered.contains(&id));
                row
            })
            .collect();

        Ok(crate::render_html_template(
            "competitions.html",
            &user,
            serde_json::json!({ "competitions": competitions }),
        ))
    }
}
