use std::collections::HashMap;

use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::CookieJar;

use crate::db::{CompetitionId, CompetitionStatus, EntryId, User};
use crate::traits::{Linkable, RequestBody};
use crate::{AppError, AppState};

/// How long a completed competition's results view may be served from cache.
const RESULTS_TTL: std::time::Duration = std::time::Duration::from_secs(300);

/// A competition's detail page. Defaults to the newest competition; what it
/// shows depends on the competition's status and on the viewer.
#[derive(serde::Deserialize)]
pub struct CompetitionPage {
    pub id: Option<CompetitionId>,
}

impl RequestBody for CompetitionPage {
    type Response = Response;

    async fn request(
        self,
        state: AppState,
        user: Option<User>,
    ) -> Result<Self::Response, AppError> {
        let competition = match self.id {
            Some(id) => state.get_competition(id).await?,
            None => state.latest_competition().await?,
        };
        let Some(competition) = competition else {
            return Ok(Redirect::to("/competitions").into_response());
        };

        let entries = state.competition_entries(competition.id).await?;
        let own_entry = match &user {
            Some(user) => state.user_entry(user.id, competition.id).await?,
            None => None,
        };

        let data = match competition.status {
            CompetitionStatus::Open => serde_json::json!({
                "competition": competition.to_template_json(),
                "entries": entries.iter().map(|e| e.to_template_json()).collect::<Vec<_>>(),
                "can_enter": user.is_some() && own_entry.is_none(),
                "entered": own_entry.is_some(),
            }),
            CompetitionStatus::Scoring => {
                let participant = match &user {
                    Some(user) => state.get_participant(user.id, competition.id).await?,
                    None => None,
                };
                let to_score = participant.as_ref().is_some_and(|p| !p.submitted_scores);
                let given = match (&user, to_score) {
                    (Some(user), false) => {
                        state.scores_from_user(user.id, competition.id).await?
                    }
                    _ => HashMap::new(),
                };

                let entry_rows: Vec<serde_json::Value> = entries
                    .iter()
                    .map(|e| {
                        let mut row = e.to_template_json();
                        let own = user.as_ref().is_some_and(|u| u.id == e.entry.user_id);
                        row["own"] = serde_json::json!(own);
                        row["given_score"] = serde_json::json!(given.get(&e.entry.id));
                        row
                    })
                    .collect();

                serde_json::json!({
                    "competition": competition.to_template_json(),
                    "entries": entry_rows,
                    "to_score": to_score,
                    "scored": participant.as_ref().is_some_and(|p| p.submitted_scores),
                })
            }
            // results are immutable once completed, so the whole view caches
            CompetitionStatus::Completed => {
                let key = crate::cache::keys::competition(competition.id);
                match state.cache.get(&key) {
                    Some(cached) => cached,
                    None => {
                        let data = serde_json::json!({
                            "competition": competition.to_template_json(),
                            "entries": entries.iter().map(|e| e.to_template_json()).collect::<Vec<_>>(),
                        });
                        state.cache.set(&key, data.clone(), RESULTS_TTL);
                        data
                    }
                }
            }
        };

        let template = match competition.status {
            CompetitionStatus::Open => "competition-open.html",
            CompetitionStatus::Scoring => "competition-scoring.html",
            CompetitionStatus::Completed => "competition-completed.html",
        };
        Ok(crate::render_html_template(template, &user, data))
    }
}

/// Accepts a scoring ballot posted as `competition_id` plus one
/// `score-<entry id>` field per photo.
///
/// It cannot be a [`RequestBody`] because the field names are dynamic.
pub async fn submit_scores_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let (user, headers) = crate::cookies::process_cookies(&state, &jar).await?;
    let user = super::require_user(&user)?;

    let competition_id = fields
        .get("competition_id")
        .and_then(|v| v.parse::<i64>().ok())
        .map(CompetitionId)
        .ok_or_else(|| AppError::InvalidQuery("missing competition_id".to_string()))?;

    let mut ballot: HashMap<EntryId, i64> = HashMap::new();
    for (name, value) in &fields {
        let Some(entry_id) = name.strip_prefix("score-") else {
            continue;
        };
        let entry_id = entry_id
            .parse::<i64>()
            .map_err(|_| AppError::InvalidQuery(format!("bad entry id in field {name}")))?;
        let value = value.parse::<i64>().map_err(|_| {
            AppError::Validation(format!("'{value}' is not a valid score"))
        })?;
        ballot.insert(EntryId(entry_id), value);
    }

    state.submit_scores(user, competition_id, &ballot).await?;
    Ok((headers, Redirect::to(&competition_id.relative_url())).into_response())
}
