use axum::response::{IntoResponse, Redirect, Response};
use axum_typed_multipart::TryFromMultipart;
use chrono::Datelike;

use crate::db::{CompetitionId, CompetitionStatus, User};
use crate::traits::RequestBody;
use crate::{AppError, AppState};

fn status_options(current: CompetitionStatus) -> Vec<serde_json::Value> {
    [
        CompetitionStatus::Open,
        CompetitionStatus::Scoring,
        CompetitionStatus::Completed,
    ]
    .into_iter()
    .map(|status| {
        serde_json::json!({
            "value": status as i32,
            "name": status.name(),
            "selected": status == current,
        })
    })
    .collect()
}

fn month_options() -> Vec<serde_json::Value> {
    (1..=12)
        .map(|m| {
            serde_json::json!({
                "value": m,
                "name": crate::util::month_name(m),
            })
        })
        .collect()
}

/// Administrator overview of every competition.
#[derive(serde::Deserialize)]
pub struct AdminPage {}

impl RequestBody for AdminPage {
    type Response = Response;

    async fn request(
        self,
        state: AppState,
        user: Option<User>,
    ) -> Result<Self::Response, AppError> {
        super::require_admin(&user)?;

        let competitions: Vec<serde_json::Value> = state
            .all_competitions()
            .await?
            .iter()
            .map(|c| c.to_template_json())
            .collect();

        Ok(crate::render_html_template(
            "comp-admin.html",
            &user,
            serde_json::json!({ "competitions": competitions }),
        ))
    }
}

#[derive(serde::Deserialize)]
pub struct NewCompetitionPage {}

impl RequestBody for NewCompetitionPage {
    type Response = Response;

    async fn request(
        self,
        state: AppState,
        user: Option<User>,
    ) -> Result<Self::Response, AppError> {
        super::require_admin(&user)?;
        let _ = state;

        Ok(crate::render_html_template(
            "comp-new.html",
            &user,
            serde_json::json!({
                "months": month_options(),
                "year": chrono::Utc::now().year(),
            }),
        ))
    }
}

#[derive(TryFromMultipart)]
pub struct NewCompetitionRequest {
    pub title: String,
    pub description: Option<String>,
    pub month: i32,
    pub year: i32,
}

impl RequestBody for NewCompetitionRequest {
    type Response = Redirect;

    async fn request(
        self,
        state: AppState,
        user: Option<User>,
    ) -> Result<Self::Response, AppError> {
        super::require_admin(&user)?;

        state
            .create_competition(
                &self.title,
                self.description.as_deref().unwrap_or(""),
                self.month,
                self.year,
            )
            .await?;
        Ok(Redirect::to("/admin/competitions"))
    }
}

#[derive(serde::Deserialize)]
pub struct ModifyCompetitionPage {
    pub id: CompetitionId,
}

impl RequestBody for ModifyCompetitionPage {
    type Response = Response;

    async fn request(
        self,
        state: AppState,
        user: Option<User>,
    ) -> Result<Self::Response, AppError> {
        super::require_admin(&user)?;

        let competition = state
            .get_competition(self.id)
            .await?
            .ok_or(AppError::NotFound)?;

        Ok(crate::render_html_template(
            "comp-mod.html",
            &user,
            serde_json::json!({
                "competition": competition.to_template_json(),
                "status_options": status_options(competition.status),
            }),
        ))
    }
}

/// The state machine's entry point: title/description edits plus status
/// transitions, validated by [`AppState::update_competition`].
#[derive(TryFromMultipart)]
pub struct ModifyCompetitionRequest {
    pub competition_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: i64,
}

impl RequestBody for ModifyCompetitionRequest {
    type Response = Redirect;

    async fn request(
        self,
        state: AppState,
        user: Option<User>,
    ) -> Result<Self::Response, AppError> {
        super::require_admin(&user)?;

        let new_status = CompetitionStatus::from_i64(self.status)
            .ok_or_else(|| AppError::InvalidQuery(format!("bad status {}", self.status)))?;
        state
            .update_competition(
                CompetitionId(self.competition_id),
                &self.title,
                self.description.as_deref().unwrap_or(""),
                new_status,
            )
            .await?;
        Ok(Redirect::to("/admin/competitions"))
    }
}

#[derive(TryFromMultipart)]
pub struct DeleteCompetitionRequest {
    pub competition_id: i64,
}

impl RequestBody for DeleteCompetitionRequest {
    type Response = Redirect;

    async fn request(
        self,
        state: AppState,
        user: Option<User>,
    ) -> Result<Self::Response, AppError> {
        super::require_admin(&user)?;

        state
            .delete_competition(CompetitionId(self.competition_id))
            .await?;
        Ok(Redirect::to("/admin/competitions"))
    }
}

/// Admin-only download of a competition's full score matrix.
#[derive(serde::Deserialize)]
pub struct ExportScoresCsv {
    pub id: CompetitionId,
}

impl RequestBody for ExportScoresCsv {
    type Response = Response;

    async fn request(
        self,
        state: AppState,
        user: Option<User>,
    ) -> Result<Self::Response, AppError> {
        super::require_admin(&user)?;

        let competition = state
            .get_competition(self.id)
            .await?
            .ok_or(AppError::NotFound)?;
        let csv = state.export_scores_csv(self.id).await?;

        let filename = format!(
            "scores-{}-{}-{}.csv",
            competition.year, competition.month, competition.title,
        );
        Ok((
            [
                (axum::http::header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    axum::http::header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{filename}\""),
                ),
            ],
            csv,
        )
            .into_response())
    }
}
