use axum::body::Bytes;
use axum::response::{IntoResponse, Redirect, Response};
use axum_typed_multipart::{FieldData, TryFromMultipart};

use crate::db::{CompetitionId, CompetitionStatus, EntryId, FullEntry, User};
use crate::traits::{Linkable, RequestBody};
use crate::{AppError, AppState};

/// A single photo page.
#[derive(serde::Deserialize)]
pub struct EntryPage {
    pub id: EntryId,
}

impl RequestBody for EntryPage {
    type Response = Response;

    async fn request(
        self,
        state: AppState,
        user: Option<User>,
    ) -> Result<Self::Response, AppError> {
        let full = state.get_entry(self.id).await?.ok_or(AppError::NotFound)?;

        if !can_view(&state, &full, &user).await? {
            return Err(AppError::Validation(
                "You cannot view photos in competitions which are not finished.".to_string(),
            ));
        }

        let own = user.as_ref().is_some_and(|u| u.id == full.entry.user_id);
        let competition = match full.entry.competition_id {
            Some(id) => state.get_competition(id).await?,
            None => None,
        };
        let can_delete = (own || user.as_ref().is_some_and(|u| u.admin))
            && competition
                .as_ref()
                .is_none_or(|c| c.status == CompetitionStatus::Open);

        Ok(crate::render_html_template(
            "entry.html",
            &user,
            serde_json::json!({
                "entry": full.to_template_json(),
                "competition": competition.map(|c| c.to_template_json()),
                "can_delete": can_delete,
            }),
        ))
    }
}

/// Photos in unfinished competitions stay hidden from everyone except their
/// owner.
async fn can_view(
    state: &AppState,
    full: &FullEntry,
    user: &Option<User>,
) -> Result<bool, AppError> {
    let Some(competition_id) = full.entry.competition_id else {
        return Ok(true); // extra photos are always visible
    };
    let competition = state
        .get_competition(competition_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if competition.finished() {
        return Ok(true);
    }
    Ok(user
        .as_ref()
        .is_some_and(|u| u.id == full.entry.user_id || u.admin))
}

#[derive(serde::Deserialize)]
pub struct SubmitEntryPage {
    pub competition: CompetitionId,
}

impl RequestBody for SubmitEntryPage {
    type Response = Response;

    async fn request(
        self,
        state: AppState,
        user: Option<User>,
    ) -> Result<Self::Response, AppError> {
        super::require_user(&user)?;

        let competition = state
            .get_competition(self.competition)
            .await?
            .ok_or(AppError::NotFound)?;
        if competition.status != CompetitionStatus::Open {
            return Err(AppError::Validation(format!(
                "'{}' is no longer open for entries.",
                competition.title
            )));
        }

        Ok(crate::render_html_template(
            "submit-entry.html",
            &user,
            serde_json::json!({ "competition": competition.to_template_json() }),
        ))
    }
}

#[derive(TryFromMultipart)]
pub struct SubmitEntryRequest {
    pub competition_id: i64,
    pub title: Option<String>,
    #[form_data(limit = "25MiB")]
    pub photo: FieldData<Bytes>,
}

impl RequestBody for SubmitEntryRequest {
    type Response = Redirect;

    async fn request(
        self,
        state: AppState,
        user: Option<User>,
    ) -> Result<Self::Response, AppError> {
        let user = super::require_user(&user)?;
        if self.photo.contents.is_empty() {
            return Err(AppError::Validation(
                "You forgot to choose a photo.".to_string(),
            ));
        }

        let competition_id = CompetitionId(self.competition_id);
        let blob_key = crate::blob::store(&self.photo.contents).await?;
        let result = state
            .submit_entry(
                user,
                competition_id,
                self.title.as_deref().unwrap_or(""),
                &blob_key,
            )
            .await;
        if result.is_err() {
            // the entry was refused; don't leave the blob orphaned
            crate::blob::delete(&blob_key).await;
        }
        result?;
        Ok(Redirect::to(&competition_id.relative_url()))
    }
}

#[derive(TryFromMultipart)]
pub struct DeleteEntryRequest {
    pub entry_id: i64,
}

impl RequestBody for DeleteEntryRequest {
    type Response = Redirect;

    async fn request(
        self,
        state: AppState,
        user: Option<User>,
    ) -> Result<Self::Response, AppError> {
        let user = super::require_user(&user)?;
        let id = EntryId(self.entry_id);
        let competition_id = state
            .get_entry(id)
            .await?
            .ok_or(AppError::NotFound)?
            .entry
            .competition_id;

        state.delete_entry(user, id).await?;

        Ok(Redirect::to(&match competition_id {
            Some(competition_id) => competition_id.relative_url(),
            None => "/".to_string(),
        }))
    }
}
