use crate::traits::RequestBody;
use crate::{html, static_files, AppState};

pub(crate) fn router() -> axum::Router<AppState> {
    use axum::routing::{get, post};

    axum::Router::new()
        // Competitions
        .route(
            "/",
            get(html::competitions::CompetitionsPage::as_handler_query),
        )
        .route(
            "/competitions",
            get(html::competitions::CompetitionsPage::as_handler_query),
        )
        .route(
            "/competition",
            get(html::competition::CompetitionPage::as_handler_query),
        )
        .route(
            "/submit-scores",
            post(html::competition::submit_scores_handler),
        )
        // Entries
        .route("/entry", get(html::entry::EntryPage::as_handler_query))
        .route(
            "/submit-entry",
            get(html::entry::SubmitEntryPage::as_handler_query)
                .post(html::entry::SubmitEntryRequest::as_multipart_form_handler),
        )
        .route(
            "/delete-entry",
            post(html::entry::DeleteEntryRequest::as_multipart_form_handler),
        )
        // Administration
        .route(
            "/admin/competitions",
            get(html::admin::AdminPage::as_handler_query),
        )
        .route(
            "/admin/new-competition",
            get(html::admin::NewCompetitionPage::as_handler_query)
                .post(html::admin::NewCompetitionRequest::as_multipart_form_handler),
        )
        .route(
            "/admin/modify-competition",
            get(html::admin::ModifyCompetitionPage::as_handler_query)
                .post(html::admin::ModifyCompetitionRequest::as_multipart_form_handler),
        )
        .route(
            "/admin/delete-competition",
            post(html::admin::DeleteCompetitionRequest::as_multipart_form_handler),
        )
        .route(
            "/admin/export-scores",
            get(html::admin::ExportScoresCsv::as_handler_query),
        )
        // Resources
        .route("/media", get(crate::blob::media_handler))
        .route("/css/{*path}", get(static_files::css_handler))
        .fallback(html::not_found::handler_query)
}
