use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum_extra::extract::CookieJar;
use axum_typed_multipart::{TryFromMultipartWithState, TypedMultipart};

use crate::db::User;
use crate::error::AppError;
use crate::AppState;

/// Object that can be linked to.
pub trait Linkable {
    /// Returns the relative URL. Example: `/entry?id=3`
    fn relative_url(&self) -> String;

    /// Returns the absolute URL. Example: `https://photos.example.org/entry?id=3`
    fn absolute_url(&self) -> String {
        crate::env::DOMAIN_NAME.clone() + &self.relative_url()
    }
}

/// Object that can be received as a request.
pub trait RequestBody {
    type Response;

    async fn request(self, state: AppState, user: Option<User>)
        -> Result<Self::Response, AppError>;

    async fn as_handler_query(
        State(state): State<AppState>,
        jar: CookieJar,
        Query(item): Query<Self>,
    ) -> Result<impl IntoResponse, AppError>
    where
        Self: Sized,
        Self::Response: IntoResponse,
    {
        let (user, headers) = crate::cookies::process_cookies(&state, &jar).await?;
        let response = item.request(state, user).await?;
        Ok((headers, response))
    }

    async fn as_multipart_form_handler(
        State(state): State<AppState>,
        jar: CookieJar,
        TypedMultipart(item): TypedMultipart<Self>,
    ) -> Result<impl IntoResponse, AppError>
    where
        Self: TryFromMultipartWithState<AppState>,
        Self::Response: IntoResponse,
    {
        let (user, headers) = crate::cookies::process_cookies(&state, &jar).await?;
        let response = item.request(state, user).await?;
        Ok((headers, response))
    }
}
