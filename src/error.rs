use axum::body::Body;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;

pub type AppResult<T = ()> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    SqlError(sqlx::Error),
    NotLoggedIn,
    NotAdmin,
    NotFound,
    /// Bad user input (blank title, out-of-range score, malformed ballot).
    Validation(String),
    /// Duplicate record (competition for the same title/month/year, second
    /// entry, second ballot).
    Conflict(String),
    /// Forbidden status change per the competition state machine.
    IllegalTransition(String),
    /// Completion attempted before every competitor has submitted scores.
    NotReady(String),
    InvalidQuery(String),

    Other(String),
}

impl AppError {
    pub fn message(&self) -> String {
        match self {
            Self::SqlError(err) => format!("Internal SQL error: {}", err),
            Self::NotLoggedIn => "You must be signed in to do that".to_string(),
            Self::NotAdmin => "Administrators only".to_string(),
            Self::NotFound => "Not found".to_string(),
            Self::Validation(msg) => msg.to_string(),
            Self::Conflict(msg) => msg.to_string(),
            Self::IllegalTransition(msg) => msg.to_string(),
            Self::NotReady(msg) => msg.to_string(),
            Self::InvalidQuery(msg) => format!("Invalid query: {}", msg),

            Self::Other(msg) => msg.to_string(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::SqlError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotLoggedIn => StatusCode::UNAUTHORIZED,
            Self::NotAdmin => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::IllegalTransition(_) => StatusCode::BAD_REQUEST,
            Self::NotReady(_) => StatusCode::CONFLICT,
            Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,

            Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response<Body> {
        if matches!(self, Self::SqlError(_) | Self::Other(_)) {
            tracing::error!(msg = self.message(), "internal error");
        }
        let body = crate::render_html_template(
            "error.html",
            &None,
            serde_json::json!({ "error_msg": self.message() }),
        );
        (self.status_code(), body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> AppError {
        AppError::SqlError(err)
    }
}
