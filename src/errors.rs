use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use askama::Template;
use serde::Serialize;
use std::fmt;

use crate::listing::ListingError;

/// Toast style the front end uses for failures the user should act on.
pub const DESTRUCTIVE: &str = "destructive";

#[derive(Debug)]
pub enum AppError {
    Db(sqlx::Error),
    Template(askama::Error),
    Hash(String),
    Session(String),
    Unauthorized,
    Csrf,
    NotFound,
    Validation(Vec<String>),
    Upload(String),
    Listing(ListingError),
    Blocking,
    DemoMode,
}

/// JSON error body returned by the API.
#[derive(Serialize, Debug)]
pub struct ApiErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<&'static str>,
}

impl ApiErrorResponse {
    pub fn destructive(error: impl Into<String>) -> Self {
        ApiErrorResponse { error: error.into(), details: None, variant: Some(DESTRUCTIVE) }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "Database error: {e}"),
            AppError::Template(e) => write!(f, "Template error: {e}"),
            AppError::Hash(e) => write!(f, "Hash error: {e}"),
            AppError::Session(e) => write!(f, "Session error: {e}"),
            AppError::Unauthorized => write!(f, "Not authenticated"),
            AppError::Csrf => write!(f, "Invalid or missing CSRF token"),
            AppError::NotFound => write!(f, "Not found"),
            AppError::Validation(errors) => write!(f, "Validation failed: {}", errors.join("; ")),
            AppError::Upload(e) => write!(f, "Upload failed: {e}"),
            AppError::Listing(e) => write!(f, "{e}"),
            AppError::Blocking => write!(f, "Background task failed"),
            AppError::DemoMode => write!(f, "Not available in demo mode"),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Csrf => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::Upload(_) => StatusCode::BAD_REQUEST,
            AppError::Listing(ListingError::InputTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Listing(e) if e.is_user_facing() => StatusCode::BAD_REQUEST,
            AppError::DemoMode => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = match self {
            AppError::Validation(errors) => ApiErrorResponse {
                error: "Validation failed".to_string(),
                details: Some(errors.join("; ")),
                variant: Some(DESTRUCTIVE),
            },
            AppError::Unauthorized | AppError::NotFound | AppError::DemoMode => ApiErrorResponse {
                error: self.to_string(),
                details: None,
                variant: None,
            },
            _ if status.is_server_error() => {
                log::error!("{self}");
                ApiErrorResponse::destructive("Internal Server Error")
            }
            _ => ApiErrorResponse::destructive(self.to_string()),
        };
        HttpResponse::build(status).json(body)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Db(e)
    }
}

impl From<askama::Error> for AppError {
    fn from(e: askama::Error) -> Self {
        AppError::Template(e)
    }
}

impl From<ListingError> for AppError {
    fn from(e: ListingError) -> Self {
        AppError::Listing(e)
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(_: actix_web::error::BlockingError) -> Self {
        AppError::Blocking
    }
}

impl From<actix_session::SessionInsertError> for AppError {
    fn from(e: actix_session::SessionInsertError) -> Self {
        AppError::Session(e.to_string())
    }
}

/// Render an askama page into a 200 HTML response.
pub fn render(tmpl: impl Template) -> Result<HttpResponse, AppError> {
    let body = tmpl.render()?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body))
}
