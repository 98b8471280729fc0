pub mod auth;
pub mod editor;
pub mod preview;
pub mod selector;
pub mod templates;
pub mod upload;

use actix_web::web;

use crate::errors::AppError;
use crate::listing::ListingError;

/// Run CPU-bound pipeline work off the async workers.
pub async fn run_pipeline<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, ListingError> + Send + 'static,
    T: Send + 'static,
{
    Ok(web::block(work).await??)
}
