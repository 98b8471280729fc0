use actix_web::HttpRequest;
use sqlx::PgPool;

use crate::auth::rate_limit::RateLimiter;
use crate::config::AppConfig;
use crate::demo;
use crate::errors::AppError;
use crate::listing::SelectorProfile;

/// Shared application state, registered once as `web::Data<AppState>`.
pub struct AppState {
    pub config: AppConfig,
    pub profile: SelectorProfile,
    pub limiter: RateLimiter,
    /// `None` when running without a database (demo mode).
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn new(config: AppConfig, profile: SelectorProfile, pool: Option<PgPool>) -> Self {
        AppState { config, profile, limiter: RateLimiter::new(), pool }
    }

    pub fn is_demo(&self, req: &HttpRequest) -> bool {
        self.pool.is_none() || demo::is_demo(req, &self.config)
    }

    /// The database pool, unless this request is served in demo mode.
    pub fn pool(&self, req: &HttpRequest) -> Result<&PgPool, AppError> {
        match &self.pool {
            Some(pool) if !demo::is_demo(req, &self.config) => Ok(pool),
            _ => Err(AppError::DemoMode),
        }
    }
}
