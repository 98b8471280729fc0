use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpServer, cookie::Key, middleware, web};

use listing_editor::config::AppConfig;
use listing_editor::listing::SelectorProfile;
use listing_editor::state::AppState;
use listing_editor::{db, routes};

fn session_key(config: &AppConfig) -> Key {
    match &config.session_key {
        Some(val) if val.len() >= 64 => {
            log::info!("Using SESSION_KEY from environment");
            Key::from(val.as_bytes())
        }
        Some(val) => {
            log::warn!("SESSION_KEY too short ({} bytes, need 64+), generating random key", val.len());
            Key::generate()
        }
        None => {
            log::warn!("No SESSION_KEY set, generating random key (sessions lost on restart)");
            Key::generate()
        }
    }
}

fn io_error(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env();

    let profile = match &config.selector_profile {
        Some(path) => {
            log::info!("Loading selector profile from {}", path.display());
            SelectorProfile::from_path(path).map_err(io_error)?
        }
        None => SelectorProfile::builtin().clone(),
    };

    let pool = match (&config.database_url, config.demo_mode) {
        (Some(url), false) => {
            let pool = db::init_pool(url).await.map_err(io_error)?;
            db::run_migrations(&pool).await.map_err(io_error)?;
            Some(pool)
        }
        _ => {
            log::warn!("Running in demo mode: no database, nothing is saved");
            None
        }
    };

    let secret_key = session_key(&config);
    let bind_addr = config.bind_addr.clone();
    let body_limit = config.body_limit();
    let state = web::Data::new(AppState::new(config, profile, pool));

    log::info!("Starting server at http://{bind_addr}");

    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(
            CookieSessionStore::default(),
            secret_key.clone(),
        )
        .cookie_secure(false)
        .cookie_http_only(true)
        .build();

        App::new()
            .wrap(session_mw)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .app_data(web::JsonConfig::default().limit(body_limit))
            .app_data(web::FormConfig::default().limit(body_limit))
            .configure(routes::configure)
            .default_service(web::to(routes::not_found))
    })
    .bind(bind_addr)?
    .run()
    .await
}
