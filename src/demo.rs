//! Demo mode: the editor works without a database, with a fixed user and
//! no persistence.

use actix_web::HttpRequest;

use crate::auth::session::SessionUser;
use crate::config::AppConfig;

const STATIC_HOSTS: &[&str] = &["github.io", "netlify.app", "vercel.app", "pages.dev"];

pub fn demo_user() -> SessionUser {
    SessionUser { id: 0, username: "demo".to_string() }
}

/// True for hostnames of static-site hosts, where no backend is expected.
pub fn is_static_host(host: &str) -> bool {
    let host = host.split(':').next().unwrap_or_default().to_ascii_lowercase();
    STATIC_HOSTS
        .iter()
        .any(|suffix| host == *suffix || host.ends_with(&format!(".{suffix}")))
}

pub fn is_demo(req: &HttpRequest, config: &AppConfig) -> bool {
    config.demo_mode || is_static_host(req.connection_info().host())
}
