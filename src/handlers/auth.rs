use std::net::{IpAddr, Ipv4Addr};

use actix_session::Session;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};

use crate::auth::session::{self as auth_session, SessionUser};
use crate::auth::{csrf, password, validate};
use crate::demo;
use crate::errors::{ApiErrorResponse, AppError, render};
use crate::models::user;
use crate::state::AppState;
use crate::templates_structs::{LoginTemplate, RegisterTemplate};

const TOO_MANY_ATTEMPTS: &str = "Too many failed login attempts. Please try again later.";
const BAD_CREDENTIALS: &str = "Invalid username or password";

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct CredentialsForm {
    pub username: String,
    pub password: String,
    pub csrf_token: String,
}

#[derive(Deserialize)]
pub struct CsrfOnly {
    pub csrf_token: String,
}

#[derive(Serialize)]
struct UserResponse {
    id: i64,
    username: String,
    demo: bool,
}

impl UserResponse {
    fn new(user: SessionUser, demo: bool) -> Self {
        UserResponse { id: user.id, username: user.username, demo }
    }
}

fn client_ip(req: &HttpRequest) -> IpAddr {
    req.peer_addr()
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

enum LoginOutcome {
    LoggedIn(SessionUser),
    Rejected(&'static str),
}

/// Shared login flow for the API and the login form. Rate limiting is
/// checked before touching the database.
async fn attempt_login(
    req: &HttpRequest,
    state: &AppState,
    session: &Session,
    username: &str,
    password_input: &str,
) -> Result<LoginOutcome, AppError> {
    if state.is_demo(req) {
        let user = demo::demo_user();
        auth_session::login(session, user.id, &user.username)?;
        return Ok(LoginOutcome::LoggedIn(user));
    }
    let ip = client_ip(req);
    if state.limiter.is_blocked(ip) {
        log::warn!("login blocked for {ip}");
        return Ok(LoginOutcome::Rejected(TOO_MANY_ATTEMPTS));
    }
    let pool = state.pool(req)?;
    match user::find_by_username(pool, username).await? {
        Some(u) if password::verify_password(password_input, &u.password_hash) => {
            state.limiter.clear(ip);
            auth_session::login(session, u.id, &u.username)?;
            log::info!("user {} logged in", u.username);
            Ok(LoginOutcome::LoggedIn(SessionUser { id: u.id, username: u.username }))
        }
        _ => {
            state.limiter.record_failure(ip);
            Ok(LoginOutcome::Rejected(BAD_CREDENTIALS))
        }
    }
}

async fn attempt_register(
    req: &HttpRequest,
    state: &AppState,
    session: &Session,
    username: &str,
    password_input: &str,
) -> Result<SessionUser, AppError> {
    if state.is_demo(req) {
        let user = demo::demo_user();
        auth_session::login(session, user.id, &user.username)?;
        return Ok(user);
    }
    let errors: Vec<String> = validate::validate_username(username)
        .into_iter()
        .chain(validate::validate_password(password_input))
        .collect();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    let pool = state.pool(req)?;
    let hash = password::hash_password(password_input)?;
    let created = user::create(pool, username, &hash).await?;
    auth_session::login(session, created.id, &created.username)?;
    log::info!("user {} registered", created.username);
    Ok(SessionUser { id: created.id, username: created.username })
}

// --- JSON API ---

pub async fn api_register(
    req: HttpRequest,
    state: web::Data<AppState>,
    session: Session,
    body: web::Json<Credentials>,
) -> Result<HttpResponse, AppError> {
    let user = attempt_register(&req, &state, &session, &body.username, &body.password).await?;
    Ok(HttpResponse::Created().json(UserResponse::new(user, state.is_demo(&req))))
}

pub async fn api_login(
    req: HttpRequest,
    state: web::Data<AppState>,
    session: Session,
    body: web::Json<Credentials>,
) -> Result<HttpResponse, AppError> {
    match attempt_login(&req, &state, &session, &body.username, &body.password).await? {
        LoginOutcome::LoggedIn(user) => {
            Ok(HttpResponse::Ok().json(UserResponse::new(user, state.is_demo(&req))))
        }
        LoginOutcome::Rejected(message) => {
            Ok(HttpResponse::Unauthorized().json(ApiErrorResponse::destructive(message)))
        }
    }
}

pub async fn api_logout(session: Session) -> HttpResponse {
    auth_session::logout(&session);
    HttpResponse::Ok().json(serde_json::json!({ "ok": true }))
}

pub async fn api_user(
    req: HttpRequest,
    state: web::Data<AppState>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    if state.is_demo(&req) {
        return Ok(HttpResponse::Ok().json(UserResponse::new(demo::demo_user(), true)));
    }
    let current = auth_session::require_user(&session)?;
    // the account may have been removed since the session was issued
    if user::find_by_id(state.pool(&req)?, current.id).await?.is_none() {
        auth_session::logout(&session);
        return Err(AppError::Unauthorized);
    }
    Ok(HttpResponse::Ok().json(UserResponse::new(current, false)))
}

// --- pages ---

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header(("Location", location))
        .finish()
}

pub async fn login_page(session: Session) -> Result<HttpResponse, AppError> {
    if auth_session::get_user_id(&session).is_some() {
        return Ok(redirect("/editor"));
    }
    render(LoginTemplate {
        error: None,
        flash: auth_session::take_flash(&session),
        csrf_token: csrf::get_or_create_token(&session),
    })
}

pub async fn login_submit(
    req: HttpRequest,
    state: web::Data<AppState>,
    session: Session,
    form: web::Form<CredentialsForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    match attempt_login(&req, &state, &session, &form.username, &form.password).await? {
        LoginOutcome::LoggedIn(_) => Ok(redirect("/editor")),
        LoginOutcome::Rejected(message) => render(LoginTemplate {
            error: Some(message.to_string()),
            flash: None,
            csrf_token: csrf::get_or_create_token(&session),
        }),
    }
}

pub async fn register_page(session: Session) -> Result<HttpResponse, AppError> {
    if auth_session::get_user_id(&session).is_some() {
        return Ok(redirect("/editor"));
    }
    render(RegisterTemplate {
        errors: Vec::new(),
        username: String::new(),
        csrf_token: csrf::get_or_create_token(&session),
    })
}

pub async fn register_submit(
    req: HttpRequest,
    state: web::Data<AppState>,
    session: Session,
    form: web::Form<CredentialsForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    match attempt_register(&req, &state, &session, &form.username, &form.password).await {
        Ok(_) => Ok(redirect("/editor")),
        Err(AppError::Validation(errors)) => render(RegisterTemplate {
            errors,
            username: form.username.clone(),
            csrf_token: csrf::get_or_create_token(&session),
        }),
        Err(e) => Err(e),
    }
}

pub async fn logout(session: Session, form: web::Form<CsrfOnly>) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    auth_session::logout(&session);
    auth_session::set_flash(&session, "You have been signed out");
    Ok(redirect("/login"))
}
