use actix_session::Session;
use actix_web::{HttpRequest, HttpResponse, web};

use crate::auth::session::require_user;
use crate::auth::{csrf, validate};
use crate::demo;
use crate::errors::{AppError, render};
use crate::models::template::{self, NewTemplate, TemplateChanges};
use crate::state::AppState;
use crate::templates_structs::TemplateListTemplate;

const MAX_NAME_CHARS: usize = 200;

fn validate_new(new: &NewTemplate, max_html_bytes: usize) -> Result<(), AppError> {
    let errors: Vec<String> = validate::validate_required(&new.name, "Name", MAX_NAME_CHARS)
        .into_iter()
        .chain(validate::validate_max_bytes(&new.html, "HTML", max_html_bytes))
        .collect();
    if errors.is_empty() { Ok(()) } else { Err(AppError::Validation(errors)) }
}

fn validate_changes(changes: &TemplateChanges, max_html_bytes: usize) -> Result<(), AppError> {
    let mut errors = Vec::new();
    if let Some(name) = &changes.name {
        errors.extend(validate::validate_required(name, "Name", MAX_NAME_CHARS));
    }
    if let Some(html) = &changes.html {
        errors.extend(validate::validate_max_bytes(html, "HTML", max_html_bytes));
    }
    if errors.is_empty() { Ok(()) } else { Err(AppError::Validation(errors)) }
}

/// GET /templates: the saved templates page.
pub async fn page(
    req: HttpRequest,
    state: web::Data<AppState>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let csrf_token = csrf::get_or_create_token(&session);
    if state.is_demo(&req) {
        return render(TemplateListTemplate {
            username: demo::demo_user().username,
            demo: true,
            csrf_token,
            templates: Vec::new(),
        });
    }
    let user = require_user(&session)?;
    let templates = template::list_for_user(state.pool(&req)?, user.id).await?;
    render(TemplateListTemplate { username: user.username, demo: false, csrf_token, templates })
}

/// GET /api/templates
pub async fn list(
    req: HttpRequest,
    state: web::Data<AppState>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let pool = state.pool(&req)?;
    let user = require_user(&session)?;
    let templates = template::list_for_user(pool, user.id).await?;
    Ok(HttpResponse::Ok().json(templates))
}

/// POST /api/templates
pub async fn create(
    req: HttpRequest,
    state: web::Data<AppState>,
    session: Session,
    body: web::Json<NewTemplate>,
) -> Result<HttpResponse, AppError> {
    let pool = state.pool(&req)?;
    let user = require_user(&session)?;
    let mut new = body.into_inner();
    validate_new(&new, state.config.max_html_bytes)?;
    new.name = new.name.trim().to_string();
    let created = template::create(pool, user.id, &new).await?;
    log::info!("user {} created template {}", user.id, created.id);
    Ok(HttpResponse::Created().json(created))
}

/// GET /api/templates/{id}
pub async fn get(
    req: HttpRequest,
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let pool = state.pool(&req)?;
    let user = require_user(&session)?;
    let found = template::find_for_user(pool, path.into_inner(), user.id).await?;
    Ok(HttpResponse::Ok().json(found.ok_or(AppError::NotFound)?))
}

/// PUT /api/templates/{id}
pub async fn update(
    req: HttpRequest,
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<TemplateChanges>,
) -> Result<HttpResponse, AppError> {
    let pool = state.pool(&req)?;
    let user = require_user(&session)?;
    let changes = body.into_inner();
    validate_changes(&changes, state.config.max_html_bytes)?;
    let updated = template::update(pool, path.into_inner(), user.id, &changes).await?;
    Ok(HttpResponse::Ok().json(updated.ok_or(AppError::NotFound)?))
}

/// DELETE /api/templates/{id}
pub async fn delete(
    req: HttpRequest,
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let pool = state.pool(&req)?;
    let user = require_user(&session)?;
    let id = path.into_inner();
    if !template::delete(pool, id, user.id).await? {
        return Err(AppError::NotFound);
    }
    log::info!("user {} deleted template {id}", user.id);
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/templates/{id}/versions
pub async fn versions(
    req: HttpRequest,
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let pool = state.pool(&req)?;
    let user = require_user(&session)?;
    let versions = template::list_versions(pool, path.into_inner(), user.id).await?;
    Ok(HttpResponse::Ok().json(versions.ok_or(AppError::NotFound)?))
}

/// POST /api/templates/{id}/restore/{version_id}
pub async fn restore(
    req: HttpRequest,
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    let pool = state.pool(&req)?;
    let user = require_user(&session)?;
    let (id, version_id) = path.into_inner();
    let restored = template::restore(pool, id, version_id, user.id).await?;
    Ok(HttpResponse::Ok().json(restored.ok_or(AppError::NotFound)?))
}
