//! Saved templates and their append-only version history.
//!
//! Every write that changes a template appends a version inside the same
//! transaction. Version numbers are assigned while the template row is
//! locked, so concurrent saves of one template never collide. Lookups are
//! scoped to the owner: another user's template behaves as missing.

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionType {
    Create,
    Update,
    Autosave,
}

impl VersionType {
    pub fn as_str(self) -> &'static str {
        match self {
            VersionType::Create => "create",
            VersionType::Update => "update",
            VersionType::Autosave => "autosave",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub html: String,
    pub style_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// List view row, without the HTML body.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: i64,
    pub name: String,
    pub style_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TemplateVersion {
    pub id: i64,
    pub template_id: i64,
    pub version_number: i32,
    pub version_type: String,
    pub name: String,
    pub html: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTemplate {
    pub name: String,
    pub html: String,
    #[serde(default)]
    pub style_id: Option<i64>,
}

/// Changes to a saved template; absent fields are kept.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateChanges {
    pub name: Option<String>,
    pub html: Option<String>,
    pub style_id: Option<i64>,
    /// `update` (default) or `autosave`.
    pub version_type: Option<VersionType>,
}

const TEMPLATE_COLUMNS: &str = "id, user_id, name, html, style_id, \
     created_at::TEXT AS created_at, updated_at::TEXT AS updated_at";

const VERSION_COLUMNS: &str = "id, template_id, version_number, version_type, name, html, \
     created_at::TEXT AS created_at";

pub async fn list_for_user(pool: &PgPool, user_id: i64) -> Result<Vec<TemplateSummary>, AppError> {
    let rows = sqlx::query_as::<_, TemplateSummary>(
        "SELECT id, name, style_id, created_at::TEXT AS created_at, updated_at::TEXT AS updated_at \
         FROM templates WHERE user_id = $1 ORDER BY updated_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_for_user(pool: &PgPool, id: i64, user_id: i64) -> Result<Option<Template>, AppError> {
    let row = sqlx::query_as::<_, Template>(&format!(
        "SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Insert a template and its first (`create`) version.
pub async fn create(pool: &PgPool, user_id: i64, new: &NewTemplate) -> Result<Template, AppError> {
    let mut tx = pool.begin().await?;
    let template = sqlx::query_as::<_, Template>(&format!(
        "INSERT INTO templates (user_id, name, html, style_id) VALUES ($1, $2, $3, $4) \
         RETURNING {TEMPLATE_COLUMNS}"
    ))
    .bind(user_id)
    .bind(new.name.trim())
    .bind(&new.html)
    .bind(new.style_id)
    .fetch_one(&mut *tx)
    .await?;
    append_version(&mut tx, &template, VersionType::Create).await?;
    tx.commit().await?;
    log::info!("template {} created by user {user_id}", template.id);
    Ok(template)
}

/// Apply `changes` and append a version. `None` if the template does not
/// exist or belongs to someone else.
pub async fn update(
    pool: &PgPool,
    id: i64,
    user_id: i64,
    changes: &TemplateChanges,
) -> Result<Option<Template>, AppError> {
    let version_type = match changes.version_type {
        Some(VersionType::Autosave) => VersionType::Autosave,
        _ => VersionType::Update,
    };
    let mut tx = pool.begin().await?;
    if lock_owned(&mut tx, id, user_id).await?.is_none() {
        return Ok(None);
    }
    let template = sqlx::query_as::<_, Template>(&format!(
        "UPDATE templates SET \
             name = COALESCE($3, name), \
             html = COALESCE($4, html), \
             style_id = COALESCE($5, style_id), \
             updated_at = now() \
         WHERE id = $1 AND user_id = $2 \
         RETURNING {TEMPLATE_COLUMNS}"
    ))
    .bind(id)
    .bind(user_id)
    .bind(changes.name.as_deref().map(str::trim))
    .bind(changes.html.as_deref())
    .bind(changes.style_id)
    .fetch_one(&mut *tx)
    .await?;
    append_version(&mut tx, &template, version_type).await?;
    tx.commit().await?;
    Ok(Some(template))
}

/// Returns false if nothing was deleted.
pub async fn delete(pool: &PgPool, id: i64, user_id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM templates WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Versions newest first, or `None` when the template is not the user's.
pub async fn list_versions(
    pool: &PgPool,
    id: i64,
    user_id: i64,
) -> Result<Option<Vec<TemplateVersion>>, AppError> {
    if find_for_user(pool, id, user_id).await?.is_none() {
        return Ok(None);
    }
    let rows = sqlx::query_as::<_, TemplateVersion>(&format!(
        "SELECT {VERSION_COLUMNS} FROM template_versions \
         WHERE template_id = $1 ORDER BY version_number DESC"
    ))
    .bind(id)
    .fetch_all(pool)
    .await?;
    Ok(Some(rows))
}

/// Copy a version's name and HTML back onto the template, recorded as a
/// new `update` version.
pub async fn restore(
    pool: &PgPool,
    id: i64,
    version_id: i64,
    user_id: i64,
) -> Result<Option<Template>, AppError> {
    let mut tx = pool.begin().await?;
    if lock_owned(&mut tx, id, user_id).await?.is_none() {
        return Ok(None);
    }
    let Some(version) = sqlx::query_as::<_, TemplateVersion>(&format!(
        "SELECT {VERSION_COLUMNS} FROM template_versions WHERE id = $1 AND template_id = $2"
    ))
    .bind(version_id)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    else {
        return Ok(None);
    };
    let template = sqlx::query_as::<_, Template>(&format!(
        "UPDATE templates SET name = $2, html = $3, updated_at = now() WHERE id = $1 \
         RETURNING {TEMPLATE_COLUMNS}"
    ))
    .bind(id)
    .bind(&version.name)
    .bind(&version.html)
    .fetch_one(&mut *tx)
    .await?;
    append_version(&mut tx, &template, VersionType::Update).await?;
    tx.commit().await?;
    log::info!("template {id} restored to version {}", version.version_number);
    Ok(Some(template))
}

async fn lock_owned(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    user_id: i64,
) -> Result<Option<i64>, AppError> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM templates WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;
    Ok(row.map(|r| r.0))
}

async fn append_version(
    tx: &mut Transaction<'_, Postgres>,
    template: &Template,
    version_type: VersionType,
) -> Result<i32, AppError> {
    let (number,): (i32,) = sqlx::query_as(
        "INSERT INTO template_versions (template_id, version_number, version_type, name, html) \
         SELECT $1, COALESCE(MAX(version_number), 0) + 1, $2, $3, $4 \
         FROM template_versions WHERE template_id = $1 \
         RETURNING version_number",
    )
    .bind(template.id)
    .bind(version_type.as_str())
    .bind(&template.name)
    .bind(&template.html)
    .fetch_one(&mut **tx)
    .await?;
    log::debug!("template {} version {number} ({})", template.id, version_type.as_str());
    Ok(number)
}
