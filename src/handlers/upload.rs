use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use futures_util::TryStreamExt;
use serde::Serialize;

use crate::errors::AppError;
use crate::listing::parser;
use crate::state::AppState;

const FILE_FIELD: &str = "file";
const ALLOWED_EXTENSIONS: &[&str] = &[".html", ".htm"];

#[derive(Serialize)]
struct UploadResponse {
    filename: String,
    content: String,
}

pub fn has_html_extension(filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// POST /api/upload/html: read the `file` field of a multipart form and
/// return its text.
pub async fn upload_html(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let max = state.config.max_upload_bytes;
    let upload_error = |e: actix_multipart::MultipartError| AppError::Upload(e.to_string());

    while let Some(mut field) = payload.try_next().await.map_err(upload_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_string();
        if !has_html_extension(&filename) {
            return Err(AppError::Upload(format!("{filename:?} is not an .html or .htm file")));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(upload_error)? {
            if bytes.len() + chunk.len() > max {
                return Err(AppError::Upload(format!("File exceeds the {max} byte limit")));
            }
            bytes.extend_from_slice(&chunk);
        }
        let text = String::from_utf8(bytes)
            .map_err(|_| AppError::Upload("File is not UTF-8 text".to_string()))?;
        log::info!("uploaded {filename} ({} bytes)", text.len());
        return Ok(HttpResponse::Ok().json(UploadResponse {
            filename,
            content: parser::sanitize(&text),
        }));
    }
    Err(AppError::Upload(format!("Missing form field {FILE_FIELD:?}")))
}
