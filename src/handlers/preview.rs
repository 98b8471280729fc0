use actix_web::{HttpResponse, web};
use serde::Deserialize;

use crate::errors::AppError;
use crate::handlers::run_pipeline;
use crate::listing::{PreviewDevice, TemplateData, mark_editable, render_preview_page};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct PreviewRequest {
    pub html: String,
    #[serde(default)]
    pub device: PreviewDevice,
    /// When set, the inline-editable fields are flagged in the preview.
    #[serde(default)]
    pub editable: bool,
    #[serde(default)]
    pub data: TemplateData,
}

/// POST /api/preview: the listing framed at the requested device width.
pub async fn preview(
    state: web::Data<AppState>,
    body: web::Json<PreviewRequest>,
) -> Result<HttpResponse, AppError> {
    let app = state.clone();
    let PreviewRequest { html, device, editable, data } = body.into_inner();
    let page = run_pipeline(move || {
        let html = if editable { mark_editable(&html, &data, &app.profile)? } else { html };
        render_preview_page(&html, device)
    })
    .await?;
    Ok(HttpResponse::Ok().content_type("text/html; charset=utf-8").body(page))
}
