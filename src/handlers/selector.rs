use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::handlers::run_pipeline;
use crate::listing::selector::{self, Highlight};
use crate::listing::{Field, SelectorSession, SelectorState, TemplateData, generate_template_with};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SuggestRequest {
    pub html: String,
    pub field: Field,
}

#[derive(Deserialize)]
pub struct ChooseRequest {
    pub html: String,
    pub selector: String,
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub html: String,
    pub selector: String,
    pub field: Field,
    #[serde(default)]
    pub data: TemplateData,
}

#[derive(Deserialize)]
pub struct AnnotateRequest {
    pub html: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickRequest {
    pub html: String,
    pub pick_id: String,
}

#[derive(Serialize)]
struct HighlightResponse {
    highlight: Option<Highlight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

#[derive(Serialize)]
struct PickResponse {
    selector: String,
    highlight: Option<Highlight>,
}

#[derive(Serialize)]
struct AssignResponse {
    data: TemplateData,
    html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

pub(crate) fn highlighted(session: &SelectorSession) -> Option<Highlight> {
    match session.state() {
        SelectorState::Highlighted(h) => Some(h.clone()),
        _ => None,
    }
}

/// POST /api/selector/suggest
pub async fn suggest(
    state: web::Data<AppState>,
    body: web::Json<SuggestRequest>,
) -> Result<HttpResponse, AppError> {
    let app = state.clone();
    let SuggestRequest { html, field } = body.into_inner();
    let suggestions = run_pipeline(move || Ok(selector::suggest(&html, field, &app.profile))).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "suggestions": suggestions })))
}

/// POST /api/selector/preview: highlight what a selector would pick.
pub async fn preview(body: web::Json<ChooseRequest>) -> Result<HttpResponse, AppError> {
    let ChooseRequest { html, selector } = body.into_inner();
    let response = run_pipeline(move || {
        let mut session = SelectorSession::new(&html);
        let warning = session.choose(&selector)?;
        Ok(HighlightResponse { highlight: highlighted(&session), warning })
    })
    .await?;
    Ok(HttpResponse::Ok().json(response))
}

/// POST /api/selector/assign: copy the selected content into a field and
/// return the regenerated listing.
pub async fn assign(
    state: web::Data<AppState>,
    body: web::Json<AssignRequest>,
) -> Result<HttpResponse, AppError> {
    let app = state.clone();
    let AssignRequest { html, selector, field, mut data } = body.into_inner();
    let response = run_pipeline(move || {
        let mut session = SelectorSession::new(&html);
        let warning = session.choose(&selector)?;
        session.assign(field, &mut data, &app.profile)?;
        if data.raw_html.is_none() {
            data.raw_html = Some(html);
        }
        let html = generate_template_with(&data, &app.profile)?;
        Ok(AssignResponse { data, html, warning })
    })
    .await?;
    Ok(HttpResponse::Ok().json(response))
}

/// POST /api/selector/annotate: tag elements for click-to-pick.
pub async fn annotate(body: web::Json<AnnotateRequest>) -> Result<HttpResponse, AppError> {
    let html = body.into_inner().html;
    let html = run_pipeline(move || selector::annotate_for_picking(&html)).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "html": html })))
}

/// POST /api/selector/pick: turn a clicked element into a selector.
pub async fn pick(body: web::Json<PickRequest>) -> Result<HttpResponse, AppError> {
    let PickRequest { html, pick_id } = body.into_inner();
    let response = run_pipeline(move || {
        let selector = selector::selector_for_pick(&html, &pick_id)?;
        let mut session = SelectorSession::new(&html);
        session.choose(&selector)?;
        Ok(PickResponse { selector, highlight: highlighted(&session) })
    })
    .await?;
    Ok(HttpResponse::Ok().json(response))
}
