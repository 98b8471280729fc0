use actix_session::Session;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};

use crate::auth::{csrf, session as auth_session, validate};
use crate::demo;
use crate::errors::{AppError, render};
use crate::handlers::run_pipeline;
use crate::handlers::selector::highlighted;
use crate::listing::selector::{self, Highlight, SelectorSession};
use crate::listing::{
    CompanySection, EditorState, ExportFile, Field, ListingError, PreviewDevice, SectionUpdate,
    Suggestion, TechSpec, TemplateData, mark_editable,
};
use crate::models::template::{self, NewTemplate, TemplateChanges};
use crate::state::AppState;
use crate::templates_structs::EditorPageTemplate;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorResponse {
    pub data: TemplateData,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    pub stale_selectors: Vec<Field>,
}

impl EditorResponse {
    fn new(state: EditorState, notice: Option<String>) -> Self {
        let stale_selectors = state.data.stale_selectors();
        EditorResponse { data: state.data, html: state.generated_html, notice, stale_selectors }
    }
}

#[derive(Deserialize)]
pub struct ParseRequest {
    pub html: String,
}

#[derive(Deserialize)]
pub struct DataRequest {
    pub data: TemplateData,
}

#[derive(Deserialize)]
pub struct UpdateRequest {
    pub data: TemplateData,
    pub update: SectionUpdate,
}

#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ImageAction {
    Add { url: String },
    Remove { id: String },
    Move { id: String, to: usize },
}

#[derive(Deserialize)]
pub struct ImageRequest {
    pub data: TemplateData,
    #[serde(flatten)]
    pub action: ImageAction,
}

#[derive(Deserialize)]
pub struct InlineRequest {
    pub data: TemplateData,
    pub field: Field,
    pub value: String,
}

fn attachment(file: ExportFile) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(file.filename)],
        })
        .body(file.content)
}

// --- JSON API ---

pub async fn parse(
    state: web::Data<AppState>,
    body: web::Json<ParseRequest>,
) -> Result<HttpResponse, AppError> {
    let app = state.clone();
    let html = body.into_inner().html;
    let (editor, notice) = run_pipeline(move || {
        EditorState::from_html(&html, &app.profile, app.config.max_html_bytes)
    })
    .await?;
    Ok(HttpResponse::Ok().json(EditorResponse::new(editor, notice)))
}

pub async fn generate(
    state: web::Data<AppState>,
    body: web::Json<DataRequest>,
) -> Result<HttpResponse, AppError> {
    let app = state.clone();
    let data = body.into_inner().data;
    let editor = run_pipeline(move || EditorState::new(data, &app.profile)).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "html": editor.generated_html })))
}

pub async fn update(
    state: web::Data<AppState>,
    body: web::Json<UpdateRequest>,
) -> Result<HttpResponse, AppError> {
    let app = state.clone();
    let UpdateRequest { data, update } = body.into_inner();
    let editor = run_pipeline(move || {
        let mut editor = EditorState::new(data, &app.profile)?;
        editor.apply(update, &app.profile)?;
        Ok(editor)
    })
    .await?;
    Ok(HttpResponse::Ok().json(EditorResponse::new(editor, None)))
}

pub async fn images(
    state: web::Data<AppState>,
    body: web::Json<ImageRequest>,
) -> Result<HttpResponse, AppError> {
    let app = state.clone();
    let ImageRequest { data, action } = body.into_inner();
    let editor = run_pipeline(move || {
        let mut editor = EditorState::new(data, &app.profile)?;
        let found = match action {
            ImageAction::Add { url } => editor.add_image(&url, &app.profile).map(|()| true)?,
            ImageAction::Remove { id } => editor.remove_image(&id, &app.profile)?,
            ImageAction::Move { id, to } => editor.move_image(&id, to, &app.profile)?,
        };
        if !found {
            return Err(ListingError::NoMatch("image id".to_string()));
        }
        Ok(editor)
    })
    .await?;
    Ok(HttpResponse::Ok().json(EditorResponse::new(editor, None)))
}

pub async fn inline(
    state: web::Data<AppState>,
    body: web::Json<InlineRequest>,
) -> Result<HttpResponse, AppError> {
    let app = state.clone();
    let InlineRequest { data, field, value } = body.into_inner();
    let editor = run_pipeline(move || {
        let mut editor = EditorState::new(data, &app.profile)?;
        editor.apply_inline(field, &value, &app.profile)?;
        Ok(editor)
    })
    .await?;
    Ok(HttpResponse::Ok().json(EditorResponse::new(editor, None)))
}

pub async fn export(
    state: web::Data<AppState>,
    body: web::Json<DataRequest>,
) -> Result<HttpResponse, AppError> {
    let app = state.clone();
    let data = body.into_inner().data;
    let file = run_pipeline(move || EditorState::new(data, &app.profile)?.export(&app.profile)).await?;
    Ok(attachment(file))
}

// --- editor page ---

/// The editor page form. Every submit carries the current data as JSON in
/// `state`, so the server keeps no editor state between requests.
#[derive(Deserialize)]
pub struct EditorForm {
    pub csrf_token: String,
    pub action: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub html: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub company_name: Option<String>,
    pub price: Option<String>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub specs: Option<String>,
    pub sections: Option<String>,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub image_id: String,
    pub position: Option<usize>,
    pub field: Option<Field>,
    #[serde(default)]
    pub selector: String,
    #[serde(default)]
    pub device: PreviewDevice,
    pub template_id: Option<i64>,
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize)]
pub struct EditorQuery {
    pub template: Option<i64>,
}

/// `label: value` per line.
pub fn specs_from_text(text: &str) -> Vec<TechSpec> {
    text.lines()
        .filter_map(|line| {
            let (label, value) = line.split_once(':').unwrap_or((line, ""));
            let (label, value) = (label.trim(), value.trim());
            (!label.is_empty() || !value.is_empty()).then(|| TechSpec {
                id: String::new(),
                label: label.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

pub fn specs_to_text(specs: &[TechSpec]) -> String {
    specs.iter().map(|s| format!("{}: {}", s.label, s.value)).collect::<Vec<_>>().join("\n")
}

/// `title | description` per line; icons and pinned selectors are kept by
/// position from `existing`.
pub fn sections_from_text(text: &str, existing: &[CompanySection]) -> Vec<CompanySection> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, line)| {
            let (title, description) = line.split_once('|').unwrap_or((line, ""));
            let previous = existing.get(i);
            CompanySection {
                id: previous.map(|s| s.id.clone()).unwrap_or_default(),
                title: title.trim().to_string(),
                description: description.trim().to_string(),
                svg: previous.map(|s| s.svg.clone()).unwrap_or_default(),
                css_selector: previous.and_then(|s| s.css_selector.clone()),
            }
        })
        .collect()
}

pub fn sections_to_text(sections: &[CompanySection]) -> String {
    sections
        .iter()
        .map(|s| format!("{} | {}", s.title, s.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The manual selector panel between requests: the field and selector the
/// user is working on, plus what the last step found.
#[derive(Debug, Default)]
struct SelectorPanel {
    field: Option<Field>,
    selector: String,
    suggestions: Vec<Suggestion>,
    highlight: Option<Highlight>,
}

impl SelectorPanel {
    fn from_form(form: &EditorForm) -> Self {
        SelectorPanel { field: form.field, selector: form.selector.trim().to_string(), ..Default::default() }
    }
}

struct PageState {
    editor: EditorState,
    notice: Option<String>,
    error: Option<String>,
    warning: Option<String>,
    /// The saved template being edited, as (id, name).
    saved: Option<(i64, String)>,
    selector: SelectorPanel,
}

impl PageState {
    fn new(editor: EditorState) -> Self {
        PageState {
            editor,
            notice: None,
            error: None,
            warning: None,
            saved: None,
            selector: SelectorPanel::default(),
        }
    }
}

async fn editor_page(
    req: &HttpRequest,
    app: &web::Data<AppState>,
    session: &Session,
    page: PageState,
    device: PreviewDevice,
) -> Result<HttpResponse, AppError> {
    let marked = {
        let app = app.clone();
        let data = page.editor.data.clone();
        let html = page.editor.generated_html.clone();
        run_pipeline(move || mark_editable(&html, &data, &app.profile)).await?
    };
    let username = auth_session::current_user(session)
        .map(|u| u.username)
        .unwrap_or_else(|| demo::demo_user().username);
    let state_json = serde_json::to_string(&page.editor.data).unwrap_or_default();
    let stale: Vec<&'static str> =
        page.editor.data.stale_selectors().into_iter().map(Field::label).collect();
    render(EditorPageTemplate {
        username,
        demo: app.is_demo(req),
        csrf_token: csrf::get_or_create_token(session),
        state_json,
        specs_text: specs_to_text(&page.editor.data.specs),
        sections_text: sections_to_text(&page.editor.data.company_sections),
        data: page.editor.data,
        generated_html: page.editor.generated_html,
        preview_html: marked,
        notice: page.notice,
        error: page.error,
        warning: page.warning,
        stale,
        fields: Field::ALL.to_vec(),
        device,
        device_width: device.css_width(),
        devices: vec![PreviewDevice::Desktop, PreviewDevice::Tablet, PreviewDevice::Mobile],
        max_html_bytes: app.config.max_html_bytes,
        template_id: page.saved.as_ref().map(|(id, _)| *id),
        template_name: page.saved.map(|(_, name)| name).unwrap_or_default(),
        selector_field: page.selector.field.map(Field::as_str).unwrap_or_default(),
        selector: page.selector.selector,
        suggestions: page.selector.suggestions,
        highlight: page.selector.highlight,
    })
}

pub async fn page(
    req: HttpRequest,
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<EditorQuery>,
) -> Result<HttpResponse, AppError> {
    let app = state.clone();
    let saved = match query.template {
        Some(id) => {
            let pool = state.pool(&req)?;
            let user = auth_session::require_user(&session)?;
            let found = template::find_for_user(pool, id, user.id).await?;
            Some(found.ok_or(AppError::NotFound)?)
        }
        None => None,
    };
    let html = saved.as_ref().map(|t| t.html.clone());
    let (editor, notice) = run_pipeline(move || match html {
        Some(html) => EditorState::from_html(&html, &app.profile, app.config.max_html_bytes),
        None => Ok((EditorState::new(TemplateData::default(), &app.profile)?, None)),
    })
    .await?;
    let mut page = PageState::new(editor);
    page.notice = notice.or_else(|| auth_session::take_flash(&session));
    page.saved = saved.map(|t| (t.id, t.name));
    editor_page(&req, &state, &session, page, PreviewDevice::default()).await
}

const PAGE_ACTIONS: &[&str] = &[
    "import",
    "update",
    "add_image",
    "remove_image",
    "move_image",
    "suggest_selectors",
    "preview_selector",
    "assign_selector",
    "reset",
    "preview",
    "export",
    "save",
];

fn form_data(state: &str) -> Result<TemplateData, AppError> {
    if state.trim().is_empty() {
        return Ok(TemplateData::default());
    }
    serde_json::from_str(state)
        .map_err(|e| AppError::Validation(vec![format!("Editor state could not be read: {e}")]))
}

/// Apply one editor page action. User-facing pipeline failures come back
/// as the error plus the unchanged editor state.
fn apply_form(
    form: EditorForm,
    data: TemplateData,
    app: &AppState,
) -> Result<Result<PageState, (ListingError, EditorState)>, ListingError> {
    let profile = &app.profile;
    let mut editor = EditorState::new(data, profile)?;
    let before = editor.clone();
    let mut notice = None;
    let mut warning = None;
    let mut panel = SelectorPanel::from_form(&form);
    let raw = editor.data.raw_html.clone().unwrap_or_default();

    let result = match form.action.as_str() {
        "import" => EditorState::from_html(&form.html, profile, app.config.max_html_bytes).map(|(e, n)| {
            notice = n.or_else(|| Some("Template imported".to_string()));
            editor = e;
        }),
        "update" => {
            let update = SectionUpdate {
                title: form.title,
                subtitle: form.subtitle,
                company_name: form.company_name,
                price: form.price,
                currency: form.currency,
                description: form.description,
                specs: form.specs.as_deref().map(specs_from_text),
                company_sections: form
                    .sections
                    .as_deref()
                    .map(|t| sections_from_text(t, &editor.data.company_sections)),
                ..Default::default()
            };
            editor.apply(update, profile)
        }
        "add_image" => editor.add_image(&form.image_url, profile),
        "remove_image" => editor.remove_image(&form.image_id, profile).map(|_| ()),
        "move_image" => editor
            .move_image(&form.image_id, form.position.unwrap_or(0), profile)
            .map(|_| ()),
        "suggest_selectors" => {
            let field = panel.field.unwrap_or(Field::Title);
            panel.suggestions = selector::suggest(&raw, field, profile);
            if panel.suggestions.is_empty() {
                notice = Some(format!("No suggestions for {} in the source", field.label()));
            }
            Ok(())
        }
        "preview_selector" => {
            let mut session = SelectorSession::new(&raw);
            session.choose(&panel.selector).map(|w| {
                warning = w;
                panel.highlight = highlighted(&session);
            })
        }
        "assign_selector" => {
            let field = panel.field.unwrap_or(Field::Title);
            let mut session = SelectorSession::new(&raw);
            session.choose(&panel.selector).and_then(|w| {
                warning = w;
                session.assign(field, &mut editor.data, profile)?;
                notice = Some(format!("{} now reads from {}", field.label(), panel.selector));
                panel = SelectorPanel { field: Some(field), ..Default::default() };
                editor.regenerate(profile)
            })
        }
        "reset" => EditorState::new(TemplateData::default(), profile).map(|e| editor = e),
        _ => Ok(()),
    };

    match result {
        Ok(()) => Ok(Ok(PageState { editor, notice, error: None, warning, saved: None, selector: panel })),
        Err(e) if e.is_user_facing() => Ok(Err((e, before))),
        Err(e) => Err(e),
    }
}

pub async fn submit(
    req: HttpRequest,
    state: web::Data<AppState>,
    session: Session,
    form: web::Form<EditorForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    let form = form.into_inner();
    if !PAGE_ACTIONS.contains(&form.action.as_str()) {
        return Err(AppError::Validation(vec![format!("Unknown action {:?}", form.action)]));
    }
    let data = form_data(&form.state)?;
    let device = form.device;
    let app = state.clone();

    if form.action == "export" {
        let file = run_pipeline(move || EditorState::new(data, &app.profile)?.export(&app.profile)).await?;
        return Ok(attachment(file));
    }
    if form.action == "save" {
        let page = save(&req, &state, &session, form, data).await?;
        return editor_page(&req, &state, &session, page, device).await;
    }

    let saved = form.template_id.map(|id| (id, form.name.clone()));
    let panel = SelectorPanel::from_form(&form);
    let mut page = match run_pipeline(move || apply_form(form, data, &app)).await? {
        Ok(page) => page,
        Err((e, editor)) => {
            log::info!("editor action rejected: {e}");
            let mut page = PageState::new(editor);
            page.error = Some(e.to_string());
            page.selector = panel;
            page
        }
    };
    page.saved = saved;
    editor_page(&req, &state, &session, page, device).await
}

/// Store the generated HTML as a new template, or as a new version of the
/// template being edited.
async fn save(
    req: &HttpRequest,
    state: &web::Data<AppState>,
    session: &Session,
    form: EditorForm,
    data: TemplateData,
) -> Result<PageState, AppError> {
    let pool = state.pool(req)?;
    let user = auth_session::require_user(session)?;
    let app = state.clone();
    let editor = run_pipeline(move || EditorState::new(data, &app.profile)).await?;

    let name = match form.name.trim() {
        "" if editor.data.title.trim().is_empty() => "Untitled template".to_string(),
        "" => editor.data.title.trim().to_string(),
        name => name.to_string(),
    };
    if let Some(error) = validate::validate_required(&name, "Name", 200) {
        return Err(AppError::Validation(vec![error]));
    }
    let saved = match form.template_id {
        Some(id) => {
            let changes = TemplateChanges {
                name: Some(name),
                html: Some(editor.generated_html.clone()),
                ..Default::default()
            };
            template::update(pool, id, user.id, &changes)
                .await?
                .ok_or(AppError::NotFound)?
        }
        None => {
            let new = NewTemplate { name, html: editor.generated_html.clone(), style_id: None };
            template::create(pool, user.id, &new).await?
        }
    };
    let mut page = PageState::new(editor);
    page.notice = Some(format!("Saved \"{}\"", saved.name));
    page.saved = Some((saved.id, saved.name));
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_lines_round_trip() {
        let specs = specs_from_text("Weight: 2 kg\n\nColor:Red\nNoValue");
        let pairs: Vec<(&str, &str)> = specs.iter().map(|s| (s.label.as_str(), s.value.as_str())).collect();
        assert_eq!(pairs, vec![("Weight", "2 kg"), ("Color", "Red"), ("NoValue", "")]);
        assert_eq!(specs_to_text(&specs[..2]), "Weight: 2 kg\nColor: Red");
    }

    #[test]
    fn section_lines_keep_icons_by_position() {
        let existing = vec![CompanySection {
            id: "section-1".into(),
            title: "Old".into(),
            description: "x".into(),
            svg: "<svg></svg>".into(),
            css_selector: None,
        }];
        let sections = sections_from_text("Shipping | Fast\nReturns | 30 days", &existing);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].svg, "<svg></svg>");
        assert_eq!(sections[0].id, "section-1");
        assert_eq!(sections[1].title, "Returns");
        assert!(sections[1].svg.is_empty());
    }

    #[test]
    fn image_actions_deserialize() {
        let req: ImageRequest =
            serde_json::from_str(r#"{"data":{},"action":"move","id":"image-2","to":0}"#).unwrap();
        assert!(matches!(req.action, ImageAction::Move { ref id, to: 0 } if id == "image-2"));
    }

    #[test]
    fn editor_form_decodes() {
        let form: EditorForm = serde_urlencoded::from_str(
            "csrf_token=t&action=assign_selector&field=companyName&selector=.shop&device=mobile&template_id=7",
        )
        .unwrap();
        assert_eq!(form.field, Some(Field::CompanyName));
        assert_eq!(form.device, PreviewDevice::Mobile);
        assert_eq!(form.template_id, Some(7));
        assert!(form.state.is_empty());
        assert!(PAGE_ACTIONS.contains(&form.action.as_str()));
    }

    fn page_form(action: &str, selector: &str) -> EditorForm {
        serde_urlencoded::from_str(&format!(
            "csrf_token=t&action={action}&field=subtitle&selector={}",
            selector.replace(' ', "+")
        ))
        .unwrap()
    }

    fn shop_data() -> TemplateData {
        crate::listing::parse_template(
            "<h1 class=\"product-title\">Drill</h1><h2 class=\"product-subtitle\">Cordless</h2>\
             <span class=\"promo\">Sale</span><span class=\"promo\">Later</span>",
        )
        .unwrap()
    }

    fn test_state() -> AppState {
        AppState::new(
            crate::config::AppConfig::default(),
            crate::listing::SelectorProfile::builtin().clone(),
            None,
        )
    }

    #[test]
    fn selector_preview_highlights_without_assigning() {
        let app = test_state();
        let data = shop_data();
        let page = apply_form(page_form("preview_selector", ".promo"), data.clone(), &app)
            .unwrap()
            .unwrap();
        let highlight = page.selector.highlight.expect("highlight");
        assert_eq!(highlight.outer_html, "<span class=\"promo\">Sale</span>");
        assert_eq!(highlight.match_count, 2);
        assert!(page.warning.is_some());
        assert_eq!(page.selector.selector, ".promo");
        assert_eq!(page.editor.data, data);
    }

    #[test]
    fn selector_suggestions_are_listed() {
        let app = test_state();
        let page = apply_form(page_form("suggest_selectors", ""), shop_data(), &app).unwrap().unwrap();
        assert_eq!(page.selector.suggestions[0].selector, ".product-subtitle");
        assert_eq!(page.selector.suggestions[0].sample, "Cordless");
        assert_eq!(page.selector.field, Some(Field::Subtitle));
    }

    #[test]
    fn assigning_a_selector_records_the_override() {
        let app = test_state();
        let page = apply_form(page_form("assign_selector", ".promo"), shop_data(), &app).unwrap().unwrap();
        assert_eq!(page.editor.data.subtitle, "Sale");
        assert_eq!(page.editor.data.selectors.get(Field::Subtitle), Some(".promo"));
        assert!(page.selector.highlight.is_none());
        assert!(page.notice.is_some());
    }

    #[test]
    fn unmatched_selector_keeps_the_editor_unchanged() {
        let app = test_state();
        let data = shop_data();
        match apply_form(page_form("preview_selector", ".missing"), data.clone(), &app).unwrap() {
            Err((ListingError::NoMatch(_), editor)) => assert_eq!(editor.data, data),
            other => panic!("expected no match, got {:?}", other.map(|p| p.selector)),
        }
    }

    #[test]
    fn empty_state_is_blank_data() {
        assert!(form_data("  ").unwrap().is_blank());
        assert!(matches!(form_data("{not json"), Err(AppError::Validation(_))));
    }
}
