use askama::Template;

use crate::listing::selector::Highlight;
use crate::listing::{Field, PreviewDevice, Suggestion, TemplateData};
use crate::models::template::TemplateSummary;

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub flash: Option<String>,
    pub csrf_token: String,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub errors: Vec<String>,
    pub username: String,
    pub csrf_token: String,
}

/// The editor page. `state_json` is the current data, carried by every
/// form on the page.
#[derive(Template)]
#[template(path = "editor.html")]
pub struct EditorPageTemplate {
    pub username: String,
    pub demo: bool,
    pub csrf_token: String,
    pub state_json: String,
    pub specs_text: String,
    pub sections_text: String,
    pub data: TemplateData,
    pub generated_html: String,
    /// `generated_html` with the inline-editable fields flagged.
    pub preview_html: String,
    pub notice: Option<String>,
    pub error: Option<String>,
    pub warning: Option<String>,
    pub stale: Vec<&'static str>,
    pub fields: Vec<Field>,
    pub device: PreviewDevice,
    pub device_width: String,
    pub devices: Vec<PreviewDevice>,
    pub max_html_bytes: usize,
    pub template_id: Option<i64>,
    pub template_name: String,
    /// Field chosen in the selector panel, empty before the first use.
    pub selector_field: &'static str,
    pub selector: String,
    pub suggestions: Vec<Suggestion>,
    pub highlight: Option<Highlight>,
}

#[derive(Template)]
#[template(path = "templates.html")]
pub struct TemplateListTemplate {
    pub username: String,
    pub demo: bool,
    pub csrf_token: String,
    pub templates: Vec<TemplateSummary>,
}
