use askama::Template;
use serde::{Deserialize, Serialize};

use super::data::TemplateData;
use super::dom;
use super::editor::INLINE_FIELDS;
use super::error::ListingError;
use super::generator;
use super::profile::SelectorProfile;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewDevice {
    #[default]
    Desktop,
    Tablet,
    Mobile,
}

impl PreviewDevice {
    /// Frame width in CSS pixels; `None` is full width.
    pub fn width(self) -> Option<u32> {
        match self {
            PreviewDevice::Desktop => None,
            PreviewDevice::Tablet => Some(768),
            PreviewDevice::Mobile => Some(375),
        }
    }

    pub fn css_width(self) -> String {
        self.width().map_or_else(|| "100%".to_string(), |w| format!("{w}px"))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PreviewDevice::Desktop => "desktop",
            PreviewDevice::Tablet => "tablet",
            PreviewDevice::Mobile => "mobile",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PreviewDevice::Desktop => "Desktop",
            PreviewDevice::Tablet => "Tablet (768px)",
            PreviewDevice::Mobile => "Mobile (375px)",
        }
    }
}

#[derive(Template)]
#[template(path = "listing/preview.html")]
struct PreviewTemplate<'a> {
    html: &'a str,
    width: String,
    device: &'static str,
    label: &'static str,
}

/// Wrap generated listing HTML in a page that shows it inside a
/// script-less sandboxed frame at the device's width.
pub fn render_preview_page(html: &str, device: PreviewDevice) -> Result<String, ListingError> {
    let page = PreviewTemplate {
        html,
        width: device.css_width(),
        device: device.as_str(),
        label: device.label(),
    };
    Ok(page.render()?)
}

/// Flag the nodes of the inline-editable fields with `contenteditable` and
/// `data-field` so the editor page can write changes back.
pub fn mark_editable(
    html: &str,
    data: &TemplateData,
    profile: &SelectorProfile,
) -> Result<String, ListingError> {
    let doc = dom::parse_document(html);
    for field in INLINE_FIELDS {
        if let Some(node) = generator::target(&doc, data, profile, field) {
            dom::set_attr(&node, "contenteditable", "true");
            dom::set_attr(&node, "data-field", field.as_str());
        }
    }
    dom::serialize_document(&doc)
}
