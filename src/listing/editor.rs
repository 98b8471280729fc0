//! Editor orchestration: holds the template data together with the HTML
//! generated from it, and applies every user edit as "change data, then
//! regenerate".

use serde::{Deserialize, Serialize};

use super::data::{CompanySection, Field, FieldSelectors, Image, MAX_IMAGES, TechSpec, TemplateData, next_id};
use super::error::ListingError;
use super::generator::generate_template_with;
use super::parser::parse_or_blank;
use super::profile::SelectorProfile;

/// Fields that can be edited in place inside the preview.
pub const INLINE_FIELDS: [Field; 4] =
    [Field::Title, Field::Subtitle, Field::CompanyName, Field::Description];

/// A partial edit from one of the editor panels. Absent fields are left
/// as they are; selector overrides are merged per field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SectionUpdate {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub company_name: Option<String>,
    pub price: Option<String>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub images: Option<Vec<Image>>,
    pub specs: Option<Vec<TechSpec>>,
    pub company_sections: Option<Vec<CompanySection>>,
    pub tags: Option<Vec<String>>,
    #[serde(flatten)]
    pub selectors: FieldSelectors,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportFile {
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorState {
    pub data: TemplateData,
    pub generated_html: String,
}

impl EditorState {
    pub fn new(mut data: TemplateData, profile: &SelectorProfile) -> Result<Self, ListingError> {
        data.ensure_unique_ids();
        let generated_html = generate_template_with(&data, profile)?;
        Ok(EditorState { data, generated_html })
    }

    /// Start from imported HTML. A parse failure starts a blank editor and
    /// returns the reason as a notice.
    pub fn from_html(
        html: &str,
        profile: &SelectorProfile,
        max_bytes: usize,
    ) -> Result<(Self, Option<String>), ListingError> {
        let (data, notice) = parse_or_blank(html, profile, max_bytes);
        Ok((Self::new(data, profile)?, notice))
    }

    pub fn regenerate(&mut self, profile: &SelectorProfile) -> Result<(), ListingError> {
        self.generated_html = generate_template_with(&self.data, profile)?;
        Ok(())
    }

    pub fn apply(&mut self, update: SectionUpdate, profile: &SelectorProfile) -> Result<(), ListingError> {
        if let Some(images) = &update.images
            && images.len() > MAX_IMAGES
        {
            return Err(ListingError::ImageLimit(MAX_IMAGES));
        }
        let data = &mut self.data;
        let SectionUpdate {
            title,
            subtitle,
            company_name,
            price,
            currency,
            description,
            images,
            specs,
            company_sections,
            tags,
            selectors,
        } = update;
        if let Some(v) = title {
            data.title = v;
        }
        if let Some(v) = subtitle {
            data.subtitle = v;
        }
        if let Some(v) = company_name {
            data.company_name = v;
        }
        if let Some(v) = price {
            data.price = v;
        }
        if let Some(v) = currency {
            data.currency = v;
        }
        if let Some(v) = description {
            data.description = v;
        }
        if let Some(v) = images {
            data.images = v;
        }
        if let Some(v) = specs {
            data.specs = v;
        }
        if let Some(v) = company_sections {
            data.company_sections = v;
        }
        if let Some(v) = tags {
            data.tags = Some(v);
        }
        data.selectors.merge(&selectors);
        data.ensure_unique_ids();
        self.regenerate(profile)
    }

    pub fn add_image(&mut self, url: &str, profile: &SelectorProfile) -> Result<(), ListingError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ListingError::EmptyImageUrl);
        }
        if self.data.images.len() >= MAX_IMAGES {
            return Err(ListingError::ImageLimit(MAX_IMAGES));
        }
        let id = next_id("image", self.data.images.iter().map(|i| i.id.as_str()));
        self.data.images.push(Image { id, url: url.to_string() });
        self.regenerate(profile)
    }

    /// Returns false if no image has this id.
    pub fn remove_image(&mut self, id: &str, profile: &SelectorProfile) -> Result<bool, ListingError> {
        let before = self.data.images.len();
        self.data.images.retain(|i| i.id != id);
        if self.data.images.len() == before {
            return Ok(false);
        }
        self.regenerate(profile)?;
        Ok(true)
    }

    /// Move an image to position `to` (clamped to the end).
    pub fn move_image(&mut self, id: &str, to: usize, profile: &SelectorProfile) -> Result<bool, ListingError> {
        let Some(from) = self.data.images.iter().position(|i| i.id == id) else {
            return Ok(false);
        };
        let image = self.data.images.remove(from);
        let to = to.min(self.data.images.len());
        self.data.images.insert(to, image);
        self.regenerate(profile)?;
        Ok(true)
    }

    /// Write back an in-place edit made in the preview.
    pub fn apply_inline(&mut self, field: Field, value: &str, profile: &SelectorProfile) -> Result<(), ListingError> {
        let text = || value.split_whitespace().collect::<Vec<_>>().join(" ");
        match field {
            Field::Title => self.data.title = text(),
            Field::Subtitle => self.data.subtitle = text(),
            Field::CompanyName => self.data.company_name = text(),
            Field::Description => self.data.description = value.trim().to_string(),
            _ => return Err(ListingError::NotInlineEditable(field.as_str())),
        }
        self.regenerate(profile)
    }

    pub fn export(&self, profile: &SelectorProfile) -> Result<ExportFile, ListingError> {
        if self.data.is_blank() {
            return Err(ListingError::NothingToExport);
        }
        let content = generate_template_with(&self.data, profile)?;
        let filename = export_filename(&self.data.title);
        log::info!("exporting template as {filename} ({} bytes)", content.len());
        Ok(ExportFile { filename, content })
    }
}

/// Download name for a listing title, e.g. `"My Cool Product!"` →
/// `my-cool-product!_ebay-template.html`.
pub fn export_filename(title: &str) -> String {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '"' | '\'') && !c.is_control())
        .collect();
    let slug = cleaned.split_whitespace().collect::<Vec<_>>().join("-");
    if slug.is_empty() {
        "ebay-template.html".to_string()
    } else {
        format!("{slug}_ebay-template.html")
    }
}
