//! The field-to-selector configuration driving the parser and generator.
//!
//! Every cascade is an ordered list of CSS selectors tried until one
//! matches. The built-in profile is embedded from `default_profile.json`;
//! deployments may load their own file with the same shape.

use std::path::Path;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use super::data::Field;
use super::error::ListingError;

pub const PROFILE_VERSION: u32 = 1;

const DEFAULT_PROFILE: &str = include_str!("default_profile.json");

static BUILTIN: LazyLock<SelectorProfile> = LazyLock::new(|| {
    serde_json::from_str(DEFAULT_PROFILE).expect("default_profile.json: embedded profile is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStrategies {
    pub radio_gallery: Vec<String>,
    pub slider: Vec<String>,
    pub main_image: Vec<String>,
    pub gallery: Vec<String>,
    pub photo_extensions: Vec<String>,
    pub photo_hosts: Vec<String>,
    pub exclude_keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecSelectors {
    pub containers: Vec<String>,
    pub items: Vec<String>,
    pub labels: Vec<String>,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSelectors {
    pub containers: Vec<String>,
    pub items: Vec<String>,
    pub icons: Vec<String>,
    pub titles: Vec<String>,
    pub descriptions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorProfile {
    pub version: u32,
    pub title: Vec<String>,
    pub subtitle: Vec<String>,
    pub company_name: Vec<String>,
    pub price: Vec<String>,
    pub currency: Vec<String>,
    pub description: Vec<String>,
    pub description_headings: Vec<String>,
    pub images: ImageStrategies,
    pub gallery_containers: Vec<String>,
    pub layout_class_prefixes: Vec<String>,
    pub specs: SpecSelectors,
    pub company_sections: SectionSelectors,
}

impl SelectorProfile {
    pub fn builtin() -> &'static SelectorProfile {
        &BUILTIN
    }

    pub fn from_json(json: &str) -> Result<Self, ListingError> {
        let profile: SelectorProfile =
            serde_json::from_str(json).map_err(|e| ListingError::Profile(e.to_string()))?;
        if profile.version != PROFILE_VERSION {
            return Err(ListingError::Profile(format!(
                "unsupported profile version {} (expected {PROFILE_VERSION})",
                profile.version
            )));
        }
        Ok(profile)
    }

    pub fn from_path(path: &Path) -> Result<Self, ListingError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ListingError::Profile(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// The cascade used to locate a field's node (or container, for lists).
    pub fn cascade(&self, field: Field) -> &[String] {
        match field {
            Field::Title => &self.title,
            Field::Subtitle => &self.subtitle,
            Field::CompanyName => &self.company_name,
            Field::Price => &self.price,
            Field::Currency => &self.currency,
            Field::Description => &self.description,
            Field::Images => &self.gallery_containers,
            Field::Specs => &self.specs.containers,
            Field::CompanySections => &self.company_sections.containers,
        }
    }
}
