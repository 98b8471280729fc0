use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::dom;

/// Maximum number of images a listing may carry.
pub const MAX_IMAGES: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechSpec {
    pub id: String,
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySection {
    pub id: String,
    pub title: String,
    pub description: String,
    pub svg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css_selector: Option<String>,
}

/// An editable template field, as addressed by the manual selector tabs
/// and by selector overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Title,
    Subtitle,
    CompanyName,
    Price,
    Currency,
    Description,
    Images,
    Specs,
    CompanySections,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Title,
        Field::Subtitle,
        Field::CompanyName,
        Field::Price,
        Field::Currency,
        Field::Description,
        Field::Images,
        Field::Specs,
        Field::CompanySections,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Subtitle => "subtitle",
            Field::CompanyName => "companyName",
            Field::Price => "price",
            Field::Currency => "currency",
            Field::Description => "description",
            Field::Images => "images",
            Field::Specs => "specs",
            Field::CompanySections => "companySections",
        }
    }

    pub fn parse(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.as_str() == name)
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::Title => "Title",
            Field::Subtitle => "Subtitle",
            Field::CompanyName => "Company name",
            Field::Price => "Price",
            Field::Currency => "Currency",
            Field::Description => "Description",
            Field::Images => "Images",
            Field::Specs => "Specifications",
            Field::CompanySections => "Company info",
        }
    }
}

/// Per-field CSS selector overrides recorded by the manual selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSelectors {
    #[serde(rename = "titleSelector", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "subtitleSelector", default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(rename = "companyNameSelector", default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(rename = "priceSelector", default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(rename = "currencySelector", default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(rename = "descriptionSelector", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "imagesSelector", default, skip_serializing_if = "Option::is_none")]
    pub images: Option<String>,
    #[serde(rename = "specsSelector", default, skip_serializing_if = "Option::is_none")]
    pub specs: Option<String>,
    #[serde(rename = "companySectionsSelector", default, skip_serializing_if = "Option::is_none")]
    pub company_sections: Option<String>,
}

impl FieldSelectors {
    pub fn get(&self, field: Field) -> Option<&str> {
        let slot = match field {
            Field::Title => &self.title,
            Field::Subtitle => &self.subtitle,
            Field::CompanyName => &self.company_name,
            Field::Price => &self.price,
            Field::Currency => &self.currency,
            Field::Description => &self.description,
            Field::Images => &self.images,
            Field::Specs => &self.specs,
            Field::CompanySections => &self.company_sections,
        };
        slot.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn set(&mut self, field: Field, selector: Option<String>) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Subtitle => &mut self.subtitle,
            Field::CompanyName => &mut self.company_name,
            Field::Price => &mut self.price,
            Field::Currency => &mut self.currency,
            Field::Description => &mut self.description,
            Field::Images => &mut self.images,
            Field::Specs => &mut self.specs,
            Field::CompanySections => &mut self.company_sections,
        };
        *slot = selector;
    }

    /// Overwrite every slot that is set in `other`.
    pub fn merge(&mut self, other: &FieldSelectors) {
        for field in Field::ALL {
            if let Some(sel) = other.get(field) {
                self.set(field, Some(sel.to_string()));
            }
        }
    }
}

/// The structured, editable representation of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateData {
    pub title: String,
    pub company_name: String,
    pub subtitle: String,
    pub price: String,
    pub currency: String,
    pub description: String,
    #[serde(flatten)]
    pub selectors: FieldSelectors,
    pub images: Vec<Image>,
    pub specs: Vec<TechSpec>,
    pub company_sections: Vec<CompanySection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_html: Option<String>,
}

impl TemplateData {
    /// True when there is neither source markup nor any field content.
    pub fn is_blank(&self) -> bool {
        self.raw_html.as_deref().is_none_or(|h| h.trim().is_empty())
            && self.title.trim().is_empty()
            && self.subtitle.trim().is_empty()
            && self.company_name.trim().is_empty()
            && self.price.trim().is_empty()
            && self.description.trim().is_empty()
            && self.images.is_empty()
            && self.specs.is_empty()
            && self.company_sections.is_empty()
    }

    /// Reassign ids that are empty or repeated within their list.
    pub fn ensure_unique_ids(&mut self) {
        let ids = repair_ids(self.images.iter().map(|i| i.id.as_str()), "image");
        for (img, id) in self.images.iter_mut().zip(ids) {
            img.id = id;
        }
        let ids = repair_ids(self.specs.iter().map(|s| s.id.as_str()), "spec");
        for (spec, id) in self.specs.iter_mut().zip(ids) {
            spec.id = id;
        }
        let ids = repair_ids(self.company_sections.iter().map(|s| s.id.as_str()), "section");
        for (section, id) in self.company_sections.iter_mut().zip(ids) {
            section.id = id;
        }
    }

    /// Fields whose saved selector no longer resolves against `raw_html`.
    /// Without raw markup every override is stale.
    pub fn stale_selectors(&self) -> Vec<Field> {
        let overridden: Vec<(Field, &str)> = Field::ALL
            .into_iter()
            .filter_map(|f| self.selectors.get(f).map(|s| (f, s)))
            .collect();
        if overridden.is_empty() {
            return Vec::new();
        }
        let Some(raw) = self.raw_html.as_deref() else {
            return overridden.into_iter().map(|(f, _)| f).collect();
        };
        let doc = dom::parse_document(raw);
        overridden
            .into_iter()
            .filter(|(_, sel)| dom::select_first(&doc, sel).is_none())
            .map(|(f, _)| f)
            .collect()
    }
}

/// Next free `prefix-N` id given the ids already in use.
pub fn next_id<'a>(prefix: &str, existing: impl IntoIterator<Item = &'a str>) -> String {
    let used: HashSet<usize> = existing
        .into_iter()
        .filter_map(|id| id.strip_prefix(prefix)?.strip_prefix('-')?.parse::<usize>().ok())
        .collect();
    let n = match used.iter().max() {
        None => 1,
        // Client-supplied ids may sit at usize::MAX; take the lowest gap instead.
        Some(max) => max
            .checked_add(1)
            .unwrap_or_else(|| (1..).find(|n| !used.contains(n)).unwrap_or(1)),
    };
    format!("{prefix}-{n}")
}

fn repair_ids<'a>(ids: impl Iterator<Item = &'a str>, prefix: &str) -> Vec<String> {
    let ids: Vec<&str> = ids.collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(ids.len());
    for id in &ids {
        if id.is_empty() || seen.contains(*id) {
            let fresh = next_id(prefix, ids.iter().copied().chain(seen.iter().map(|s| s.as_str())));
            seen.insert(fresh.clone());
            out.push(fresh);
        } else {
            seen.insert(id.to_string());
            out.push(id.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_serialize_with_field_suffix() {
        let mut data = TemplateData::default();
        data.selectors.title = Some(".x".into());
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["titleSelector"], ".x");
        assert!(json.get("priceSelector").is_none());
        let back: TemplateData = serde_json::from_value(json).unwrap();
        assert_eq!(back.selectors.title.as_deref(), Some(".x"));
    }

    #[test]
    fn duplicate_and_empty_ids_are_reassigned() {
        let mut data = TemplateData {
            images: vec![
                Image { id: "image-1".into(), url: "a.jpg".into() },
                Image { id: "image-1".into(), url: "b.jpg".into() },
                Image { id: String::new(), url: "c.jpg".into() },
            ],
            ..Default::default()
        };
        data.ensure_unique_ids();
        let ids: HashSet<&str> = data.images.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(data.images[0].id, "image-1");
    }

    #[test]
    fn next_id_skips_foreign_ids() {
        assert_eq!(next_id("spec", ["spec-2", "x-9", "spec-abc"]), "spec-3");
        assert_eq!(next_id("spec", []), "spec-1");
    }

    #[test]
    fn next_id_past_the_largest_suffix_takes_a_gap() {
        let top = format!("image-{}", usize::MAX);
        assert_eq!(next_id("image", [top.as_str(), "image-1"]), "image-2");

        let mut data = TemplateData {
            images: vec![
                Image { id: top.clone(), url: "a.jpg".into() },
                Image { id: top.clone(), url: "b.jpg".into() },
            ],
            ..Default::default()
        };
        data.ensure_unique_ids();
        assert_eq!(data.images[0].id, top);
        assert_eq!(data.images[1].id, "image-1");
    }

    #[test]
    fn stale_selector_is_reported() {
        let mut data = TemplateData {
            raw_html: Some("<div class=\"x\">Hi</div>".into()),
            ..Default::default()
        };
        data.selectors.title = Some(".x".into());
        data.selectors.price = Some(".gone".into());
        assert_eq!(data.stale_selectors(), vec![Field::Price]);
    }

    #[test]
    fn blank_detection() {
        assert!(TemplateData::default().is_blank());
        let data = TemplateData { title: "T".into(), ..Default::default() };
        assert!(!data.is_blank());
    }
}
