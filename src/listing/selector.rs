//! Manual section selection: the user points a CSS selector (typed, picked
//! from suggestions, or derived from a click) at an element of the source
//! HTML and assigns that element's content to a template field.
//!
//! A [`SelectorSession`] moves `Idle` → `Highlighted` → `Assigned`; a failed
//! step leaves the state where it was.

use std::sync::LazyLock;

use kuchiki::NodeRef;
use regex::Regex;
use serde::Serialize;

use super::data::{Field, TemplateData};
use super::dom;
use super::error::ListingError;
use super::parser::{self, currency_code, numeric_price};
use super::profile::SelectorProfile;

/// Attribute carrying the pick id in annotated HTML.
pub const PICK_ATTR: &str = "data-pick-id";

static IDENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?[_a-zA-Z][_a-zA-Z0-9-]*$").expect("IDENT_RE: hardcoded regex is valid")
});

const SAMPLE_CHARS: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub selector: String,
    pub outer_html: String,
    pub match_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SelectorState {
    Idle,
    Highlighted(Highlight),
    Assigned { field: Field, selector: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub selector: String,
    pub match_count: usize,
    pub sample: String,
}

pub struct SelectorSession {
    doc: NodeRef,
    state: SelectorState,
}

impl SelectorSession {
    pub fn new(html: &str) -> Self {
        SelectorSession {
            doc: dom::parse_document(&parser::sanitize(html)),
            state: SelectorState::Idle,
        }
    }

    pub fn state(&self) -> &SelectorState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = SelectorState::Idle;
    }

    /// Cascade selectors for `field` that match something in this document.
    pub fn suggest(&self, field: Field, profile: &SelectorProfile) -> Vec<Suggestion> {
        profile
            .cascade(field)
            .iter()
            .filter_map(|sel| {
                let found = dom::select_all(&self.doc, sel).ok()?;
                let first = found.first()?;
                Some(Suggestion {
                    selector: sel.clone(),
                    match_count: found.len(),
                    sample: dom::text(first).chars().take(SAMPLE_CHARS).collect(),
                })
            })
            .collect()
    }

    /// Highlight the first element matching `selector`. Returns a warning
    /// when more than one element matches.
    pub fn choose(&mut self, selector: &str) -> Result<Option<String>, ListingError> {
        let selector = selector.trim();
        if selector.is_empty() {
            return Err(ListingError::InvalidSelector(String::new()));
        }
        let found = dom::select_all(&self.doc, selector)?;
        let Some(first) = found.first() else {
            return Err(ListingError::NoMatch(selector.to_string()));
        };
        let warning = (found.len() > 1).then(|| {
            format!("{} elements match {selector}; the first one is used", found.len())
        });
        self.state = SelectorState::Highlighted(Highlight {
            selector: selector.to_string(),
            outer_html: dom::outer_html(first),
            match_count: found.len(),
        });
        Ok(warning)
    }

    /// Copy the highlighted element's content into `field` of `data` and
    /// record the selector as the field's override.
    pub fn assign(
        &mut self,
        field: Field,
        data: &mut TemplateData,
        profile: &SelectorProfile,
    ) -> Result<(), ListingError> {
        let SelectorState::Highlighted(highlight) = &self.state else {
            return Err(ListingError::NothingSelected);
        };
        let selector = highlight.selector.clone();
        let node = dom::select_first(&self.doc, &selector)
            .ok_or_else(|| ListingError::NoMatch(selector.clone()))?;

        match field {
            Field::Title => data.title = dom::text(&node),
            Field::Subtitle => data.subtitle = dom::text(&node),
            Field::CompanyName => data.company_name = dom::text(&node),
            Field::Price => {
                let text = dom::text(&node);
                let price = numeric_price(&text);
                if price.is_empty() {
                    return Err(ListingError::NoMatch(format!("{selector} (no price)")));
                }
                data.price = price;
                if let Some(code) = currency_code(&text) {
                    data.currency = code.to_string();
                } else if data.currency.trim().is_empty() {
                    data.currency = "EUR".to_string();
                }
            }
            Field::Currency => {
                let text = dom::text(&node);
                data.currency = currency_code(&text).map(str::to_string).unwrap_or(text);
            }
            Field::Description => data.description = dom::inner_html(&node).trim().to_string(),
            Field::Images => {
                let nodes = if dom::tag_name(&node).as_deref() == Some("img") {
                    vec![node.clone()]
                } else {
                    dom::select_all(&node, "img")?
                };
                let urls = parser::image_urls(&nodes);
                if urls.is_empty() {
                    return Err(ListingError::NoMatch(format!("{selector} (no images)")));
                }
                data.images = parser::to_images(urls);
            }
            Field::Specs => data.specs = parser::specs_in(&node, &profile.specs),
            Field::CompanySections => {
                data.company_sections = parser::sections_in(&node, &profile.company_sections)
            }
        }
        data.selectors.set(field, Some(selector.clone()));
        log::debug!("assigned {selector:?} to {}", field.as_str());
        self.state = SelectorState::Assigned { field, selector };
        Ok(())
    }
}

/// Candidate selectors for `field` in `html`, with match counts.
pub fn suggest(html: &str, field: Field, profile: &SelectorProfile) -> Vec<Suggestion> {
    SelectorSession::new(html).suggest(field, profile)
}

fn pickable(doc: &NodeRef) -> Vec<NodeRef> {
    dom::select_all(doc, "body *").unwrap_or_default()
}

/// Tag every element in the body with a `data-pick-id` in document order,
/// for click-to-pick in the preview.
pub fn annotate_for_picking(html: &str) -> Result<String, ListingError> {
    let doc = dom::parse_document(&parser::sanitize(html));
    for (i, node) in pickable(&doc).iter().enumerate() {
        dom::set_attr(node, PICK_ATTR, &format!("pick-{i}"));
    }
    dom::serialize_document(&doc)
}

/// A selector whose first match in `html` is the element that carried
/// `pick_id` in the annotated copy.
pub fn selector_for_pick(html: &str, pick_id: &str) -> Result<String, ListingError> {
    let doc = dom::parse_document(&parser::sanitize(html));
    let node = pick_id
        .strip_prefix("pick-")
        .and_then(|n| n.parse::<usize>().ok())
        .and_then(|n| pickable(&doc).into_iter().nth(n))
        .ok_or_else(|| ListingError::NoMatch(pick_id.to_string()))?;
    let selector = derive_selector(&doc, &node);
    match dom::select_first(&doc, &selector) {
        Some(found) if found == node => Ok(selector),
        _ => Err(ListingError::NoMatch(selector)),
    }
}

fn unique_id(doc: &NodeRef, node: &NodeRef) -> Option<String> {
    let id = dom::attr(node, "id")?;
    if !IDENT_RE.is_match(&id) {
        return None;
    }
    let sel = format!("#{id}");
    (dom::select_all(doc, &sel).ok()?.len() == 1).then_some(sel)
}

fn derive_selector(doc: &NodeRef, node: &NodeRef) -> String {
    let mut parts = Vec::new();
    let mut current = Some(node.clone());
    while let Some(n) = current {
        let Some(tag) = dom::tag_name(&n) else { break };
        if let Some(id) = unique_id(doc, &n) {
            parts.push(id);
            break;
        }
        if matches!(tag.as_str(), "body" | "html") {
            parts.push(tag);
            break;
        }
        let mut part = tag.clone();
        for class in dom::classes(&n).iter().filter(|c| IDENT_RE.is_match(c)) {
            part.push('.');
            part.push_str(class);
        }
        let position = n
            .preceding_siblings()
            .filter(|s| dom::tag_name(s).as_deref() == Some(tag.as_str()))
            .count()
            + 1;
        part.push_str(&format!(":nth-of-type({position})"));
        parts.push(part);
        current = n.parent();
    }
    parts.reverse();
    parts.join(" > ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> &'static SelectorProfile {
        SelectorProfile::builtin()
    }

    #[test]
    fn assign_text_records_override() {
        let mut session = SelectorSession::new("<div class=\"x\">Hello</div>");
        let mut data = TemplateData::default();
        assert_eq!(session.choose(".x").unwrap(), None);
        session.assign(Field::Title, &mut data, profile()).unwrap();
        assert_eq!(data.title, "Hello");
        assert_eq!(data.selectors.title.as_deref(), Some(".x"));
        assert_eq!(
            session.state(),
            &SelectorState::Assigned { field: Field::Title, selector: ".x".into() }
        );
    }

    #[test]
    fn invalid_selector_keeps_state() {
        let mut session = SelectorSession::new("<p>x</p>");
        assert!(matches!(session.choose("p[["), Err(ListingError::InvalidSelector(_))));
        assert_eq!(session.state(), &SelectorState::Idle);
        session.choose("p").unwrap();
        assert!(matches!(session.choose(".missing"), Err(ListingError::NoMatch(_))));
        assert!(matches!(session.state(), SelectorState::Highlighted(h) if h.selector == "p"));
    }

    #[test]
    fn several_matches_warn_and_use_first() {
        let mut session = SelectorSession::new("<p class=\"a\">one</p><p class=\"a\">two</p>");
        let warning = session.choose(".a").unwrap();
        assert!(warning.unwrap().contains("2 elements"));
        let SelectorState::Highlighted(h) = session.state() else { panic!("not highlighted") };
        assert_eq!(h.match_count, 2);
        assert_eq!(h.outer_html, "<p class=\"a\">one</p>");
    }

    #[test]
    fn assign_without_highlight_fails() {
        let mut session = SelectorSession::new("<p>x</p>");
        let mut data = TemplateData::default();
        assert!(matches!(
            session.assign(Field::Title, &mut data, profile()),
            Err(ListingError::NothingSelected)
        ));
        assert_eq!(data, TemplateData::default());
    }

    #[test]
    fn assign_price_and_images() {
        let html = "<span id=\"cost\">Now 24,95 £</span><div class=\"pics\"><img src=\"a.jpg\"><img src=\"b.jpg\"></div>";
        let mut session = SelectorSession::new(html);
        let mut data = TemplateData::default();
        session.choose("#cost").unwrap();
        session.assign(Field::Price, &mut data, profile()).unwrap();
        assert_eq!(data.price, "24,95");
        assert_eq!(data.currency, "GBP");

        session.choose(".pics").unwrap();
        session.assign(Field::Images, &mut data, profile()).unwrap();
        let urls: Vec<&str> = data.images.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["a.jpg", "b.jpg"]);
        assert_eq!(data.selectors.images.as_deref(), Some(".pics"));
    }

    #[test]
    fn assign_specs_from_container() {
        let html = "<table id=\"facts\"><tr><td>Size</td><td>XL</td></tr></table>";
        let mut session = SelectorSession::new(html);
        let mut data = TemplateData::default();
        session.choose("#facts").unwrap();
        session.assign(Field::Specs, &mut data, profile()).unwrap();
        assert_eq!(data.specs.len(), 1);
        assert_eq!(data.specs[0].label, "Size");
        assert_eq!(data.specs[0].value, "XL");
    }

    #[test]
    fn suggestions_only_list_matching_cascade_entries() {
        let html = "<h1>Shop</h1><h1>Other</h1><div class=\"item-title\">Lamp</div>";
        let found = suggest(html, Field::Title, profile());
        let pairs: Vec<(&str, usize)> =
            found.iter().map(|s| (s.selector.as_str(), s.match_count)).collect();
        assert_eq!(pairs, vec![(".item-title", 1), ("h1", 2)]);
        assert_eq!(found[0].sample, "Lamp");
    }

    #[test]
    fn picked_elements_resolve_to_themselves() {
        let html = "<body><div class=\"wrap\"><p>a</p><p class=\"b c\">b</p></div>\
                    <section id=\"info\"><span>x</span></section><div class=\"wrap\"><p>c</p></div></body>";
        let annotated = annotate_for_picking(html).unwrap();
        assert!(annotated.contains("data-pick-id=\"pick-0\""));
        let doc = dom::parse_document(html);
        let elements = pickable(&doc);
        for (i, element) in elements.iter().enumerate() {
            let selector = selector_for_pick(html, &format!("pick-{i}")).unwrap();
            assert_eq!(&dom::select_first(&doc, &selector).unwrap(), element, "{selector}");
        }
        assert_eq!(selector_for_pick(html, "pick-3").unwrap(), "#info");
        assert_eq!(selector_for_pick(html, "pick-4").unwrap(), "#info > span:nth-of-type(1)");
    }

    #[test]
    fn unknown_pick_id_is_rejected() {
        assert!(matches!(selector_for_pick("<p>x</p>", "pick-9"), Err(ListingError::NoMatch(_))));
        assert!(matches!(selector_for_pick("<p>x</p>", "bogus"), Err(ListingError::NoMatch(_))));
    }
}
