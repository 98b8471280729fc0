//! Extracts [`TemplateData`] from arbitrary listing HTML.
//!
//! Every field walks its selector cascade from the [`SelectorProfile`] and
//! takes the first match. A field that matches nothing stays empty; only
//! oversized or non-UTF-8 input is an error.

use std::collections::HashSet;
use std::sync::LazyLock;

use kuchiki::NodeRef;
use regex::Regex;

use super::data::{CompanySection, Image, MAX_IMAGES, TechSpec, TemplateData};
use super::dom;
use super::error::ListingError;
use super::profile::{SectionSelectors, SelectorProfile, SpecSelectors};

/// Default input cap applied before DOM construction.
pub const DEFAULT_MAX_HTML_BYTES: usize = 5 * 1024 * 1024;

static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d(?:[\d.,'\u{a0} ]*\d)?").expect("PRICE_RE: hardcoded regex is valid")
});

/// Currency symbols and codes recognised in price text, longest first.
const CURRENCIES: &[(&str, &str)] = &[
    ("EUR", "€"),
    ("USD", "$"),
    ("GBP", "£"),
    ("CHF", "CHF"),
    ("JPY", "¥"),
    ("PLN", "zł"),
];

pub fn parse_template(html: &str) -> Result<TemplateData, ListingError> {
    parse_template_with(html, SelectorProfile::builtin(), DEFAULT_MAX_HTML_BYTES)
}

pub fn parse_template_bytes(bytes: &[u8], max_bytes: usize) -> Result<TemplateData, ListingError> {
    if bytes.len() > max_bytes {
        return Err(ListingError::InputTooLarge { size: bytes.len(), max: max_bytes });
    }
    let html = std::str::from_utf8(bytes).map_err(|_| ListingError::NotUtf8)?;
    parse_template_with(html, SelectorProfile::builtin(), max_bytes)
}

/// Parse, falling back to blank data. The error message, if any, is
/// returned for the user-facing notice.
pub fn parse_or_blank(
    html: &str,
    profile: &SelectorProfile,
    max_bytes: usize,
) -> (TemplateData, Option<String>) {
    match parse_template_with(html, profile, max_bytes) {
        Ok(data) => (data, None),
        Err(e) => {
            log::warn!("template parse failed, starting blank: {e}");
            (TemplateData::default(), Some(e.to_string()))
        }
    }
}

pub fn parse_template_with(
    html: &str,
    profile: &SelectorProfile,
    max_bytes: usize,
) -> Result<TemplateData, ListingError> {
    if html.len() > max_bytes {
        return Err(ListingError::InputTooLarge { size: html.len(), max: max_bytes });
    }
    let clean = sanitize(html);
    let doc = dom::parse_document(&clean);

    let (price, currency) = extract_price(&doc, profile);
    let mut data = TemplateData {
        title: first_text(&doc, &profile.title),
        subtitle: first_text(&doc, &profile.subtitle),
        company_name: first_text(&doc, &profile.company_name),
        price,
        currency,
        description: find_description(&doc, profile)
            .map(|n| dom::inner_html(&n).trim().to_string())
            .unwrap_or_default(),
        images: extract_images(&doc, profile),
        specs: find_container(&doc, &profile.specs.containers)
            .map(|c| specs_in(&c, &profile.specs))
            .unwrap_or_default(),
        company_sections: find_container(&doc, &profile.company_sections.containers)
            .map(|c| sections_in(&c, &profile.company_sections))
            .unwrap_or_default(),
        raw_html: Some(clean),
        ..Default::default()
    };
    data.ensure_unique_ids();
    log::debug!(
        "parsed template: title={:?} images={} specs={} sections={}",
        data.title,
        data.images.len(),
        data.specs.len(),
        data.company_sections.len()
    );
    Ok(data)
}

/// Strip characters that have no business in markup before parsing.
pub fn sanitize(html: &str) -> String {
    html.trim_start_matches('\u{feff}').replace('\0', "")
}

fn first_text(doc: &NodeRef, cascade: &[String]) -> String {
    dom::first_match(doc, cascade)
        .map(|(n, _)| dom::text(&n))
        .unwrap_or_default()
}

pub(crate) fn find_container(doc: &NodeRef, cascade: &[String]) -> Option<NodeRef> {
    dom::first_match(doc, cascade).map(|(n, _)| n)
}

// --- price ---

fn extract_price(doc: &NodeRef, profile: &SelectorProfile) -> (String, String) {
    let Some((price_node, _)) = dom::first_match(doc, &profile.price) else {
        return (String::new(), String::new());
    };
    let price_text = dom::text(&price_node);
    let price = numeric_price(&price_text);
    if price.is_empty() {
        return (String::new(), String::new());
    }
    let currency = dom::first_match(doc, &profile.currency)
        .map(|(n, _)| dom::text(&n))
        .and_then(|t| currency_code(&t))
        .or_else(|| currency_code(&price_text))
        .unwrap_or("EUR");
    (price, currency.to_string())
}

/// The first numeric run of a price string, e.g. `"ab 1.299,00 €"` → `"1.299,00"`.
pub fn numeric_price(text: &str) -> String {
    PRICE_RE
        .find(text)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// `text` with its first number swapped for `price`, or `None` when it
/// holds no number.
pub(crate) fn replace_price(text: &str, price: &str) -> Option<String> {
    let m = PRICE_RE.find(text)?;
    Some(format!("{}{price}{}", &text[..m.start()], &text[m.end()..]))
}

/// ISO code for a currency symbol or code appearing in `text`.
pub fn currency_code(text: &str) -> Option<&'static str> {
    let upper = text.to_uppercase();
    CURRENCIES
        .iter()
        .find(|(code, symbol)| upper.contains(code) || text.contains(symbol))
        .map(|(code, _)| *code)
}

/// Display symbol for an ISO code; unknown codes are shown as-is.
pub fn currency_symbol(code: &str) -> &str {
    CURRENCIES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, symbol)| *symbol)
        .unwrap_or(code)
}

// --- description ---

pub(crate) fn find_description(doc: &NodeRef, profile: &SelectorProfile) -> Option<NodeRef> {
    if let Some((node, _)) = dom::first_match(doc, &profile.description) {
        return Some(node);
    }
    description_by_heading(doc, &profile.description_headings)
}

/// A heading mentioning "description" (or a configured synonym): its next
/// element sibling holds the description.
fn description_by_heading(doc: &NodeRef, keywords: &[String]) -> Option<NodeRef> {
    let headings = dom::select_all(doc, "h1, h2, h3, h4, h5, h6, strong, b").ok()?;
    headings.iter().find_map(|h| {
        let text = dom::text(h).to_lowercase();
        if !keywords.iter().any(|k| text.contains(k.as_str())) {
            return None;
        }
        let sibling = dom::next_element_sibling(h)?;
        log::debug!("description found via heading {text:?}");
        Some(sibling)
    })
}

// --- images ---

fn extract_images(doc: &NodeRef, profile: &SelectorProfile) -> Vec<Image> {
    let strategies = &profile.images;
    let attempts: [(&str, Vec<NodeRef>); 4] = [
        ("radio gallery", dom::all_of_first_match(doc, &strategies.radio_gallery)),
        ("slider", dom::all_of_first_match(doc, &strategies.slider)),
        (
            "main image",
            dom::first_match(doc, &strategies.main_image)
                .map(|(n, _)| vec![n])
                .unwrap_or_default(),
        ),
        ("gallery", dom::all_of_first_match(doc, &strategies.gallery)),
    ];
    for (name, nodes) in attempts {
        let urls = image_urls(&nodes);
        if !urls.is_empty() {
            log::debug!("images found by {name} strategy: {}", urls.len());
            return to_images(urls);
        }
    }

    let all = dom::select_all(doc, "img").unwrap_or_default();
    let photos: Vec<NodeRef> = all
        .into_iter()
        .filter(|img| looks_like_photo(img, profile))
        .collect();
    to_images(image_urls(&photos))
}

/// `src` (or lazy-load `data-src`) of every node, de-duplicated in order.
pub(crate) fn image_urls(nodes: &[NodeRef]) -> Vec<String> {
    let mut seen = HashSet::new();
    nodes
        .iter()
        .filter_map(image_src)
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

pub(crate) fn image_src(node: &NodeRef) -> Option<String> {
    ["src", "data-src"]
        .iter()
        .filter_map(|a| dom::attr(node, a))
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

pub(crate) fn to_images(urls: Vec<String>) -> Vec<Image> {
    urls.into_iter()
        .take(MAX_IMAGES)
        .enumerate()
        .map(|(i, url)| Image { id: format!("image-{}", i + 1), url })
        .collect()
}

fn looks_like_photo(img: &NodeRef, profile: &SelectorProfile) -> bool {
    let Some(src) = image_src(img) else {
        return false;
    };
    let src_lower = src.to_lowercase();
    let path = src_lower.split(['?', '#']).next().unwrap_or_default();
    let strategies = &profile.images;
    let photo_like = strategies.photo_extensions.iter().any(|ext| path.ends_with(ext.as_str()))
        || strategies.photo_hosts.iter().any(|host| src_lower.contains(host.as_str()));
    if !photo_like {
        return false;
    }
    let haystack = format!(
        "{} {} {}",
        src_lower,
        dom::attr(img, "alt").unwrap_or_default().to_lowercase(),
        dom::attr(img, "class").unwrap_or_default().to_lowercase()
    );
    !strategies.exclude_keywords.iter().any(|k| haystack.contains(k.as_str()))
}

// --- specs ---

/// The items of a list container: every match of the first item selector
/// that matches inside it.
pub(crate) fn items_in(container: &NodeRef, item_selectors: &[String]) -> Vec<NodeRef> {
    dom::all_of_first_match(container, item_selectors)
        .into_iter()
        .filter(|n| n != container)
        .collect()
}

/// Locate the label and value nodes of a spec item: labelled sub-elements
/// first, else the first two element children.
pub(crate) fn spec_parts(item: &NodeRef, sel: &SpecSelectors) -> Option<(NodeRef, NodeRef)> {
    let label = dom::first_match(item, &sel.labels).map(|(n, _)| n);
    let value = dom::first_match(item, &sel.values).map(|(n, _)| n);
    if let (Some(l), Some(v)) = (&label, &value)
        && l != v
        && l != item
        && v != item
    {
        return Some((l.clone(), v.clone()));
    }
    let children = dom::element_children(item);
    match children.as_slice() {
        [first, second, ..] => Some((first.clone(), second.clone())),
        _ => None,
    }
}

pub(crate) fn specs_in(container: &NodeRef, sel: &SpecSelectors) -> Vec<TechSpec> {
    items_in(container, &sel.items)
        .iter()
        .filter_map(|item| {
            let (label, value) = match spec_parts(item, sel) {
                Some((l, v)) => (dom::text(&l), dom::text(&v)),
                None => split_label_value(&dom::text(item))?,
            };
            let label = label.trim_end_matches(':').trim().to_string();
            (!label.is_empty() || !value.is_empty()).then_some((label, value))
        })
        .enumerate()
        .map(|(i, (label, value))| TechSpec { id: format!("spec-{}", i + 1), label, value })
        .collect()
}

fn split_label_value(text: &str) -> Option<(String, String)> {
    let (label, value) = text.split_once(':')?;
    Some((label.trim().to_string(), value.trim().to_string()))
}

// --- company sections ---

pub(crate) struct SectionParts {
    pub icon: Option<NodeRef>,
    pub title: Option<NodeRef>,
    pub description: Option<NodeRef>,
}

pub(crate) fn section_parts(item: &NodeRef, sel: &SectionSelectors) -> SectionParts {
    let icon = dom::first_match(item, &sel.icons)
        .map(|(n, _)| n)
        .or_else(|| dom::select_first(item, "svg"));
    let title = dom::first_match(item, &sel.titles).map(|(n, _)| n);
    let description = dom::first_match(item, &sel.descriptions)
        .map(|(n, _)| n)
        .filter(|d| title.as_ref() != Some(d));
    SectionParts { icon, title, description }
}

/// The markup stored in `CompanySection::svg` for an icon node.
pub(crate) fn icon_markup(icon: &NodeRef) -> String {
    if dom::tag_name(icon).as_deref() == Some("svg") {
        dom::outer_html(icon)
    } else {
        dom::inner_html(icon).trim().to_string()
    }
}

pub(crate) fn sections_in(container: &NodeRef, sel: &SectionSelectors) -> Vec<CompanySection> {
    items_in(container, &sel.items)
        .iter()
        .map(|item| section_parts(item, sel))
        .filter(|p| p.title.is_some() || p.description.is_some())
        .enumerate()
        .map(|(i, parts)| CompanySection {
            id: format!("section-{}", i + 1),
            title: parts.title.as_ref().map(dom::text).unwrap_or_default(),
            description: parts.description.as_ref().map(dom::text).unwrap_or_default(),
            svg: parts.icon.as_ref().map(icon_markup).unwrap_or_default(),
            css_selector: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_cascade_prefers_product_title() {
        let data = parse_template(
            "<h1>Shop</h1><div class=\"product-info\"><h2 class=\"product-title\">Drill</h2></div>",
        )
        .unwrap();
        assert_eq!(data.title, "Drill");
    }

    #[test]
    fn title_falls_back_through_cascade() {
        let data = parse_template("<div class=\"product-info\"><h1> Cordless   Drill </h1></div>").unwrap();
        assert_eq!(data.title, "Cordless Drill");
    }

    #[test]
    fn price_and_currency_from_single_node() {
        let data = parse_template("<span class=\"product-price\">ab 1.299,00 €</span>").unwrap();
        assert_eq!(data.price, "1.299,00");
        assert_eq!(data.currency, "EUR");
    }

    #[test]
    fn currency_node_wins_over_price_text() {
        let data = parse_template(
            "<div class=\"product-price\">19.99 <span class=\"currency\">$</span></div>",
        )
        .unwrap();
        assert_eq!(data.price, "19.99");
        assert_eq!(data.currency, "USD");
    }

    #[test]
    fn no_price_leaves_fields_empty() {
        let data = parse_template("<span class=\"price\">on request</span>").unwrap();
        assert!(data.price.is_empty());
        assert!(data.currency.is_empty());
    }

    #[test]
    fn description_heading_fallback() {
        let data = parse_template(
            "<h3>Produkt-Beschreibung</h3><div><p>Robust <b>steel</b> body.</p></div>",
        )
        .unwrap();
        assert_eq!(data.description, "<p>Robust <b>steel</b> body.</p>");
    }

    #[test]
    fn description_primary_selector() {
        let data =
            parse_template("<div class=\"product-description\"> <p>Hello</p> </div>").unwrap();
        assert_eq!(data.description, "<p>Hello</p>");
    }

    #[test]
    fn images_stop_at_first_strategy_with_results() {
        let html = "<div class=\"slider\"><img src=\"a.jpg\"><img src=\"b.jpg\"><img src=\"a.jpg\"></div>\
                    <div class=\"gallery\"><img src=\"c.jpg\"></div>";
        let data = parse_template(html).unwrap();
        let urls: Vec<&str> = data.images.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["a.jpg", "b.jpg"]);
        assert_eq!(data.images[1].id, "image-2");
    }

    #[test]
    fn main_image_takes_only_first() {
        let html = "<div class=\"main-image\"><img src=\"one.jpg\"><img src=\"two.jpg\"></div>";
        let data = parse_template(html).unwrap();
        assert_eq!(data.images.len(), 1);
        assert_eq!(data.images[0].url, "one.jpg");
    }

    #[test]
    fn generic_images_skip_logos_and_icons() {
        let html = "<img src=\"/static/logo.png\"><img src=\"x.svg\">\
                    <img class=\"icon\" src=\"truck.png\"><img data-src=\"https://i.ebayimg.com/00/s/abc\">\
                    <img src=\"photo.JPG?w=500\">";
        let data = parse_template(html).unwrap();
        let urls: Vec<&str> = data.images.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["https://i.ebayimg.com/00/s/abc", "photo.JPG?w=500"]);
    }

    #[test]
    fn images_are_capped() {
        let imgs: String = (0..20).map(|i| format!("<img src=\"p{i}.jpg\">")).collect();
        let data = parse_template(&format!("<div class=\"gallery\">{imgs}</div>")).unwrap();
        assert_eq!(data.images.len(), MAX_IMAGES);
    }

    #[test]
    fn specs_from_labelled_items() {
        let html = "<div class=\"specs\">\
            <div class=\"spec-item\"><span class=\"spec-label\">Weight</span><span class=\"spec-value\">2 kg</span></div>\
            <div class=\"spec-item\"><span class=\"spec-label\">Color:</span><span class=\"spec-value\">Red</span></div>\
            </div>";
        let data = parse_template(html).unwrap();
        let pairs: Vec<(&str, &str)> =
            data.specs.iter().map(|s| (s.label.as_str(), s.value.as_str())).collect();
        assert_eq!(pairs, vec![("Weight", "2 kg"), ("Color", "Red")]);
    }

    #[test]
    fn specs_from_table_rows_positionally() {
        let html = "<table class=\"specs\"><tr><td>Voltage</td><td>18 V</td></tr>\
                    <tr><th>Brand</th><td>Acme</td></tr></table>";
        let data = parse_template(html).unwrap();
        let pairs: Vec<(&str, &str)> =
            data.specs.iter().map(|s| (s.label.as_str(), s.value.as_str())).collect();
        assert_eq!(pairs, vec![("Voltage", "18 V"), ("Brand", "Acme")]);
    }

    #[test]
    fn specs_from_colon_text() {
        let html = "<ul class=\"tech-specs\"><li>Material: Oak</li><li>Nothing here</li></ul>";
        let data = parse_template(html).unwrap();
        assert_eq!(data.specs.len(), 1);
        assert_eq!(data.specs[0].label, "Material");
        assert_eq!(data.specs[0].value, "Oak");
    }

    #[test]
    fn company_sections_with_icons() {
        let html = "<div class=\"company-info\">\
            <div class=\"company-section\"><div class=\"section-icon\"><svg viewBox=\"0 0 1 1\"></svg></div>\
            <h3>Shipping</h3><p>Fast delivery</p></div>\
            <div class=\"company-section\"><svg class=\"i\"></svg><h4>Returns</h4><p>30 days</p></div>\
            </div>";
        let data = parse_template(html).unwrap();
        assert_eq!(data.company_sections.len(), 2);
        let first = &data.company_sections[0];
        assert_eq!(first.title, "Shipping");
        assert_eq!(first.description, "Fast delivery");
        assert!(first.svg.starts_with("<svg"));
        assert_eq!(data.company_sections[1].title, "Returns");
        assert!(data.company_sections[1].svg.contains("class=\"i\""));
    }

    #[test]
    fn oversized_input_is_rejected() {
        let html = "x".repeat(64);
        let err = parse_template_with(&html, SelectorProfile::builtin(), 10).unwrap_err();
        assert!(matches!(err, ListingError::InputTooLarge { size: 64, max: 10 }));
        let (data, notice) = parse_or_blank(&html, SelectorProfile::builtin(), 10);
        assert_eq!(data, TemplateData::default());
        assert!(notice.is_some());
    }

    #[test]
    fn non_utf8_bytes_are_rejected() {
        assert!(matches!(
            parse_template_bytes(&[0xff, 0xfe, 0x00], 1024),
            Err(ListingError::NotUtf8)
        ));
    }

    #[test]
    fn empty_input_is_blank_but_keeps_raw() {
        let data = parse_template("").unwrap();
        assert!(data.title.is_empty());
        assert!(data.images.is_empty());
        assert_eq!(data.raw_html.as_deref(), Some(""));
    }

    #[test]
    fn currency_helpers() {
        assert_eq!(currency_code("49 EUR"), Some("EUR"));
        assert_eq!(currency_code("£5"), Some("GBP"));
        assert_eq!(currency_code("5"), None);
        assert_eq!(currency_symbol("usd"), "$");
        assert_eq!(currency_symbol("SEK"), "SEK");
    }
}
