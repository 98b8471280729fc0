//! Listing pipeline tests against realistic seller markup: parse, edit,
//! regenerate and parse again.

use listing_editor::listing::dom;
use listing_editor::listing::selector::{self, SelectorSession};
use listing_editor::listing::{
    EditorState, Field, MAX_IMAGES, SectionUpdate, SelectorProfile, TemplateData, generate_template,
    parse_template,
};

const SHOP_LISTING: &str = include_str!("fixtures/shop_listing.html");
const HEADING_DESCRIPTION: &str = include_str!("fixtures/heading_description.html");
const MAIN_IMAGE_LISTING: &str = include_str!("fixtures/main_image_listing.html");

fn urls(data: &TemplateData) -> Vec<String> {
    data.images.iter().map(|i| i.url.clone()).collect()
}

fn spec_pairs(data: &TemplateData) -> Vec<(String, String)> {
    data.specs.iter().map(|s| (s.label.clone(), s.value.clone())).collect()
}

fn section_triples(data: &TemplateData) -> Vec<(String, String, String)> {
    data.company_sections
        .iter()
        .map(|s| (s.title.clone(), s.description.clone(), s.svg.clone()))
        .collect()
}

fn assert_same_listing(again: &TemplateData, data: &TemplateData) {
    assert_eq!(again.title, data.title);
    assert_eq!(again.subtitle, data.subtitle);
    assert_eq!(again.company_name, data.company_name);
    assert_eq!(again.price, data.price);
    assert_eq!(again.currency, data.currency);
    assert_eq!(again.description, data.description);
    assert_eq!(urls(again), urls(data));
    assert_eq!(spec_pairs(again), spec_pairs(data));
    assert_eq!(section_triples(again), section_triples(data));
}

#[test]
fn shop_listing_is_fully_extracted() {
    let data = parse_template(SHOP_LISTING).expect("parse");

    assert_eq!(data.title, "Cordless Drill 18V");
    assert_eq!(data.subtitle, "With two batteries and case");
    assert_eq!(data.company_name, "Nordlicht Tools");
    assert_eq!(data.price, "129,90");
    assert_eq!(data.currency, "EUR");
    assert!(data.description.contains("<strong>compact</strong>"));
    assert_eq!(urls(&data).len(), 3);
    assert!(urls(&data).iter().all(|u| u.contains("drill-")));

    let specs: Vec<(&str, &str)> =
        data.specs.iter().map(|s| (s.label.as_str(), s.value.as_str())).collect();
    assert_eq!(specs, vec![("Voltage", "18 V"), ("Torque", "60 Nm"), ("Weight", "1.4 kg")]);

    assert_eq!(data.company_sections.len(), 2);
    assert_eq!(data.company_sections[1].title, "Returns");
    assert!(data.company_sections[0].svg.starts_with("<svg"));
    assert_eq!(data.raw_html.as_deref(), Some(SHOP_LISTING));
}

#[test]
fn generated_listing_parses_back_to_the_same_data() {
    let data = parse_template(SHOP_LISTING).expect("parse");
    let html = generate_template(&data).expect("generate");
    let again = parse_template(&html).expect("reparse");

    assert_eq!(data.specs.len(), 3);
    assert_eq!(data.company_sections.len(), 2);
    assert_same_listing(&again, &data);

    // untouched markup survives
    assert!(html.contains("promo-box"));
    assert!(html.contains(".product-title { color: #333; }"));
}

#[test]
fn main_image_listing_keeps_its_neighbours() {
    let data = parse_template(MAIN_IMAGE_LISTING).expect("parse");
    assert_eq!(data.title, "Glass Kettle 1.7 l");
    assert_eq!(data.price, "39,00");
    assert!(data.description.contains("<em>blue</em>"));
    assert_eq!(urls(&data), vec!["https://i.ebayimg.com/images/g/kettle-1.jpg".to_string()]);
    assert_eq!(spec_pairs(&data).len(), 2);
    assert_eq!(section_triples(&data).len(), 1);

    let html = generate_template(&data).expect("generate");
    assert!(html.contains("gallery-radio"));
    assert!(html.contains("listing-card"));
    let again = parse_template(&html).expect("reparse");
    assert_same_listing(&again, &data);
}

#[test]
fn regeneration_is_idempotent() {
    let first = generate_template(&parse_template(SHOP_LISTING).unwrap()).unwrap();
    let second = generate_template(&parse_template(&first).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn gallery_replaces_the_source_images_and_keeps_layout_classes() {
    let data = parse_template(SHOP_LISTING).unwrap();
    let html = generate_template(&data).unwrap();

    assert!(html.contains("gallery-radio"));
    assert!(html.contains("col-md-6"));
    for url in urls(&data) {
        assert!(html.contains(&url), "{url} missing from gallery");
    }
    // the logo is not a listing photo and stays where it was
    assert!(html.contains("shop-logo"));
}

#[test]
fn edits_are_written_in_place() {
    let profile = SelectorProfile::builtin();
    let (mut editor, notice) = EditorState::from_html(SHOP_LISTING, profile, 1 << 20).unwrap();
    assert!(notice.is_none());

    let update = SectionUpdate {
        title: Some("Cordless Drill 18V Pro".into()),
        price: Some("149,00".into()),
        ..Default::default()
    };
    editor.apply(update, profile).unwrap();
    editor.add_image("https://i.ebayimg.com/images/g/drill-4.jpg", profile).unwrap();

    let again = parse_template(&editor.generated_html).unwrap();
    assert_eq!(again.title, "Cordless Drill 18V Pro");
    assert_eq!(again.price, "149,00");
    assert_eq!(again.currency, "EUR");
    assert_eq!(again.images.len(), 4);
    assert_eq!(again.subtitle, "With two batteries and case");
}

#[test]
fn description_found_under_heading() {
    let data = parse_template(HEADING_DESCRIPTION).unwrap();
    assert_eq!(data.title, "Vintage Desk Lamp");
    assert_eq!(data.price, "45.00");
    assert_eq!(data.currency, "USD");
    assert!(data.description.contains("Brass lamp from the 1970s"));
    // icons are not photos
    assert_eq!(urls(&data), vec![
        "https://cdn.example.com/photos/lamp-front.jpg".to_string(),
        "https://cdn.example.com/photos/lamp-side.webp".to_string(),
    ]);
}

#[test]
fn image_limit_holds_through_the_editor() {
    let profile = SelectorProfile::builtin();
    let (mut editor, _) = EditorState::from_html(SHOP_LISTING, profile, 1 << 20).unwrap();
    for i in editor.data.images.len()..MAX_IMAGES {
        editor.add_image(&format!("https://i.ebayimg.com/extra-{i}.jpg"), profile).unwrap();
    }
    let before = editor.clone();
    assert!(editor.add_image("https://i.ebayimg.com/one-too-many.jpg", profile).is_err());
    assert_eq!(editor, before);
}

#[test]
fn manual_selector_overrides_the_cascade() {
    let profile = SelectorProfile::builtin();
    let mut data = parse_template(SHOP_LISTING).unwrap();

    let suggestions = selector::suggest(SHOP_LISTING, Field::Subtitle, profile);
    assert_eq!(suggestions[0].selector, ".product-subtitle");

    let mut session = SelectorSession::new(SHOP_LISTING);
    assert!(session.choose(".promo-box").unwrap().is_none());
    session.assign(Field::Subtitle, &mut data, profile).unwrap();
    assert_eq!(data.subtitle, "Spring sale");
    assert_eq!(data.selectors.get(Field::Subtitle), Some(".promo-box"));

    data.subtitle = "Summer sale".into();
    let html = generate_template(&data).unwrap();
    assert!(html.contains("<span class=\"promo-box\">Summer sale</span>"));
    assert!(html.contains("With two batteries and case"));
}

#[test]
fn clicked_element_becomes_a_selector() {
    let annotated = selector::annotate_for_picking(SHOP_LISTING).unwrap();
    let doc = dom::parse_document(&annotated);
    let price = dom::select_first(&doc, ".product-price").unwrap();
    let pick_id = dom::attr(&price, "data-pick-id").unwrap();

    let selector = selector::selector_for_pick(SHOP_LISTING, &pick_id).unwrap();
    let mut session = SelectorSession::new(SHOP_LISTING);
    session.choose(&selector).unwrap();
    let mut data = parse_template(SHOP_LISTING).unwrap();
    data.price.clear();
    session.assign(Field::Price, &mut data, SelectorProfile::builtin()).unwrap();
    assert_eq!(data.price, "129,90");
    assert_eq!(data.selectors.get(Field::Price), Some(selector.as_str()));
}
