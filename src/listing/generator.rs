//! Writes [`TemplateData`] back into listing HTML.
//!
//! With source markup, edited values are injected into the nodes the parser
//! read them from and everything else is left as it was. Without it, a
//! standalone document is synthesized.

use kuchiki::NodeRef;

use super::data::{CompanySection, Field, TechSpec, TemplateData};
use super::dom;
use super::error::ListingError;
use super::gallery;
use super::parser::{self, currency_symbol, replace_price};
use super::profile::{SectionSelectors, SelectorProfile, SpecSelectors};
use super::standalone;

const SPEC_SKELETON: &str =
    "<div class=\"spec-item\"><span class=\"spec-label\"></span><span class=\"spec-value\"></span></div>";
const SECTION_SKELETON: &str = "<div class=\"company-section\"><div class=\"section-icon\"></div>\
     <h3 class=\"section-title\"></h3><p class=\"section-description\"></p></div>";

/// Elements the gallery must never replace.
const PROTECTED_TAGS: &[&str] = &["html", "head", "body"];

pub fn generate_template(data: &TemplateData) -> Result<String, ListingError> {
    generate_template_with(data, SelectorProfile::builtin())
}

pub fn generate_template_with(
    data: &TemplateData,
    profile: &SelectorProfile,
) -> Result<String, ListingError> {
    let Some(raw) = data.raw_html.as_deref().filter(|h| !h.trim().is_empty()) else {
        return standalone::render_standalone(data);
    };
    let doc = dom::parse_document(raw);

    write_text(&doc, data, profile, Field::Title, &data.title);
    write_text(&doc, data, profile, Field::Subtitle, &data.subtitle);
    write_text(&doc, data, profile, Field::CompanyName, &data.company_name);
    write_price(&doc, data, profile);
    if !data.description.trim().is_empty()
        && let Some(node) = target(&doc, data, profile, Field::Description)
    {
        dom::set_inner_html(&node, &data.description);
    }
    write_specs(&doc, data, profile);
    write_sections(&doc, data, profile);
    write_gallery(&doc, data, profile)?;

    dom::serialize_document(&doc)
}

/// The node a field is written to: its saved override when that still
/// resolves, otherwise the same lookup the parser uses.
pub fn target(
    doc: &NodeRef,
    data: &TemplateData,
    profile: &SelectorProfile,
    field: Field,
) -> Option<NodeRef> {
    if let Some(sel) = data.selectors.get(field) {
        match dom::select_first(doc, sel) {
            Some(node) => return Some(node),
            None => log::debug!("stale {} selector {sel:?}, using cascade", field.as_str()),
        }
    }
    match field {
        Field::Description => parser::find_description(doc, profile),
        Field::Images => gallery_node(doc, profile),
        _ => dom::first_match(doc, profile.cascade(field)).map(|(n, _)| n),
    }
}

fn write_text(doc: &NodeRef, data: &TemplateData, profile: &SelectorProfile, field: Field, value: &str) {
    if value.trim().is_empty() {
        return;
    }
    if let Some(node) = target(doc, data, profile, field) {
        dom::set_text(&node, value);
    }
}

fn write_price(doc: &NodeRef, data: &TemplateData, profile: &SelectorProfile) {
    let price = data.price.trim();
    if price.is_empty() {
        return;
    }
    let Some(price_node) = target(doc, data, profile, Field::Price) else {
        return;
    };
    let code = data.currency.trim();
    let currency_node = target(doc, data, profile, Field::Currency)
        .filter(|cur| !dom::contains(cur, &price_node));
    match currency_node {
        Some(cur) if dom::contains(&price_node, &cur) => {
            // Keep the nested currency element where it is; only the number changes.
            write_own_number(&price_node, price);
            if !code.is_empty() {
                dom::set_text(&cur, currency_symbol(code));
            }
        }
        Some(cur) => {
            dom::set_text(&price_node, price);
            if !code.is_empty() {
                dom::set_text(&cur, currency_symbol(code));
            }
        }
        None if code.is_empty() => {
            let old = dom::text(&price_node);
            let text = replace_price(&old, price).unwrap_or_else(|| price.to_string());
            dom::set_text(&price_node, &text);
        }
        None => dom::set_text(&price_node, format!("{price} {}", currency_symbol(code)).trim()),
    }
}

/// Swap the number in the first of `node`'s own text children that has one,
/// leaving child elements and surrounding text in place.
fn write_own_number(node: &NodeRef, price: &str) {
    for child in node.children() {
        let Some(text) = child.as_text() else {
            continue;
        };
        let replaced = replace_price(&text.borrow(), price);
        if let Some(replaced) = replaced {
            *text.borrow_mut() = replaced;
            return;
        }
    }
    node.prepend(NodeRef::new_text(format!("{price} ")));
}

// --- lists ---

/// Replace the items of `container` with one clone of its first item per
/// entry; containers without items get skeleton markup.
fn rebuild_list<T>(
    container: &NodeRef,
    item_selectors: &[String],
    skeleton: &str,
    entries: &[T],
    fill: impl Fn(&NodeRef, &T),
) {
    let old_items = parser::items_in(container, item_selectors);
    let template = match old_items.first() {
        Some(first) => dom::deep_clone(first),
        None => match dom::fragment(container, skeleton).into_iter().find(|n| n.as_element().is_some()) {
            Some(node) => node,
            None => return,
        },
    };
    for entry in entries {
        let item = dom::deep_clone(&template);
        fill(&item, entry);
        match old_items.first() {
            Some(first) => first.insert_before(item),
            None => container.append(item),
        }
    }
    for old in old_items {
        old.detach();
    }
}

fn write_specs(doc: &NodeRef, data: &TemplateData, profile: &SelectorProfile) {
    if data.specs.is_empty() {
        return;
    }
    let Some(container) = target(doc, data, profile, Field::Specs) else {
        return;
    };
    let sel = &profile.specs;
    rebuild_list(&container, &sel.items, SPEC_SKELETON, &data.specs, |item, spec| {
        fill_spec(item, spec, sel)
    });
}

fn fill_spec(item: &NodeRef, spec: &TechSpec, sel: &SpecSelectors) {
    match parser::spec_parts(item, sel) {
        Some((label, value)) => {
            dom::set_text(&label, &spec.label);
            dom::set_text(&value, &spec.value);
        }
        None => dom::set_text(item, &format!("{}: {}", spec.label, spec.value)),
    }
}

fn write_sections(doc: &NodeRef, data: &TemplateData, profile: &SelectorProfile) {
    if data.company_sections.is_empty() {
        return;
    }
    let sel = &profile.company_sections;
    let container = target(doc, data, profile, Field::CompanySections);

    // Sections pinned to their own node outside the container are written in place.
    let mut listed: Vec<CompanySection> = Vec::new();
    for section in &data.company_sections {
        let pinned = section
            .css_selector
            .as_deref()
            .and_then(|s| dom::select_first(doc, s))
            .filter(|node| container.as_ref().is_none_or(|c| !dom::contains(c, node)));
        match pinned {
            Some(node) => fill_section(&node, section, sel),
            None => listed.push(section.clone()),
        }
    }
    if let Some(container) = container
        && !listed.is_empty()
    {
        rebuild_list(&container, &sel.items, SECTION_SKELETON, &listed, |item, section| {
            fill_section(item, section, sel)
        });
    }
}

fn fill_section(item: &NodeRef, section: &CompanySection, sel: &SectionSelectors) {
    let parts = parser::section_parts(item, sel);
    if let Some(title) = &parts.title {
        dom::set_text(title, &section.title);
    }
    if let Some(description) = &parts.description {
        dom::set_text(description, &section.description);
    }
    let Some(icon) = &parts.icon else {
        return;
    };
    if dom::tag_name(icon).as_deref() == Some("svg") {
        let context = icon.parent().unwrap_or_else(|| item.clone());
        for node in dom::fragment(&context, &section.svg) {
            icon.insert_before(node);
        }
        icon.detach();
    } else {
        dom::set_inner_html(icon, &section.svg);
    }
}

// --- gallery ---

/// The element the regenerated gallery replaces.
fn gallery_node(doc: &NodeRef, profile: &SelectorProfile) -> Option<NodeRef> {
    let found = dom::first_match(doc, &profile.gallery_containers)
        .map(|(n, _)| n)
        .or_else(|| {
            let (main, _) = dom::first_match(doc, &profile.images.main_image)?;
            if dom::tag_name(&main).as_deref() != Some("img") {
                return Some(main);
            }
            // The parent is only the gallery when it holds nothing but images.
            let wrapper = main.parent().filter(|parent| {
                dom::element_children(parent)
                    .iter()
                    .all(|child| dom::tag_name(child).as_deref() == Some("img"))
            });
            Some(wrapper.unwrap_or(main))
        })?;
    let tag = dom::tag_name(&found)?;
    (!PROTECTED_TAGS.contains(&tag.as_str())).then_some(found)
}

fn write_gallery(doc: &NodeRef, data: &TemplateData, profile: &SelectorProfile) -> Result<(), ListingError> {
    if data.images.is_empty() {
        return Ok(());
    }
    let Some(old) = target(doc, data, profile, Field::Images) else {
        log::debug!("no gallery node found, images not written");
        return Ok(());
    };
    let markup = gallery::render_gallery(&data.images)?;
    let context = old.parent().unwrap_or_else(|| old.clone());
    let Some(new_root) = dom::fragment(&context, &markup)
        .into_iter()
        .find(|n| n.as_element().is_some())
    else {
        return Ok(());
    };
    merge_layout_attrs(&old, &new_root, &profile.layout_class_prefixes);
    old.insert_before(new_root);
    old.detach();
    Ok(())
}

/// Carry the old gallery's id and layout classes over to its replacement.
fn merge_layout_attrs(old: &NodeRef, new: &NodeRef, prefixes: &[String]) {
    if let Some(id) = dom::attr(old, "id")
        && dom::attr(new, "id").is_none()
    {
        dom::set_attr(new, "id", &id);
    }
    let mut classes = dom::classes(new);
    for class in dom::classes(old) {
        let layout = prefixes.iter().any(|p| class.starts_with(p.as_str()));
        if layout && !classes.contains(&class) {
            classes.push(class);
        }
    }
    dom::set_attr(new, "class", &classes.join(" "));
}
