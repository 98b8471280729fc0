use askama::Template;

use super::data::{CompanySection, TechSpec, TemplateData};
use super::error::ListingError;
use super::gallery;
use super::parser::currency_symbol;

/// Self-contained listing document used when there is no source markup.
/// Its class names are the first entries of the built-in cascades, so the
/// output parses back into the same data.
#[derive(Template)]
#[template(path = "listing/standalone.html")]
struct StandaloneTemplate<'a> {
    title: &'a str,
    subtitle: &'a str,
    company_name: &'a str,
    price: &'a str,
    currency_symbol: &'a str,
    description: &'a str,
    gallery: String,
    specs: &'a [TechSpec],
    company_sections: &'a [CompanySection],
}

pub fn render_standalone(data: &TemplateData) -> Result<String, ListingError> {
    let gallery = if data.images.is_empty() {
        String::new()
    } else {
        gallery::render_gallery(&data.images)?
    };
    let tmpl = StandaloneTemplate {
        title: &data.title,
        subtitle: &data.subtitle,
        company_name: &data.company_name,
        price: data.price.trim(),
        currency_symbol: currency_symbol(data.currency.trim()),
        description: &data.description,
        gallery,
        specs: &data.specs,
        company_sections: &data.company_sections,
    };
    Ok(tmpl.render()?)
}
