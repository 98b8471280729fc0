//! The listing pipeline: parse seller HTML into [`TemplateData`], edit it,
//! and generate eBay-ready HTML back out of it.

pub mod data;
pub mod dom;
pub mod editor;
pub mod error;
pub mod gallery;
pub mod generator;
pub mod parser;
pub mod preview;
pub mod profile;
pub mod selector;
pub mod standalone;

pub use data::{CompanySection, Field, FieldSelectors, Image, MAX_IMAGES, TechSpec, TemplateData};
pub use editor::{EditorState, ExportFile, SectionUpdate, export_filename};
pub use error::ListingError;
pub use generator::{generate_template, generate_template_with};
pub use parser::{parse_template, parse_template_bytes, parse_template_with};
pub use preview::{PreviewDevice, mark_editable, render_preview_page};
pub use profile::SelectorProfile;
pub use selector::{SelectorSession, SelectorState, Suggestion};
