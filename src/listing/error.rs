use std::fmt;

#[derive(Debug)]
pub enum ListingError {
    InputTooLarge { size: usize, max: usize },
    NotUtf8,
    InvalidSelector(String),
    NoMatch(String),
    NothingSelected,
    ImageLimit(usize),
    EmptyImageUrl,
    NotInlineEditable(&'static str),
    NothingToExport,
    Profile(String),
    Render(askama::Error),
    Serialize(std::io::Error),
}

impl ListingError {
    /// Errors the user caused and can fix (shown as a destructive toast),
    /// as opposed to internal failures.
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            ListingError::Profile(_) | ListingError::Render(_) | ListingError::Serialize(_)
        )
    }
}

impl fmt::Display for ListingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingError::InputTooLarge { size, max } => {
                write!(f, "HTML is too large ({size} bytes, limit {max})")
            }
            ListingError::NotUtf8 => write!(f, "HTML must be UTF-8 text"),
            ListingError::InvalidSelector(s) => write!(f, "Invalid CSS selector: {s}"),
            ListingError::NoMatch(s) => write!(f, "No element matches selector: {s}"),
            ListingError::NothingSelected => write!(f, "Choose an element before assigning it"),
            ListingError::ImageLimit(max) => write!(f, "A listing can hold at most {max} images"),
            ListingError::EmptyImageUrl => write!(f, "Image URL must not be empty"),
            ListingError::NotInlineEditable(field) => {
                write!(f, "The {field} field cannot be edited in the preview")
            }
            ListingError::NothingToExport => write!(f, "There is nothing to export yet"),
            ListingError::Profile(e) => write!(f, "Selector profile error: {e}"),
            ListingError::Render(e) => write!(f, "Render error: {e}"),
            ListingError::Serialize(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ListingError {}

impl From<askama::Error> for ListingError {
    fn from(e: askama::Error) -> Self {
        ListingError::Render(e)
    }
}

impl From<std::io::Error> for ListingError {
    fn from(e: std::io::Error) -> Self {
        ListingError::Serialize(e)
    }
}
