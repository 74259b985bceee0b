mod comments;
mod conversations;
mod notifications;
mod posts;
mod profiles;
mod publications;

pub use comments::CommentPosted;
pub use conversations::MessageSent;
pub use publications::LikeToggled;

use crate::{Result, StoreError};

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE: u32 = 50;
/// Upper bound on any page of messages or notifications.
pub const MAX_PAGE: u32 = 200;

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }
}

/// Trims and bounds a required free-text field.
fn required_text(field: &str, value: &str, max_chars: usize) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(StoreError::invalid(format!("{field} is empty")));
    }
    if value.chars().count() > max_chars {
        return Err(StoreError::invalid(format!(
            "{field} is longer than {max_chars} characters"
        )));
    }
    Ok(value.to_string())
}
