use crate::error::{RecordKind, Result, StoreError};

/// Validate task or tag text: surrounding whitespace is dropped and what
/// remains must not be empty. Returns the text to store.
pub fn clean_text(kind: RecordKind, text: &str) -> Result<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(StoreError::EmptyText(kind));
    }
    Ok(trimmed)
}
