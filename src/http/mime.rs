//! Best-effort content type from a file extension.

use std::path::Path;

use new_mime_guess::MimeGuess;

/// Guesses a content type for `path` from its extension.
///
/// Returns `None` for unknown extensions so callers can keep whatever type
/// they already had.
pub fn guess(path: &Path) -> Option<&'static str> {
    path.extension()?;
    MimeGuess::from_path(path).first_raw()
}

/// Like [`guess`], falling back to the generic binary type.
pub fn guess_or_binary(path: &Path) -> &'static str {
    guess(path).unwrap_or(crate::http::response::GENERIC_BINARY)
}
