//! Output filename derivation.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

/// Longest filename most filesystems accept, in bytes.
pub const MAX_FILENAME_BYTES: usize = 255;

const EXTENSION: &str = ".jpg";

/// Anything that is not a word character, whitespace or a hyphen.
static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));

/// Drop unsafe characters from a title and turn spaces into underscores.
pub fn sanitize_title(title: &str) -> String {
    UNSAFE_CHARS.replace_all(title, "").replace(' ', "_")
}

/// `{YYYY-MM-DD}_{Sanitized_Title}.jpg`, cut to fit [`MAX_FILENAME_BYTES`].
///
/// Truncation happens on a char boundary and always keeps the extension.
pub fn image_filename(date: NaiveDate, title: &str) -> String {
    let stem = format!("{}_{}", date.format("%Y-%m-%d"), sanitize_title(title));
    let budget = MAX_FILENAME_BYTES - EXTENSION.len();
    if stem.len() <= budget {
        return format!("{stem}{EXTENSION}");
    }

    let mut cut = budget;
    while !stem.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{EXTENSION}", &stem[..cut])
}
