//! Canonicalization of raw input into domain values

mod fields;
mod metadata;

pub use fields::{
    normalize_barcode, normalize_barcode_value, normalize_cover_url, normalize_language_code,
    normalize_page_count_value, normalize_published_year, normalize_publisher,
    parse_boolean_flag, parse_multi_value_field, value_to_text,
};
pub use metadata::normalize_isbn_metadata;

/// Sanitize an ISBN for lookup: canonical barcode form of length 10 or 13.
///
/// Returns `None` when the input cannot be an ISBN. A trailing `X` is only
/// valid on ISBN-10.
pub fn sanitize_isbn(raw: &str) -> Option<String> {
    let isbn = normalize_barcode(raw);
    match isbn.len() {
        10 => Some(isbn),
        13 if !isbn.ends_with('X') => Some(isbn),
        _ => None,
    }
}

/// Comparison key for titles, usernames and other names: trimmed, Unicode lowercase
pub fn fold_key(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Case-insensitive equality under [`fold_key`]
pub fn same_key(a: &str, b: &str) -> bool {
    fold_key(a) == fold_key(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_key_folds_non_ascii_case() {
        assert!(same_key(" ÉÉN KEER ", "één keer"));
        assert!(same_key("Ödön", "ÖDÖN"));
        assert!(!same_key("een", "één"));
    }

    #[test]
    fn test_sanitize_isbn() {
        assert_eq!(sanitize_isbn("978-1-234-56789-0").as_deref(), Some("9781234567890"));
        assert_eq!(sanitize_isbn("0-306-40615-x").as_deref(), Some("030640615X"));
        assert_eq!(sanitize_isbn("12345"), None);
        assert_eq!(sanitize_isbn("978123456789X"), None);
        assert_eq!(sanitize_isbn(""), None);
    }
}
