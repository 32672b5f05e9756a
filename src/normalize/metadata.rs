//! Mapping of raw bibliographic payloads onto a book's fields.
//!
//! Sources hand over their native JSON record (an Open Library `data` entry, a
//! Google Books `volumeInfo`, ...). Field names differ per source, so each
//! field is read from the first key that is present.

use serde_json::Value;

use super::fields::{
    normalize_cover_url, normalize_language_code, normalize_page_count_value,
    normalize_published_year, normalize_publisher, parse_multi_value_field, value_to_text,
};
use crate::models::IsbnMetadata;

const MAX_TAGS: usize = 10;

fn first_present<'a>(raw: &'a Value, keys: &[&str]) -> &'a Value {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .find(|v| !v.is_null())
        .unwrap_or(&Value::Null)
}

fn text_field(value: &Value) -> String {
    match value {
        // Open Library wraps long text as { "type": "/type/text", "value": ".." }
        Value::Object(map) => map.get("value").map(value_to_text).unwrap_or_default(),
        other => value_to_text(other),
    }
}

fn authors_field(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(map) => map.get("name").map(value_to_text).unwrap_or_default(),
                other => value_to_text(other),
            })
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => value_to_text(other),
    }
}

/// Normalize a raw metadata record into [`IsbnMetadata`].
///
/// `found` is set when the record carries a title, author, description or publisher.
pub fn normalize_isbn_metadata(isbn: &str, source: &str, raw: &Value) -> IsbnMetadata {
    let mut metadata = IsbnMetadata {
        isbn: isbn.to_string(),
        found: false,
        source: source.to_string(),
        title: text_field(first_present(raw, &["title"])),
        author: authors_field(first_present(raw, &["authors", "author", "by_statement"])),
        description: text_field(first_present(raw, &["description", "notes"])),
        publisher: normalize_publisher(first_present(raw, &["publisher", "publishers"])),
        published_year: normalize_published_year(first_present(
            raw,
            &["publishedDate", "publish_date", "publishedYear", "year"],
        )),
        page_count: normalize_page_count_value(first_present(
            raw,
            &["pageCount", "number_of_pages", "pagination"],
        )),
        language: normalize_language_code(first_present(raw, &["language", "languages"])),
        cover_url: normalize_cover_url(first_present(raw, &["imageLinks", "cover", "coverUrl"])),
        tags: parse_multi_value_field(first_present(raw, &["categories", "subjects", "tags"])),
    };
    metadata.tags.truncate(MAX_TAGS);
    metadata.found = metadata.has_content();
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_open_library_record() {
        let raw = json!({
            "title": "Het geheim van de sleutel",
            "authors": [{ "name": "Anna Jansen" }, { "name": "Piet de Vries" }],
            "publishers": [{ "name": "Lemniscaat" }],
            "publish_date": "maart 2010",
            "number_of_pages": 321,
            "notes": { "type": "/type/text", "value": "Een spannend verhaal." },
            "cover": { "small": "https://covers/s.jpg", "medium": "https://covers/m.jpg" },
            "subjects": [{ "name": "Avontuur" }, { "name": "Jeugdboeken" }]
        });

        let metadata = normalize_isbn_metadata("9789047701234", "openlibrary", &raw);
        assert!(metadata.found);
        assert_eq!(metadata.source, "openlibrary");
        assert_eq!(metadata.author, "Anna Jansen, Piet de Vries");
        assert_eq!(metadata.publisher, "Lemniscaat");
        assert_eq!(metadata.published_year, Some(2010));
        assert_eq!(metadata.page_count, Some(321));
        assert_eq!(metadata.description, "Een spannend verhaal.");
        assert_eq!(metadata.cover_url, "https://covers/m.jpg");
        assert_eq!(metadata.tags, vec!["Avontuur", "Jeugdboeken"]);
    }

    #[test]
    fn test_google_books_record() {
        let raw = json!({
            "title": "De reis",
            "authors": ["K. Bakker"],
            "publisher": "Querido",
            "publishedDate": "2018-09-01",
            "pageCount": 180,
            "language": "nl",
            "imageLinks": { "thumbnail": "http://books.google.com/t.jpg" },
            "categories": ["Juvenile Fiction"]
        });

        let metadata = normalize_isbn_metadata("9789045112345", "googlebooks", &raw);
        assert!(metadata.found);
        assert_eq!(metadata.language, "nl");
        assert_eq!(metadata.published_year, Some(2018));
        assert_eq!(metadata.cover_url, "https://books.google.com/t.jpg");
    }

    #[test]
    fn test_empty_record_is_not_found() {
        let metadata = normalize_isbn_metadata("123", "googlebooks", &json!({ "pageCount": 12 }));
        assert!(!metadata.found);
        assert_eq!(metadata.page_count, Some(12));
    }
}
