//! Field normalizers for user input, spreadsheet cells and metadata payloads.
//!
//! Every function here is total: malformed input yields an empty string,
//! `None`, `false` or an empty list, never an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static FIRST_INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));
static MULTI_VALUE_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,;/\n\r]+").expect("valid regex"));

/// Render a scalar cell as trimmed text. Integral floats lose their `.0`.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 1e18 => format!("{}", f as i64),
                    Some(f) => f.to_string(),
                    None => String::new(),
                }
            }
        }
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => String::new(),
    }
}

/// Keep the digits of a barcode plus one trailing `X` check character.
///
/// `"978-90-123 4567-x"` becomes `"978901234567X"`.
pub fn normalize_barcode(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut out: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if trimmed.ends_with(['x', 'X']) {
        out.push('X');
    }
    out
}

/// Barcode normalization for a spreadsheet cell or JSON value
pub fn normalize_barcode_value(value: &Value) -> String {
    normalize_barcode(&value_to_text(value))
}

/// First non-empty publisher name from a string, list or `{ "name": .. }` object
pub fn normalize_publisher(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .map(normalize_publisher)
            .find(|s| !s.is_empty())
            .unwrap_or_default(),
        Value::Object(map) => map.get("name").map(normalize_publisher).unwrap_or_default(),
        _ => String::new(),
    }
}

/// Two-letter language code (`"dut"`, `"Nederlands"`, `"/languages/dut"` -> `"nl"`)
pub fn normalize_language_code(value: &Value) -> String {
    match value {
        Value::String(s) => language_code_from_str(s),
        Value::Array(items) => items
            .iter()
            .map(normalize_language_code)
            .find(|s| !s.is_empty())
            .unwrap_or_default(),
        Value::Object(map) => map
            .get("key")
            .or_else(|| map.get("code"))
            .map(normalize_language_code)
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn language_code_from_str(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let code = lowered.rsplit('/').next().unwrap_or("").trim();
    // "en-US", "nl_BE"
    let code = code.split(['-', '_']).next().unwrap_or("");

    let mapped = match code {
        "nl" | "dut" | "nld" | "nederlands" | "dutch" => "nl",
        "en" | "eng" | "engels" | "english" => "en",
        "de" | "ger" | "deu" | "duits" | "german" | "deutsch" => "de",
        "fr" | "fre" | "fra" | "frans" | "french" | "français" | "francais" => "fr",
        "es" | "spa" | "spaans" | "spanish" | "español" | "espanol" => "es",
        "it" | "ita" | "italiaans" | "italian" => "it",
        "pt" | "por" | "portugees" | "portuguese" => "pt",
        "fy" | "fry" | "fries" | "frisian" => "fy",
        "tr" | "tur" | "turks" | "turkish" => "tr",
        "ar" | "ara" | "arabisch" | "arabic" => "ar",
        other if other.len() == 2 && other.chars().all(|c| c.is_ascii_alphabetic()) => other,
        _ => "",
    };
    mapped.to_string()
}

/// Absolute https cover URL from a string, list or image-links object
pub fn normalize_cover_url(value: &Value) -> String {
    match value {
        Value::String(s) => {
            let url = s.trim();
            if let Some(rest) = url.strip_prefix("//") {
                format!("https://{}", rest)
            } else if let Some(rest) = url.strip_prefix("http://") {
                format!("https://{}", rest)
            } else if url.starts_with("https://") {
                url.to_string()
            } else {
                String::new()
            }
        }
        Value::Array(items) => items
            .iter()
            .map(normalize_cover_url)
            .find(|s| !s.is_empty())
            .unwrap_or_default(),
        Value::Object(map) => ["large", "medium", "thumbnail", "small", "smallThumbnail", "url"]
            .iter()
            .filter_map(|key| map.get(*key))
            .map(normalize_cover_url)
            .find(|s| !s.is_empty())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn first_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => FIRST_INTEGER
            .find(s)
            .and_then(|m| m.as_str().parse::<i64>().ok()),
        Value::Array(items) => items.iter().find_map(first_integer),
        _ => None,
    }
}

/// Publication year from `2015`, `"ca. 2015"`, `"2015-03-01"` and the like
pub fn normalize_published_year(value: &Value) -> Option<i32> {
    first_integer(value)
        .filter(|year| (1..=9999).contains(year))
        .map(|year| year as i32)
}

/// Page count from `321`, `"321 p."`, `"xii, 321 pages"` picks the first integer
pub fn normalize_page_count_value(value: &Value) -> Option<u32> {
    first_integer(value)
        .filter(|pages| *pages > 0 && *pages <= u32::MAX as i64)
        .map(|pages| pages as u32)
}

/// Split a tag/class cell on comma, semicolon, slash or newline
pub fn parse_multi_value_field(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => MULTI_VALUE_SEPARATOR
            .split(s)
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(map) => map.get("name").map(value_to_text).unwrap_or_default(),
                other => value_to_text(other),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::Null | Value::Object(_) => Vec::new(),
        other => {
            let text = value_to_text(other);
            if text.is_empty() {
                Vec::new()
            } else {
                vec![text]
            }
        }
    }
}

/// Truthy spreadsheet flag: true/1/yes/y/ja/on, case-insensitive
pub fn parse_boolean_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() == Some(1.0),
        Value::String(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "1" | "yes" | "y" | "ja" | "on"
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_barcode() {
        assert_eq!(normalize_barcode("978-90-123-4567-8"), "9789012345678");
        assert_eq!(normalize_barcode(" 90 123 456 x "), "90123456X");
        assert_eq!(normalize_barcode("x"), "X");
        assert_eq!(normalize_barcode("abc"), "");
        assert_eq!(normalize_barcode(""), "");
    }

    #[test]
    fn test_normalize_barcode_is_idempotent() {
        for raw in ["978-90-123-4567-8", "12345x", "ISBN 0 306 40615 2", "X", "--", "9x9X"] {
            let once = normalize_barcode(raw);
            assert_eq!(normalize_barcode(&once), once, "input {:?}", raw);
        }
    }

    #[test]
    fn test_barcode_from_numeric_cell() {
        assert_eq!(normalize_barcode_value(&json!(9781234567890.0)), "9781234567890");
        assert_eq!(normalize_barcode_value(&json!(12345)), "12345");
    }

    #[test]
    fn test_normalize_publisher() {
        assert_eq!(normalize_publisher(&json!(" Querido ")), "Querido");
        assert_eq!(normalize_publisher(&json!([{ "name": "Lemniscaat" }])), "Lemniscaat");
        assert_eq!(normalize_publisher(&json!(["", "Ploegsma"])), "Ploegsma");
        assert_eq!(normalize_publisher(&json!(null)), "");
    }

    #[test]
    fn test_normalize_language_code() {
        assert_eq!(normalize_language_code(&json!("dut")), "nl");
        assert_eq!(normalize_language_code(&json!("NL")), "nl");
        assert_eq!(normalize_language_code(&json!("en-US")), "en");
        assert_eq!(normalize_language_code(&json!([{ "key": "/languages/ger" }])), "de");
        assert_eq!(normalize_language_code(&json!("Nederlands")), "nl");
        assert_eq!(normalize_language_code(&json!("klingon")), "");
        assert_eq!(normalize_language_code(&json!(42)), "");
    }

    #[test]
    fn test_normalize_cover_url() {
        assert_eq!(
            normalize_cover_url(&json!("http://books.google.com/x.jpg")),
            "https://books.google.com/x.jpg"
        );
        assert_eq!(
            normalize_cover_url(&json!({ "small": "https://a/s.jpg", "large": "https://a/l.jpg" })),
            "https://a/l.jpg"
        );
        assert_eq!(normalize_cover_url(&json!("not a url")), "");
    }

    #[test]
    fn test_normalize_published_year() {
        assert_eq!(normalize_published_year(&json!("ca. 2015")), Some(2015));
        assert_eq!(normalize_published_year(&json!("2010-05-01")), Some(2010));
        assert_eq!(normalize_published_year(&json!(1999)), Some(1999));
        assert_eq!(normalize_published_year(&json!(2001.0)), Some(2001));
        assert_eq!(normalize_published_year(&json!("onbekend")), None);
        assert_eq!(normalize_published_year(&json!(null)), None);
    }

    #[test]
    fn test_normalize_page_count() {
        assert_eq!(normalize_page_count_value(&json!("321 p.")), Some(321));
        assert_eq!(normalize_page_count_value(&json!(0)), None);
        assert_eq!(normalize_page_count_value(&json!(["", "120"])), Some(120));
    }

    #[test]
    fn test_parse_multi_value_field() {
        assert_eq!(
            parse_multi_value_field(&json!("avontuur; humor / dieren,\nspanning")),
            vec!["avontuur", "humor", "dieren", "spanning"]
        );
        assert_eq!(parse_multi_value_field(&json!([" a ", "", 3])), vec!["a", "3"]);
        assert!(parse_multi_value_field(&json!(" , ; ")).is_empty());
        assert!(parse_multi_value_field(&json!(null)).is_empty());
    }

    #[test]
    fn test_parse_boolean_flag() {
        for truthy in ["true", "1", "YES", "y", "Ja", "on"] {
            assert!(parse_boolean_flag(&json!(truthy)), "{}", truthy);
        }
        for falsy in ["nee", "0", "", "maybe"] {
            assert!(!parse_boolean_flag(&json!(falsy)), "{}", falsy);
        }
        assert!(parse_boolean_flag(&json!(true)));
        assert!(parse_boolean_flag(&json!(1)));
        assert!(!parse_boolean_flag(&json!(null)));
    }
}
