//! Header normalization and localized column aliases

use serde_json::Value;
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

use crate::{models::RowMap, normalize::value_to_text};

pub const TITLE: &[&str] = &["titel", "title", "boektitel"];
pub const AUTHOR: &[&str] = &["auteur", "author", "schrijver", "auteurs", "authors"];
pub const BARCODE: &[&str] = &["barcode", "isbn", "streepjescode", "ean", "isbn13", "isbn-13", "isbn10"];
pub const DESCRIPTION: &[&str] = &["beschrijving", "description", "omschrijving", "samenvatting"];
pub const TAGS: &[&str] = &["tags", "labels", "genre", "genres", "trefwoorden"];
pub const PUBLISHER: &[&str] = &["uitgever", "publisher"];
pub const YEAR: &[&str] = &["jaar", "year", "publicatiejaar", "jaar van uitgave", "published year", "publishedyear"];
pub const PAGES: &[&str] = &["pagina's", "paginas", "pages", "aantal pagina's", "aantal paginas", "page count", "pagecount"];
pub const LANGUAGE: &[&str] = &["taal", "language"];
pub const COVER: &[&str] = &["cover", "coverurl", "cover url", "omslag", "afbeelding"];
pub const COVER_COLOR: &[&str] = &["kleur", "omslagkleur", "cover color", "covercolor"];
pub const FOLDER: &[&str] = &["map", "folder", "categorie"];
pub const EXAM_LIST: &[&str] = &["leeslijst", "examenlijst", "exam list", "examlist", "geschikt voor leeslijst"];
pub const COPIES: &[&str] = &["aantal", "exemplaren", "aantal exemplaren", "copies"];
pub const ENRICH: &[&str] = &["verrijken", "opzoeken", "enrich", "lookup"];

pub const NAME: &[&str] = &["naam", "name", "volledige naam", "full name"];
pub const USERNAME: &[&str] = &["gebruikersnaam", "username", "login", "inlognaam"];
pub const PASSWORD: &[&str] = &["wachtwoord", "password"];
pub const CLASS: &[&str] = &["klas", "klassen", "class", "classes", "groep", "groepen"];
pub const GRADE: &[&str] = &["leerjaar", "grade", "jaargroep"];

/// Compatibility-fold, lowercase, trim and collapse inner whitespace
pub fn normalize_header(raw: &str) -> String {
    let folded: String = raw.nfkc().collect::<String>().replace(['\u{2019}', '`'], "'");
    folded
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// A row with normalized headers
pub struct Columns {
    cells: HashMap<String, Value>,
}

impl Columns {
    pub fn new(row: &RowMap) -> Self {
        let mut cells = HashMap::new();
        for (header, value) in row {
            let key = normalize_header(header);
            // first non-blank cell wins when two headers fold together
            if !key.is_empty() && !is_blank(value) && !cells.contains_key(&key) {
                cells.insert(key, value.clone());
            }
        }
        Self { cells }
    }

    /// Value of the first alias present with a non-blank cell
    pub fn get(&self, aliases: &[&str]) -> Option<&Value> {
        aliases.iter().find_map(|alias| self.cells.get(*alias))
    }

    /// Whether the row has the column at all
    pub fn has(&self, aliases: &[&str]) -> bool {
        self.get(aliases).is_some()
    }

    /// Trimmed text of the column, empty when absent
    pub fn text(&self, aliases: &[&str]) -> String {
        self.get(aliases).map(value_to_text).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_headers_fold_case_space_and_width() {
        assert_eq!(normalize_header("  Titel "), "titel");
        assert_eq!(normalize_header("Aantal   Pagina’s"), "aantal pagina's");
        assert_eq!(normalize_header("ＩＳＢＮ"), "isbn");
    }

    #[test]
    fn test_alias_lookup() {
        let mut row = RowMap::new();
        row.insert("TITLE".into(), json!("De reis"));
        row.insert("Schrijver".into(), json!(" Anna "));
        row.insert("Beschrijving".into(), json!("  "));
        row.insert("ISBN".into(), json!(9789045112345u64));
        let columns = Columns::new(&row);

        assert_eq!(columns.text(TITLE), "De reis");
        assert_eq!(columns.text(AUTHOR), "Anna");
        assert_eq!(columns.text(BARCODE), "9789045112345");
        assert!(!columns.has(DESCRIPTION));
        assert_eq!(columns.text(PUBLISHER), "");
    }
}
