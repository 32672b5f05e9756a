//! Book import: match on barcode (and title when a barcode is shared), merge, enrich

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;

use super::{columns::*, mark, ImportService};
use crate::{
    error::{AppError, AppResult},
    models::{
        import_report::{BookImportOptions, ImportRowResult},
        new_id, Book, HistoryKind, ImportAction, ImportReport, IsbnMetadata, LibraryDocument,
        NewHistoryEntry, RowMap,
    },
    normalize::{
        normalize_barcode_value, normalize_cover_url, normalize_language_code,
        normalize_page_count_value, normalize_published_year, normalize_publisher,
        parse_boolean_flag, parse_multi_value_field, same_key, sanitize_isbn,
    },
    services::assign,
};

const MAX_COPIES: usize = 200;
const LOOKUP_CONCURRENCY: usize = 4;

/// Values read from one book row
#[derive(Debug)]
struct BookRow {
    title: String,
    author: String,
    barcode: String,
    description: String,
    tags: Vec<String>,
    publisher: String,
    published_year: Option<i32>,
    page_count: Option<u32>,
    language: String,
    cover_url: String,
    cover_color: String,
    folder: String,
    exam_list: Option<bool>,
    copies: Option<usize>,
    enrich: Option<bool>,
}

impl BookRow {
    /// Read a row; the error is the skip reason
    fn parse(columns: &Columns) -> Result<Self, String> {
        let title = columns.text(TITLE);
        let author = columns.text(AUTHOR);
        let barcode = columns.get(BARCODE).map(normalize_barcode_value).unwrap_or_default();

        let missing: Vec<&str> = [("title", &title), ("author", &author), ("barcode", &barcode)]
            .into_iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(field, _)| field)
            .collect();
        if !missing.is_empty() {
            return Err(format!("missing {}", missing.join(", ")));
        }

        Ok(Self {
            title,
            author,
            barcode,
            description: columns.text(DESCRIPTION),
            tags: columns.get(TAGS).map(parse_multi_value_field).unwrap_or_default(),
            publisher: columns.get(PUBLISHER).map(normalize_publisher).unwrap_or_default(),
            published_year: columns.get(YEAR).and_then(normalize_published_year),
            page_count: columns.get(PAGES).and_then(normalize_page_count_value),
            language: columns.get(LANGUAGE).map(normalize_language_code).unwrap_or_default(),
            cover_url: columns.get(COVER).map(normalize_cover_url).unwrap_or_default(),
            cover_color: columns.text(COVER_COLOR),
            folder: columns.text(FOLDER),
            exam_list: columns.get(EXAM_LIST).map(parse_boolean_flag),
            copies: columns
                .get(COPIES)
                .and_then(normalize_page_count_value)
                .map(|n| (n as usize).min(MAX_COPIES)),
            enrich: columns.get(ENRICH).map(parse_boolean_flag),
        })
    }
}

/// Overwrite fields the row supplies a value for
fn merge_row(book: &mut Book, row: &BookRow, folder_id: Option<&str>, changed: &mut Vec<String>) {
    mark(changed, "title", assign(&mut book.title, row.title.clone()));
    mark(changed, "author", assign(&mut book.author, row.author.clone()));
    if !row.description.is_empty() {
        mark(changed, "description", assign(&mut book.description, row.description.clone()));
    }
    if !row.tags.is_empty() {
        mark(changed, "tags", assign(&mut book.tags, row.tags.clone()));
    }
    if !row.publisher.is_empty() {
        mark(changed, "publisher", assign(&mut book.publisher, row.publisher.clone()));
    }
    if row.published_year.is_some() {
        mark(changed, "publishedYear", assign(&mut book.published_year, row.published_year));
    }
    if row.page_count.is_some() {
        mark(changed, "pageCount", assign(&mut book.page_count, row.page_count));
    }
    if !row.language.is_empty() {
        mark(changed, "language", assign(&mut book.language, row.language.clone()));
    }
    if !row.cover_url.is_empty() {
        mark(changed, "coverUrl", assign(&mut book.cover_url, row.cover_url.clone()));
    }
    if !row.cover_color.is_empty() {
        mark(changed, "coverColor", assign(&mut book.cover_color, row.cover_color.clone()));
    }
    if let Some(folder_id) = folder_id {
        mark(changed, "folderId", assign(&mut book.folder_id, Some(folder_id.to_string())));
    }
    if let Some(flag) = row.exam_list {
        mark(changed, "suitableForExamList", assign(&mut book.suitable_for_exam_list, flag));
    }
}

fn needs_enrichment(book: &Book) -> bool {
    book.description.is_empty()
        || book.publisher.is_empty()
        || book.published_year.is_none()
        || book.page_count.is_none()
        || book.language.is_empty()
        || book.cover_url.is_empty()
}

/// Fill bibliographic fields that are still empty
fn fill_from_metadata(book: &mut Book, meta: &IsbnMetadata, changed: &mut Vec<String>) {
    if book.description.is_empty() && !meta.description.is_empty() {
        book.description = meta.description.clone();
        mark(changed, "description", true);
    }
    if book.publisher.is_empty() && !meta.publisher.is_empty() {
        book.publisher = meta.publisher.clone();
        mark(changed, "publisher", true);
    }
    if book.published_year.is_none() && meta.published_year.is_some() {
        book.published_year = meta.published_year;
        mark(changed, "publishedYear", true);
    }
    if book.page_count.is_none() && meta.page_count.is_some() {
        book.page_count = meta.page_count;
        mark(changed, "pageCount", true);
    }
    if book.language.is_empty() && !meta.language.is_empty() {
        book.language = meta.language.clone();
        mark(changed, "language", true);
    }
    if book.cover_url.is_empty() && !meta.cover_url.is_empty() {
        book.cover_url = meta.cover_url.clone();
        mark(changed, "coverUrl", true);
    }
}

fn fresh_copy(template: &Book) -> Book {
    let mut copy = template.clone();
    copy.id = new_id();
    copy.mark_available();
    copy.created_at = Some(Utc::now());
    copy
}

impl BookRow {
    /// Whether the merged book could still have an empty bibliographic field
    fn lacks_bibliographic_fields(&self) -> bool {
        self.description.is_empty()
            || self.publisher.is_empty()
            || self.published_year.is_none()
            || self.page_count.is_none()
            || self.language.is_empty()
            || self.cover_url.is_empty()
    }
}

/// A parsed row waiting for reconciliation
struct PendingRow {
    number: usize,
    row: BookRow,
    enrich: bool,
}

impl ImportService {
    /// Reconcile book rows by barcode
    pub async fn import_books(&self, rows: Vec<RowMap>, options: BookImportOptions) -> AppResult<ImportReport> {
        if rows.is_empty() {
            return Err(AppError::Validation("No rows to import".to_string()));
        }
        let default_enrich = options.enrich.unwrap_or(self.enrich_by_default);

        let mut report = ImportReport::default();
        let mut pending = Vec::with_capacity(rows.len());
        for (index, raw) in rows.iter().enumerate() {
            let number = index + 1;
            match BookRow::parse(&Columns::new(raw)) {
                Ok(row) => {
                    let enrich = row.enrich.unwrap_or(default_enrich);
                    pending.push(PendingRow { number, row, enrich });
                }
                Err(reason) => report.skip(number, reason),
            }
        }

        // Lookups run before the writer lock is taken
        let metadata = self.prefetch_metadata(&pending).await;

        let mut tx = self.repository.begin().await?;
        let default_folder = match options.folder_id.as_deref().map(str::trim) {
            Some(reference) if !reference.is_empty() => Some(
                tx.doc()
                    .find_folder_id(reference)
                    .ok_or_else(|| AppError::NotFound(format!("Folder {} not found", reference)))?,
            ),
            _ => None,
        };

        for PendingRow { number, row, enrich } in pending {
            let lookups = if enrich { Some(&metadata) } else { None };
            match reconcile_book(tx.doc_mut(), number, row, lookups, default_folder.as_deref()) {
                Ok(result) => {
                    tracing::debug!("Book row {}: {:?}", number, result.action);
                    report.record(result);
                }
                Err(e) => report.skip(number, e.reason()),
            }
        }
        report.skipped.sort_by_key(|s| s.row);

        if report.has_changes() {
            let message = format!(
                "Book import: {} created, {} updated, {} unchanged, {} skipped",
                report.created,
                report.updated,
                report.unchanged,
                report.skipped.len()
            );
            tx.doc_mut()
                .append_history(NewHistoryEntry::new(HistoryKind::BooksImported, message.clone()));
            tx.commit().await?;
            tracing::info!("{}", message);
        } else {
            tracing::info!("Book import changed nothing ({} skipped)", report.skipped.len());
        }
        Ok(report)
    }

    /// Resolve metadata for every distinct ISBN an enriching row may need
    async fn prefetch_metadata(&self, pending: &[PendingRow]) -> HashMap<String, IsbnMetadata> {
        let mut isbns: Vec<String> = pending
            .iter()
            .filter(|p| p.enrich && p.row.lacks_bibliographic_fields())
            .filter_map(|p| sanitize_isbn(&p.row.barcode))
            .collect();
        isbns.sort();
        isbns.dedup();
        if !isbns.is_empty() {
            tracing::debug!("Resolving metadata for {} ISBNs", isbns.len());
        }

        stream::iter(isbns)
            .map(|isbn| async move {
                let meta = self.isbn.lookup(&isbn).await;
                (isbn, meta)
            })
            .buffer_unordered(LOOKUP_CONCURRENCY)
            .collect()
            .await
    }
}

fn reconcile_book(
    doc: &mut LibraryDocument,
    row_number: usize,
    row: BookRow,
    metadata: Option<&HashMap<String, IsbnMetadata>>,
    default_folder: Option<&str>,
) -> AppResult<ImportRowResult> {
    let mut warnings = Vec::new();
    let row_folder = if row.folder.is_empty() {
        None
    } else {
        let found = doc.find_folder_id(&row.folder);
        if found.is_none() {
            warnings.push(format!("unknown folder \"{}\" ignored", row.folder));
        }
        found
    };

    let target = doc
        .barcode_groups(&row.barcode)
        .into_iter()
        .find(|g| same_key(&g.title, &row.title));

    let mut changed = Vec::new();
    let Some(group) = target else {
        let mut book = Book::new(&row.barcode, &row.title, &row.author);
        merge_row(&mut book, &row, row_folder.as_deref().or(default_folder), &mut changed);
        if let Some(metadata) = metadata.filter(|_| needs_enrichment(&book)) {
            if let Some(meta) = metadata_for(&row.barcode, metadata, &mut warnings) {
                fill_from_metadata(&mut book, meta, &mut changed);
            }
        }

        let count = row.copies.unwrap_or(1).max(1);
        let mut ids = vec![book.id.clone()];
        let mut created = vec![book];
        for _ in 1..count {
            let copy = fresh_copy(&created[0]);
            ids.push(copy.id.clone());
            created.push(copy);
        }
        doc.books.extend(created);

        return Ok(ImportRowResult {
            row: row_number,
            action: ImportAction::Created,
            ids,
            label: row.title,
            changed_fields: Vec::new(),
            username: None,
            password: None,
            warnings,
        });
    };

    let mut merged = group
        .copy_ids
        .iter()
        .map(|id| doc.book(id).cloned())
        .collect::<AppResult<Vec<Book>>>()?;
    for book in &mut merged {
        merge_row(book, &row, row_folder.as_deref(), &mut changed);
    }
    if let Some(metadata) = metadata.filter(|_| needs_enrichment(&merged[0])) {
        if let Some(meta) = metadata_for(&row.barcode, metadata, &mut warnings) {
            for book in &mut merged {
                fill_from_metadata(book, meta, &mut changed);
            }
        }
    }

    let mut extra = Vec::new();
    if let Some(wanted) = row.copies {
        for _ in merged.len()..wanted {
            extra.push(fresh_copy(&merged[0]));
        }
        mark(&mut changed, "copies", !extra.is_empty());
    }

    let mut ids = group.copy_ids;
    if changed.is_empty() {
        return Ok(ImportRowResult {
            row: row_number,
            action: ImportAction::Unchanged,
            ids,
            label: row.title,
            changed_fields: Vec::new(),
            username: None,
            password: None,
            warnings,
        });
    }

    let now = Some(Utc::now());
    for mut book in merged {
        book.updated_at = now;
        let id = book.id.clone();
        *doc.book_mut(&id)? = book;
    }
    ids.extend(extra.iter().map(|b| b.id.clone()));
    doc.books.extend(extra);

    Ok(ImportRowResult {
        row: row_number,
        action: ImportAction::Updated,
        ids,
        label: row.title,
        changed_fields: changed,
        username: None,
        password: None,
        warnings,
    })
}

/// Prefetched metadata for a barcode, or a warning explaining why there is none
fn metadata_for<'a>(
    barcode: &str,
    metadata: &'a HashMap<String, IsbnMetadata>,
    warnings: &mut Vec<String>,
) -> Option<&'a IsbnMetadata> {
    let Some(isbn) = sanitize_isbn(barcode) else {
        warnings.push("barcode is not an ISBN; metadata lookup skipped".to_string());
        return None;
    };
    match metadata.get(&isbn) {
        Some(meta) if meta.found => Some(meta),
        Some(meta) => {
            warnings.push(format!("no metadata found (source: {})", meta.source));
            None
        }
        None => {
            warnings.push("no metadata found".to_string());
            None
        }
    }
}
