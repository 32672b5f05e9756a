//! Catalog management: books and folders

use chrono::Utc;
use serde_json::Value;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{BookQuery, CreateBook, UpdateBook},
        class::SaveFolder,
        new_id, Book, Folder, HistoryKind, LibraryDocument, NewHistoryEntry,
    },
    normalize::{normalize_barcode, normalize_cover_url, normalize_language_code, same_key},
    repository::Repository,
    services::assign,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags.into_iter().map(|t| t.trim().to_string()) {
        if !tag.is_empty() && !out.iter().any(|t| same_key(t, &tag)) {
            out.push(tag);
        }
    }
    out
}

fn language(raw: &str) -> String {
    normalize_language_code(&Value::String(raw.to_string()))
}

fn cover(raw: &str) -> String {
    normalize_cover_url(&Value::String(raw.to_string()))
}

/// Resolve an optional folder reference; blank means none
fn resolve_folder(doc: &LibraryDocument, reference: Option<&str>) -> AppResult<Option<String>> {
    match reference.map(str::trim).filter(|r| !r.is_empty()) {
        Some(reference) => doc
            .find_folder_id(reference)
            .map(Some)
            .ok_or_else(|| AppError::NotFound(format!("Folder {} not found", reference))),
        None => Ok(None),
    }
}

/// A barcode may only be shared by copies of the same title
fn ensure_barcode_free_for(doc: &LibraryDocument, barcode: &str, title: &str, book_id: &str) -> AppResult<()> {
    let clash = doc
        .books_by_barcode(barcode)
        .into_iter()
        .any(|b| b.id != book_id && !same_key(&b.title, title));
    if clash {
        return Err(AppError::Conflict(format!(
            "Barcode {} is already used by another title",
            barcode
        )));
    }
    Ok(())
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_books(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let doc = self.repository.snapshot().await?;
        Ok(doc.search_books(query).into_iter().cloned().collect())
    }

    pub async fn get_book(&self, id: &str) -> AppResult<Book> {
        let doc = self.repository.snapshot().await?;
        doc.book(id).cloned()
    }

    /// Create one or more copies
    pub async fn create_book(&self, request: CreateBook) -> AppResult<Vec<Book>> {
        request.validate()?;
        let barcode = normalize_barcode(&request.barcode);
        if barcode.is_empty() {
            return Err(AppError::Validation("Barcode must contain digits".to_string()));
        }
        if request.title.trim().is_empty() || request.author.trim().is_empty() {
            return Err(AppError::Validation("Title and author are required".to_string()));
        }

        let mut tx = self.repository.begin().await?;
        if tx.doc().barcode_in_use(&barcode, &[]) {
            if !request.as_copy {
                return Err(AppError::Conflict(format!("Barcode {} is already in use", barcode)));
            }
            ensure_barcode_free_for(tx.doc(), &barcode, &request.title, "")?;
        }
        let folder_id = resolve_folder(tx.doc(), request.folder_id.as_deref())?;

        let mut template = Book::new(&barcode, &request.title, &request.author);
        template.folder_id = folder_id;
        template.description = request.description.unwrap_or_default().trim().to_string();
        template.tags = clean_tags(request.tags.unwrap_or_default());
        template.publisher = request.publisher.unwrap_or_default().trim().to_string();
        template.published_year = request.published_year;
        template.page_count = request.page_count.filter(|p| *p > 0);
        template.language = language(request.language.as_deref().unwrap_or_default());
        template.cover_url = cover(request.cover_url.as_deref().unwrap_or_default());
        template.cover_color = request.cover_color.unwrap_or_default().trim().to_string();
        template.suitable_for_exam_list = request.suitable_for_exam_list.unwrap_or(false);

        let count = request.copies.unwrap_or(1).max(1) as usize;
        let created: Vec<Book> = (0..count)
            .map(|_| Book {
                id: new_id(),
                ..template.clone()
            })
            .collect();

        let doc = tx.doc_mut();
        doc.books.extend(created.iter().cloned());
        doc.append_history(
            NewHistoryEntry::new(
                HistoryKind::BookCreated,
                format!("Added {} copy(ies) of \"{}\"", count, template.title),
            )
            .book(&created[0].id, &template.title),
        );
        tx.commit().await?;

        tracing::info!("Created {} copy(ies) of {} ({})", count, template.title, barcode);
        Ok(created)
    }

    /// Merge the supplied fields into a copy
    pub async fn update_book(&self, id: &str, request: UpdateBook) -> AppResult<Book> {
        let mut tx = self.repository.begin().await?;
        let current = tx.doc().book(id)?.clone();
        let mut book = current.clone();
        let mut changed = false;

        if let Some(title) = request.title.map(|t| t.trim().to_string()) {
            if title.is_empty() {
                return Err(AppError::Validation("Title must not be empty".to_string()));
            }
            changed |= assign(&mut book.title, title);
        }
        if let Some(author) = request.author.map(|a| a.trim().to_string()) {
            if author.is_empty() {
                return Err(AppError::Validation("Author must not be empty".to_string()));
            }
            changed |= assign(&mut book.author, author);
        }
        if let Some(barcode) = request.barcode {
            let barcode = normalize_barcode(&barcode);
            if barcode.is_empty() {
                return Err(AppError::Validation("Barcode must contain digits".to_string()));
            }
            changed |= assign(&mut book.barcode, barcode);
        }
        if book.barcode != current.barcode || book.title != current.title {
            ensure_barcode_free_for(tx.doc(), &book.barcode, &book.title, id)?;
        }
        if let Some(folder) = request.folder_id {
            let folder_id = resolve_folder(tx.doc(), Some(&folder))?;
            changed |= assign(&mut book.folder_id, folder_id);
        }
        if let Some(description) = request.description {
            changed |= assign(&mut book.description, description.trim().to_string());
        }
        if let Some(tags) = request.tags {
            changed |= assign(&mut book.tags, clean_tags(tags));
        }
        if let Some(publisher) = request.publisher {
            changed |= assign(&mut book.publisher, publisher.trim().to_string());
        }
        if let Some(year) = request.published_year {
            changed |= assign(&mut book.published_year, Some(year));
        }
        if let Some(pages) = request.page_count {
            changed |= assign(&mut book.page_count, Some(pages).filter(|p| *p > 0));
        }
        if let Some(lang) = request.language {
            changed |= assign(&mut book.language, language(&lang));
        }
        if let Some(url) = request.cover_url {
            changed |= assign(&mut book.cover_url, cover(&url));
        }
        if let Some(color) = request.cover_color {
            changed |= assign(&mut book.cover_color, color.trim().to_string());
        }
        if let Some(flag) = request.suitable_for_exam_list {
            changed |= assign(&mut book.suitable_for_exam_list, flag);
        }

        if !changed {
            return Ok(current);
        }

        book.updated_at = Some(Utc::now());
        let title = book.title.clone();
        *tx.doc_mut().book_mut(id)? = book.clone();
        tx.doc_mut().append_history(
            NewHistoryEntry::new(HistoryKind::BookUpdated, format!("Updated \"{}\"", title))
                .book(id, &title),
        );
        tx.commit().await?;

        tracing::info!("Updated book {}", id);
        Ok(book)
    }

    /// Delete a copy; any loan record pointing at it goes too
    pub async fn delete_book(&self, id: &str) -> AppResult<()> {
        let mut tx = self.repository.begin().await?;
        let book = tx.doc_mut().remove_book(id)?;
        if !book.is_available() {
            tracing::warn!("Deleted book {} while it was borrowed", id);
        }
        tx.doc_mut().append_history(
            NewHistoryEntry::new(HistoryKind::BookDeleted, format!("Deleted \"{}\"", book.title))
                .book(id, &book.title),
        );
        tx.commit().await?;

        tracing::info!("Deleted book {}", id);
        Ok(())
    }

    pub async fn list_folders(&self) -> AppResult<Vec<Folder>> {
        let doc = self.repository.snapshot().await?;
        let mut folders = doc.folders;
        folders.sort_by_key(|f| f.name.to_lowercase());
        Ok(folders)
    }

    pub async fn create_folder(&self, request: SaveFolder) -> AppResult<Folder> {
        request.validate()?;
        let name = request.name.trim().to_string();

        let mut tx = self.repository.begin().await?;
        if tx.doc().folders.iter().any(|f| same_key(&f.name, &name)) {
            return Err(AppError::Conflict(format!("Folder {} already exists", name)));
        }

        let folder = Folder {
            id: new_id(),
            name,
            description: request.description.unwrap_or_default().trim().to_string(),
            color: request.color.unwrap_or_default().trim().to_string(),
            exam_list: request.exam_list.unwrap_or(false),
        };
        tx.doc_mut().folders.push(folder.clone());
        tx.doc_mut().append_history(NewHistoryEntry::new(
            HistoryKind::FolderChanged,
            format!("Folder \"{}\" created", folder.name),
        ));
        tx.commit().await?;
        Ok(folder)
    }

    pub async fn update_folder(&self, id: &str, request: SaveFolder) -> AppResult<Folder> {
        request.validate()?;
        let name = request.name.trim().to_string();

        let mut tx = self.repository.begin().await?;
        if tx
            .doc()
            .folders
            .iter()
            .any(|f| f.id != id && same_key(&f.name, &name))
        {
            return Err(AppError::Conflict(format!("Folder {} already exists", name)));
        }

        let folder = tx.doc_mut().folder_mut(id)?;
        folder.name = name;
        if let Some(description) = request.description {
            folder.description = description.trim().to_string();
        }
        if let Some(color) = request.color {
            folder.color = color.trim().to_string();
        }
        if let Some(exam_list) = request.exam_list {
            folder.exam_list = exam_list;
        }
        let folder = folder.clone();

        tx.doc_mut().append_history(NewHistoryEntry::new(
            HistoryKind::FolderChanged,
            format!("Folder \"{}\" updated", folder.name),
        ));
        tx.commit().await?;
        Ok(folder)
    }

    /// Delete a folder; its books stay, unfiled
    pub async fn delete_folder(&self, id: &str) -> AppResult<()> {
        let mut tx = self.repository.begin().await?;
        let name = tx.doc().folder(id)?.name.clone();
        tx.doc_mut().remove_folder(id)?;
        tx.doc_mut().append_history(NewHistoryEntry::new(
            HistoryKind::FolderChanged,
            format!("Folder \"{}\" deleted", name),
        ));
        tx.commit().await?;
        Ok(())
    }
}
