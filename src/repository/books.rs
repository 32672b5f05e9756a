//! Book lookups over the library document

use crate::{
    error::{AppError, AppResult},
    models::{book::BookQuery, Book, Folder, LibraryDocument},
    normalize::{normalize_barcode, same_key},
};

impl LibraryDocument {
    /// Get book by ID
    pub fn book(&self, id: &str) -> AppResult<&Book> {
        self.books
            .iter()
            .find(|b| b.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    pub fn book_mut(&mut self, id: &str) -> AppResult<&mut Book> {
        self.books
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// All copies whose barcode normalizes to the same value as `barcode`
    pub fn books_by_barcode(&self, barcode: &str) -> Vec<&Book> {
        let wanted = normalize_barcode(barcode);
        if wanted.is_empty() {
            return Vec::new();
        }
        self.books
            .iter()
            .filter(|b| normalize_barcode(&b.barcode) == wanted)
            .collect()
    }

    /// Whether `barcode` is used by a book other than those in `except_ids`
    pub fn barcode_in_use(&self, barcode: &str, except_ids: &[&str]) -> bool {
        self.books_by_barcode(barcode)
            .iter()
            .any(|b| !except_ids.contains(&b.id.as_str()))
    }

    /// Search books with filters, ordered by title
    pub fn search_books(&self, query: &BookQuery) -> Vec<&Book> {
        let needle = query
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut books: Vec<&Book> = self
            .books
            .iter()
            .filter(|b| match &query.folder_id {
                Some(folder) => b.folder_id.as_deref() == Some(folder.as_str()),
                None => true,
            })
            .filter(|b| query.status.map_or(true, |status| b.status == status))
            .filter(|b| match &needle {
                Some(n) => {
                    b.title.to_lowercase().contains(n)
                        || b.author.to_lowercase().contains(n)
                        || normalize_barcode(n) == normalize_barcode(&b.barcode)
                }
                None => true,
            })
            .collect();
        books.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
        books
    }

    /// Delete a book and drop it from any student's loan list
    pub fn remove_book(&mut self, id: &str) -> AppResult<Book> {
        let index = self
            .books
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;
        let book = self.books.remove(index);

        for student in &mut self.students {
            student.borrowed_books.retain(|loan| loan.book_id != id);
        }
        Ok(book)
    }

    pub fn folder(&self, id: &str) -> AppResult<&Folder> {
        self.folders
            .iter()
            .find(|f| f.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Folder with id {} not found", id)))
    }

    pub fn folder_mut(&mut self, id: &str) -> AppResult<&mut Folder> {
        self.folders
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Folder with id {} not found", id)))
    }

    /// Remove a folder and clear it from books
    pub fn remove_folder(&mut self, id: &str) -> AppResult<()> {
        let before = self.folders.len();
        self.folders.retain(|f| f.id != id);
        if self.folders.len() == before {
            return Err(AppError::NotFound(format!("Folder with id {} not found", id)));
        }
        for book in &mut self.books {
            if book.folder_id.as_deref() == Some(id) {
                book.folder_id = None;
            }
        }
        Ok(())
    }

    /// Resolve a folder reference by id or case-insensitive name
    pub fn find_folder_id(&self, reference: &str) -> Option<String> {
        let reference = reference.trim();
        self.folders
            .iter()
            .find(|f| f.id == reference || same_key(&f.name, reference))
            .map(|f| f.id.clone())
    }
}
