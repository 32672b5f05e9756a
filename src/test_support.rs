//! Fixtures shared by unit tests

use chrono::Utc;
use std::sync::Arc;

use crate::{
    models::{new_id, Book, Class, LibraryDocument, StaffAccount, StaffRole, Student},
    repository::{MemoryStore, Repository},
};

pub fn book(barcode: &str, title: &str) -> Book {
    Book::new(barcode, title, "Auteur")
}

pub fn student(name: &str, username: &str) -> Student {
    Student {
        id: new_id(),
        name: name.to_string(),
        grade: String::new(),
        username: username.to_string(),
        password_hash: crate::services::auth::hash_password("geheim"),
        must_change_password: false,
        class_ids: Vec::new(),
        borrowed_books: Vec::new(),
        created_at: Some(Utc::now()),
    }
}

pub fn staff(name: &str, username: &str, role: StaffRole) -> StaffAccount {
    StaffAccount {
        id: new_id(),
        role,
        name: name.to_string(),
        username: username.to_string(),
        password_hash: crate::services::auth::hash_password("geheim"),
        must_change_password: false,
        class_ids: Vec::new(),
        created_at: Some(Utc::now()),
    }
}

pub fn class(name: &str) -> Class {
    Class::new(name)
}

/// Repository over an in-memory store seeded with `document`
pub fn repository(document: LibraryDocument) -> (Repository, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new(document));
    (Repository::new(store.clone()), store)
}
