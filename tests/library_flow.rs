//! End-to-end lending and import flow through the library API

use serde_json::json;
use std::{sync::Arc, time::Duration};

use school_library_server::{
    config::AppConfig,
    models::{history::HistoryQuery, BookImportOptions, HistoryKind, RowMap},
    repository::{JsonFileStore, MemoryStore, Repository},
    services::{
        isbn::{IsbnLookupSettings, IsbnService},
        Services,
    },
    AppError,
};

fn offline_isbn() -> IsbnService {
    IsbnService::new(
        Vec::new(),
        IsbnLookupSettings {
            enabled: false,
            ttl: Duration::from_secs(60),
            source_timeout: Duration::from_secs(1),
        },
    )
}

fn services(repository: Repository) -> Services {
    Services::with_isbn(repository, &AppConfig::default(), offline_isbn())
}

fn row(value: serde_json::Value) -> RowMap {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_import_then_lend_by_barcode() {
    let store = Arc::new(MemoryStore::default());
    let services = services(Repository::new(store.clone()));

    assert!(services.auth.ensure_bootstrap_admin().await.unwrap());
    let (admin, _) = services.auth.login("admin", "admin").await.unwrap();

    let students = services
        .imports
        .import_students(vec![
            row(json!({ "Naam": "Eva de Wit", "Gebruikersnaam": "eva", "Klas": "1A" })),
            row(json!({ "Naam": "Tim Smit", "Gebruikersnaam": "tim", "Klas": "1A, 2B" })),
        ])
        .await
        .unwrap();
    assert_eq!(students.created, 2);
    let eva_password = students.details[0].password.clone().unwrap();
    let eva_id = students.details[0].ids[0].clone();

    let (eva_session, eva_view) = services.auth.login("Eva", &eva_password).await.unwrap();
    assert!(eva_view.must_change_password);

    let books = services
        .imports
        .import_books(
            vec![
                row(json!({ "Titel": "De avonturen", "Auteur": "A. Auteur", "Barcode": "12345", "Aantal": 2 })),
                row(json!({ "Titel": "Het mysterie", "Auteur": "B. Auteur", "Barcode": "12345" })),
                row(json!({ "Titel": "Zonder code", "Auteur": "C. Auteur" })),
            ],
            BookImportOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(books.created, 2);
    assert_eq!(books.skipped.len(), 1);

    let lookup = services.loans.lookup_by_barcode("12345", None).await.unwrap();
    assert_eq!(lookup.groups.len(), 2);
    assert_eq!(lookup.groups[0].total_copies, 2);

    let err = services
        .loans
        .check_out_by_barcode("12345", None, &eva_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AmbiguousBarcode { .. }));

    let lent = services
        .loans
        .check_out_by_barcode("12345", Some("het mysterie"), &eva_id, None)
        .await
        .unwrap();
    assert_eq!(lent.book.title, "Het mysterie");
    assert_eq!(lent.student.borrowed_books.len(), 1);

    // only the copy Eva holds is a candidate, so no title is needed
    let returned = services
        .loans
        .check_in_by_barcode("12345", None, &eva_id)
        .await
        .unwrap();
    assert!(returned.book.is_available());
    assert!(returned.student.borrowed_books.is_empty());

    let own = services
        .history
        .query(&eva_session, &HistoryQuery::default())
        .await
        .unwrap();
    assert_eq!(own.len(), 2);
    assert_eq!(own[0].kind, HistoryKind::CheckIn);

    let all = services
        .history
        .query(&admin, &HistoryQuery::default())
        .await
        .unwrap();
    assert!(all.iter().any(|e| e.kind == HistoryKind::StudentsImported));
    assert!(all.iter().any(|e| e.kind == HistoryKind::BooksImported));

    let feed = services.history.public_feed(None).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].title, "Het mysterie");

    let doc = store.current();
    assert!(doc.class_links_consistent());
    assert_eq!(doc.classes.len(), 2);
}

#[tokio::test]
async fn test_document_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("library.json");

    let first = services(Repository::new(Arc::new(JsonFileStore::new(&path))));
    first.auth.ensure_bootstrap_admin().await.unwrap();
    first
        .imports
        .import_teachers(vec![row(json!({
            "Name": "Juf Ans",
            "Username": "ans",
            "Class": "3C",
            "Password": "welkom"
        }))])
        .await
        .unwrap();

    let second = services(Repository::new(Arc::new(JsonFileStore::new(&path))));
    assert!(!second.auth.ensure_bootstrap_admin().await.unwrap());
    let (claims, view) = second.auth.login("ans", "welkom").await.unwrap();
    assert_eq!(view.class_ids.len(), 1);
    assert!(claims.require_staff().is_ok());
    assert!(claims.require_admin().is_err());
}
