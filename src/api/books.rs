//! Catalog endpoints: books, barcode lookup and ISBN metadata

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::{
        book::{BookQuery, CreateBook, UpdateBook},
        BarcodeLookup, Book, IsbnMetadata,
    },
};

use super::AuthenticatedUser;

/// Optional title narrowing a barcode to one group
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct TitleQuery {
    pub title: Option<String>,
}

/// List books with optional filters
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    params(BookQuery),
    responses(
        (status = 200, description = "Matching copies", body = Vec<Book>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.catalog.list_books(&query).await?;
    Ok(Json(books))
}

/// Get one copy by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(&id).await?;
    Ok(Json(book))
}

/// Create a book, optionally as several copies
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Copies created", body = Vec<Book>),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Barcode already in use")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<Vec<Book>>)> {
    claims.require_staff()?;

    let books = state.services.catalog.create_book(request).await?;
    Ok((StatusCode::CREATED, Json(books)))
}

/// Update the supplied fields of a copy
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Book ID")),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Barcode belongs to another title")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateBook>,
) -> AppResult<Json<Book>> {
    claims.require_staff()?;

    let book = state.services.catalog.update_book(&id, request).await?;
    Ok(Json(book))
}

/// Delete a copy
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.catalog.delete_book(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Copies under a barcode, grouped by title
#[utoipa::path(
    get,
    path = "/books/by-barcode/{barcode}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("barcode" = String, Path, description = "Barcode or ISBN"),
        TitleQuery
    ),
    responses(
        (status = 200, description = "Barcode groups", body = BarcodeLookup),
        (status = 404, description = "No copy with this barcode and title"),
        (status = 409, description = "Title does not match any group")
    )
)]
pub async fn lookup_barcode(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(barcode): Path<String>,
    Query(query): Query<TitleQuery>,
) -> AppResult<Json<BarcodeLookup>> {
    let lookup = state
        .services
        .loans
        .lookup_by_barcode(&barcode, query.title.as_deref())
        .await?;
    Ok(Json(lookup))
}

/// Bibliographic metadata for an ISBN
#[utoipa::path(
    get,
    path = "/isbn/{isbn}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("isbn" = String, Path, description = "ISBN-10 or ISBN-13")),
    responses(
        (status = 200, description = "Metadata; `found` is false when no source knows the ISBN", body = IsbnMetadata)
    )
)]
pub async fn isbn_lookup(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(isbn): Path<String>,
) -> AppResult<Json<IsbnMetadata>> {
    claims.require_staff()?;

    Ok(Json(state.services.isbn.lookup(&isbn).await))
}
