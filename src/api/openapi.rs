//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, classes, folders, health, history, imports, loans, students, teachers};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "School Library API",
        version = "1.0.0",
        description = "Lending, catalog and bulk import API for a school library"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::logout,
        auth::me,
        auth::change_password,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::lookup_barcode,
        books::isbn_lookup,
        // Loans
        loans::check_out,
        loans::check_in,
        loans::check_out_by_barcode,
        loans::check_in_by_barcode,
        loans::student_loans,
        loans::overdue,
        // Students
        students::list_students,
        students::get_student,
        students::create_student,
        students::update_student,
        students::delete_student,
        students::student_history,
        // Teachers
        teachers::list_staff,
        teachers::create_staff,
        teachers::delete_staff,
        // Classes
        classes::list_classes,
        classes::get_class,
        classes::create_class,
        classes::rename_class,
        classes::delete_class,
        classes::add_student,
        classes::remove_student,
        classes::add_teacher,
        classes::remove_teacher,
        // Folders
        folders::list_folders,
        folders::create_folder,
        folders::update_folder,
        folders::delete_folder,
        // Imports
        imports::import_books,
        imports::import_students,
        imports::import_teachers,
        // History
        history::query_history,
        history::public_feed,
    ),
    components(
        schemas(
            // Auth
            crate::models::session::LoginRequest,
            crate::models::session::LoginResponse,
            crate::models::session::ChangePasswordRequest,
            crate::models::identity::IdentityView,
            crate::models::Role,
            // Books
            crate::models::Book,
            crate::models::BookStatus,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::BarcodeGroup,
            crate::models::BarcodeLookup,
            crate::models::IsbnMetadata,
            books::TitleQuery,
            // Loans
            crate::models::loan::CheckOut,
            crate::models::loan::CheckIn,
            crate::models::loan::BarcodeLoan,
            crate::models::loan::LoanOutcome,
            crate::models::loan::OverdueLoan,
            crate::models::person::StudentLoan,
            crate::models::LoanRecord,
            // People
            crate::models::person::StudentView,
            crate::models::person::StudentDetails,
            crate::models::person::CreateStudent,
            crate::models::person::UpdateStudent,
            crate::models::person::StaffView,
            crate::models::person::CreateStaff,
            crate::models::person::CreatedStudent,
            crate::models::person::CreatedStaff,
            crate::models::StaffRole,
            // Classes and folders
            crate::models::Class,
            crate::models::Folder,
            crate::models::class::CreateClass,
            crate::models::class::SaveFolder,
            // Imports
            imports::ImportRequest,
            crate::models::ImportReport,
            crate::models::ImportRowResult,
            crate::models::ImportAction,
            crate::models::SkippedRow,
            // History
            crate::models::HistoryEntry,
            crate::models::HistoryKind,
            crate::models::history::PublicHistoryItem,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "books", description = "Catalog and barcode lookup"),
        (name = "loans", description = "Check-out and check-in"),
        (name = "students", description = "Student accounts"),
        (name = "teachers", description = "Staff accounts"),
        (name = "classes", description = "Classes and memberships"),
        (name = "folders", description = "Book folders"),
        (name = "imports", description = "Spreadsheet imports"),
        (name = "history", description = "History ledger")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
