//! School library server
//!
//! REST API over a single JSON library document.

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use school_library_server::{
    api,
    config::AppConfig,
    repository::{JsonFileStore, Repository},
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("school_library_server={},tower_http=debug", config.logging.level).into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting school library server v{}", env!("CARGO_PKG_VERSION"));

    let store = JsonFileStore::new(config.storage.data_file.clone());
    tracing::info!("Library document: {}", store.path().display());

    let repository = Repository::new(Arc::new(store));
    let services = Services::new(repository, &config)?;
    if !services.isbn.is_online() {
        tracing::warn!("ISBN metadata lookups are offline");
    }
    if services.auth.ensure_bootstrap_admin().await? {
        tracing::warn!("Created bootstrap administrator account; change its password");
    }

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };
    let app = create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .route("/auth/login", post(api::auth::login))
        .route("/auth/logout", post(api::auth::logout))
        .route("/auth/me", get(api::auth::me))
        .route("/auth/change-password", post(api::auth::change_password))
        // Books
        .route("/books", get(api::books::list_books).post(api::books::create_book))
        .route(
            "/books/:id",
            get(api::books::get_book)
                .put(api::books::update_book)
                .delete(api::books::delete_book),
        )
        .route("/books/by-barcode/:barcode", get(api::books::lookup_barcode))
        .route("/isbn/:isbn", get(api::books::isbn_lookup))
        // Loans
        .route("/loans/check-out", post(api::loans::check_out))
        .route("/loans/check-in", post(api::loans::check_in))
        .route("/loans/by-barcode/check-out", post(api::loans::check_out_by_barcode))
        .route("/loans/by-barcode/check-in", post(api::loans::check_in_by_barcode))
        .route("/loans/overdue", get(api::loans::overdue))
        // Students
        .route(
            "/students",
            get(api::students::list_students).post(api::students::create_student),
        )
        .route(
            "/students/:id",
            get(api::students::get_student)
                .put(api::students::update_student)
                .delete(api::students::delete_student),
        )
        .route("/students/:id/loans", get(api::loans::student_loans))
        .route("/students/:id/history", get(api::students::student_history))
        // Teachers
        .route(
            "/teachers",
            get(api::teachers::list_staff).post(api::teachers::create_staff),
        )
        .route("/teachers/:id", axum::routing::delete(api::teachers::delete_staff))
        // Classes
        .route(
            "/classes",
            get(api::classes::list_classes).post(api::classes::create_class),
        )
        .route(
            "/classes/:id",
            get(api::classes::get_class)
                .put(api::classes::rename_class)
                .delete(api::classes::delete_class),
        )
        .route(
            "/classes/:id/students/:student_id",
            post(api::classes::add_student).delete(api::classes::remove_student),
        )
        .route(
            "/classes/:id/teachers/:teacher_id",
            post(api::classes::add_teacher).delete(api::classes::remove_teacher),
        )
        // Folders
        .route(
            "/folders",
            get(api::folders::list_folders).post(api::folders::create_folder),
        )
        .route(
            "/folders/:id",
            axum::routing::put(api::folders::update_folder).delete(api::folders::delete_folder),
        )
        // Imports
        .route("/imports/books", post(api::imports::import_books))
        .route("/imports/students", post(api::imports::import_students))
        .route("/imports/teachers", post(api::imports::import_teachers))
        // History
        .route("/history", get(api::history::query_history))
        .route("/history/public", get(api::history::public_feed))
        .with_state(state);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
