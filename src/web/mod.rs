use crate::db::Database;
use axum::{
    Router,
    routing::{get, patch, post},
};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        AppState {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Lock the database for the duration of one handler.
    pub fn lock(&self) -> Result<MutexGuard<'_, Database>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Internal("database lock poisoned".to_string()))
    }
}

/// JSON handlers for subjects, courses, modules, and contents.
pub mod api;
mod errors;
mod handlers;

pub use errors::AppError;

/// Build the axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/healthz", get(handlers::healthz))
        .route(
            "/api/subjects",
            get(api::list_subjects).post(api::create_subject),
        )
        .route("/api/courses", get(api::catalog).post(api::create_course))
        .route("/api/my/courses", get(api::my_courses))
        .route(
            "/api/courses/{id}",
            get(api::get_course)
                .patch(api::update_course)
                .delete(api::delete_course),
        )
        .route(
            "/api/courses/{id}/modules",
            get(api::list_modules)
                .post(api::create_module)
                .put(api::save_modules),
        )
        .route("/api/courses/{id}/modules/order", post(api::order_modules))
        .route(
            "/api/modules/{id}",
            patch(api::update_module).delete(api::delete_module),
        )
        .route("/api/modules/{id}/contents", get(api::list_contents))
        .route("/api/modules/{id}/contents/order", post(api::order_contents))
        .route(
            "/api/modules/{id}/contents/{kind}",
            post(api::create_content),
        )
        .route(
            "/api/contents/{id}",
            get(api::get_content)
                .patch(api::update_content)
                .delete(api::delete_content),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the web server on the given address.
pub async fn serve(db_path: &std::path::Path, host: &str, port: u16) -> Result<(), String> {
    let db = Database::open(db_path)?;
    db.migrate()?;
    let app = create_router(AppState::new(db));
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("failed to bind to {addr}: {e}"))?;
    tracing::info!(%addr, db = %db_path.display(), "serving syllabus API");
    println!("Syllabus API: http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("server error: {e}"))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
