//! HTTP routes.

pub mod auth;
pub mod health;
pub mod resumes;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Multipart framing allowance on top of the largest accepted file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let upload_limit = usize::try_from(state.vault.policy().max_file_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    let cors = CorsLayer::new()
        .allow_origin(state.cors_origin.clone())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let files_root = state.files_root.clone();

    let mut app = Router::new()
        .route("/", get(health::ping))
        .route("/health", get(health::health))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/checkUser", get(auth::check_user))
        .route("/auth/password", post(auth::change_password))
        .route("/auth/google", get(auth::google_start))
        .route("/auth/google/callback", get(auth::google_callback))
        .route(
            "/resumes/upload",
            post(resumes::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/resumes", get(resumes::list))
        .route("/resumes/usage", get(resumes::usage))
        .route("/resumes/{id}", delete(resumes::delete));

    if let Some(root) = files_root {
        app = app.nest_service("/files", ServeDir::new(root));
    }

    app.with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
