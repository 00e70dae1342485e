use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::handlers::{self, AppState};

/// Full gateway route table
///
/// Paths are part of the contract with consumer middleware and must stay
/// stable.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::start))
        .route("/callback", get(handlers::callback))
        .route("/debug", get(handlers::debug))
        .route("/profile", get(handlers::profile))
        .route("/emails", get(handlers::emails))
        .route("/files", get(handlers::files))
        .route("/dashboard", get(handlers::dashboard))
        .route("/logout", get(handlers::logout))
        .route("/admin-consent", get(handlers::admin_consent))
        .route("/api/exchange", post(handlers::exchange))
        .route("/api/handoff", post(handlers::handoff))
        .route("/api/user/{id}", get(handlers::get_user).delete(handlers::delete_user))
        .route("/api/users", get(handlers::list_users))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
