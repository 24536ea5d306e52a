pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::review::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/diff", post(handlers::handle_diff))
        // Review sessions
        .route("/api/v1/reviews", post(handlers::handle_open_review))
        .route(
            "/api/v1/reviews/:id",
            get(handlers::handle_get_review).delete(handlers::handle_close_review),
        )
        .route("/api/v1/reviews/:id/toggle", post(handlers::handle_toggle))
        .route("/api/v1/reviews/:id/message", post(handlers::handle_message))
        .route(
            "/api/v1/reviews/:id/accept-all",
            post(handlers::handle_accept_all),
        )
        .route(
            "/api/v1/reviews/:id/reject-all",
            post(handlers::handle_reject_all),
        )
        .route(
            "/api/v1/reviews/:id/reconstruct",
            get(handlers::handle_reconstruct),
        )
        .route("/api/v1/reviews/:id/save", post(handlers::handle_save))
        .route(
            "/api/v1/reviews/:id/rewrite",
            post(handlers::handle_start_rewrite)
                .get(handlers::handle_rewrite_status)
                .delete(handlers::handle_cancel_rewrite),
        )
        // Keyword sessions
        .route("/api/v1/keywords", post(handlers::handle_open_keywords))
        .route(
            "/api/v1/keywords/:id",
            get(handlers::handle_get_keywords).delete(handlers::handle_close_keywords),
        )
        .route(
            "/api/v1/keywords/:id/events",
            post(handlers::handle_keyword_event),
        )
        .route("/api/v1/keywords/:id/select", post(handlers::handle_select))
        .route(
            "/api/v1/keywords/:id/final",
            get(handlers::handle_final_keywords),
        )
        .with_state(state)
}
