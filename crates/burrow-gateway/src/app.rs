use axum::routing::{get, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{get_url_handler, health_handler, shorten_url_handler};
use crate::state::AppState;

pub struct App {}

impl App {
    /// Static routes take precedence over `/{short_code}`, so `health` and
    /// `shorten` are never resolved as codes.
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/shorten", put(shorten_url_handler))
            .route("/{short_code}", get(get_url_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
