//! Routes for the Q&A server

pub mod admin;
pub mod ask;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    response::Html,
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Landing page with the upload form and chat box
const INDEX_HTML: &str = include_str!("../../../static/index.html");

/// Build all application routes
pub fn app_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/clearDB", get(admin::clear_db))
        // Uploads get a larger body limit
        .route(
            "/upload",
            post(upload::upload_file).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/ask", post(ask::ask_question))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
