//! Index maintenance endpoint

use axum::{extract::State, Json};

use crate::server::state::AppState;
use crate::types::ClearResponse;

/// GET /clearDB - Drop the vector index
pub async fn clear_db(State(state): State<AppState>) -> Json<ClearResponse> {
    let message = state.engine().clear().await;
    Json(ClearResponse { message })
}
