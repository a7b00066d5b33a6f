//! Question endpoint

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{AskRequest, AskResponse};

/// POST /ask - Answer a question from the loaded documents
///
/// A question asked before any upload still gets HTTP 200; the body's
/// `status_code` is 400 in that case.
pub async fn ask_question(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>> {
    let query = request.validated_query()?;
    state.require_credential()?;

    let outcome = state.engine().ask(query).await?;
    Ok(Json(AskResponse::from(outcome)))
}
