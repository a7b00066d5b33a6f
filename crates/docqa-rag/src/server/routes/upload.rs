//! Document upload endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};
use std::path::Path;

use crate::error::{Error, Result};
use crate::ingestion::DocumentLoader;
use crate::server::state::AppState;
use crate::types::UploadResponse;

/// Multipart field carrying the document
const FILE_FIELD: &str = "file";

/// POST /upload - Save a document and add it to the index
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    state.require_credential()?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidRequest(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = upload_file_name(field.file_name())?;
        DocumentLoader::detect(Path::new(&filename))?;

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidRequest(format!("Failed to read file: {}", e)))?;

        let uploads_dir = &state.config().storage.uploads_dir;
        tokio::fs::create_dir_all(uploads_dir).await?;
        let path = uploads_dir.join(&filename);
        tokio::fs::write(&path, &data).await?;
        tracing::info!("Saved upload {} ({} bytes)", path.display(), data.len());

        state.engine().load(&path).await?;
        return Ok(Json(UploadResponse::processed(&filename)));
    }

    Err(Error::InvalidRequest(format!(
        "multipart field '{}' is required",
        FILE_FIELD
    )))
}

/// Keep only the last component of a client-supplied file name
fn upload_file_name(raw: Option<&str>) -> Result<String> {
    let name = raw
        .unwrap_or_default()
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::InvalidRequest(
            "uploaded file must have a file name".to_string(),
        ));
    }
    Ok(name.to_string())
}
