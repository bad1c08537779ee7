use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::Response,
};
use std::sync::Arc;

/// `GET /files/{name}`: stream a stored file.
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, HttpAppError> {
    state.gateway.serve(&name).await
}
