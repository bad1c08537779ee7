//! Read routes that resolve an owner's image through the media service before streaming.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::Response,
};
use stayspot_core::{AppError, OwnerRef, ValidationError};
use std::sync::Arc;

/// `GET /users/{id}/profile-image`
#[tracing::instrument(skip(state), fields(operation = "get_profile_image"))]
pub async fn get_profile_image(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Response, HttpAppError> {
    let owner = OwnerRef::user(user_id);
    let name = state
        .media
        .get_for_owner(&owner)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No profile image for {}", owner)))?;

    state.gateway.serve(&name).await
}

/// `GET /listings/{id}/images/{index}`
#[tracing::instrument(skip(state), fields(operation = "get_listing_image"))]
pub async fn get_listing_image(
    State(state): State<Arc<AppState>>,
    Path((listing_id, index)): Path<(String, String)>,
) -> Result<Response, HttpAppError> {
    serve_set_item(&state, OwnerRef::listing(listing_id), index).await
}

/// `GET /blogs/{id}/images/{index}`
#[tracing::instrument(skip(state), fields(operation = "get_blog_image"))]
pub async fn get_blog_image(
    State(state): State<Arc<AppState>>,
    Path((post_id, index)): Path<(String, String)>,
) -> Result<Response, HttpAppError> {
    serve_set_item(&state, OwnerRef::blog_post(post_id), index).await
}

async fn serve_set_item(
    state: &AppState,
    owner: OwnerRef,
    index: String,
) -> Result<Response, HttpAppError> {
    let index = index
        .parse::<usize>()
        .map_err(|_| AppError::from(ValidationError::InvalidIndex(index.clone())))?;
    let name = state.media.get_set_item(&owner, index).await?;
    state.gateway.serve(&name).await
}
