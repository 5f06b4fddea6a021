use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{UploadCompleteResponse, UploadUrlResponse};
use super::services;
use crate::{auth::CurrentUser, domain::ImageId, error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/images/upload-url", get(get_upload_url))
        .route("/images/:image_id/upload/complete", post(complete_upload))
}

#[instrument(skip(state))]
pub async fn get_upload_url(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<UploadUrlResponse>, AppError> {
    services::get_upload_url(&state).await.map(Json)
}

#[instrument(skip(state))]
pub async fn complete_upload(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(image_id): Path<Uuid>,
) -> Result<Json<UploadCompleteResponse>, AppError> {
    services::complete_upload(&state, ImageId(image_id))
        .await
        .map(Json)
}
