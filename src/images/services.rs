use tracing::info;

use super::dto::{UploadCompleteResponse, UploadUrlResponse};
use crate::{domain::ImageId, error::AppError, state::AppState};

/// Reserves a new image id and returns a pre-signed PUT URL for it on the upload bucket.
pub async fn get_upload_url(st: &AppState) -> Result<UploadUrlResponse, AppError> {
    let image_id = ImageId::generate();
    let presigned_url = st
        .storage
        .presign_upload(image_id)
        .await
        .map_err(AppError::FailedToGeneratePresignedUrl)?;
    info!(%image_id, "upload url issued");
    Ok(UploadUrlResponse {
        image_id: image_id.value(),
        presigned_url,
    })
}

/// Promotes an uploaded image to the distribution bucket without creating a meal.
pub async fn complete_upload(
    st: &AppState,
    image_id: ImageId,
) -> Result<UploadCompleteResponse, AppError> {
    st.storage
        .copy_to_distribution(image_id)
        .await
        .map_err(AppError::FailedToCopyImage)?;
    Ok(UploadCompleteResponse {
        image_url: st.storage.distribution_url(image_id),
    })
}
