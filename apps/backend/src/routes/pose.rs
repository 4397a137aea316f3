use actix_web::{web, HttpResponse};
use tracing::info;

use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::extractors::ImageUpload;
use crate::state::app_state::AppState;

/// POST /api/pose/detect (multipart, field `file`)
async fn detect(
    upload: ImageUpload,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let received = upload.bytes.len();
    info!(
        bytes = received,
        filename = upload.filename.as_deref().unwrap_or(""),
        "pose frame received"
    );

    let pose = app_state.pose();
    let bytes = upload.bytes;
    let result = web::block(move || pose.detect(&bytes))
        .await
        .map_err(|e| {
            AppError::internal(
                ErrorCode::PoseDetectionFailed,
                format!("detection failed: {e}"),
            )
        })??;

    info!(
        bytes = received,
        num_persons = result.num_persons,
        keypoints = result.keypoints.len(),
        annotated_base64_len = result.annotated_image_base64.len(),
        "pose detection complete"
    );

    Ok(HttpResponse::Ok().json(result))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/detect", web::post().to(detect));
}
