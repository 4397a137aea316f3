use actix_multipart::Multipart;
use actix_web::dev::Payload;
use actix_web::http::StatusCode;
use actix_web::{FromRequest, HttpRequest};
use bytes::{Bytes, BytesMut};
use futures_util::future::LocalBoxFuture;
use futures_util::StreamExt;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::trace_ctx;

/// Multipart field that carries the image.
pub const UPLOAD_FIELD: &str = "file";
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Image bytes taken from the `file` part of a multipart form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Bytes,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

/// `image/*` and `application/octet-stream` are accepted; so is a part that
/// declares no content type at all.
pub fn is_accepted_content_type(content_type: Option<&str>) -> bool {
    let Some(raw) = content_type else {
        return true;
    };
    let essence = raw
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.starts_with("image/") || essence == "application/octet-stream"
}

fn multipart_error(e: impl std::fmt::Display) -> AppError {
    warn!(trace_id = %trace_ctx::trace_id(), error = %e, "malformed multipart upload");
    AppError::bad_request(ErrorCode::BadRequest, "Malformed multipart form data")
}

impl FromRequest for ImageUpload {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let mut multipart = Multipart::new(req.headers(), payload.take());

        Box::pin(async move {
            while let Some(item) = multipart.next().await {
                let mut field = item.map_err(multipart_error)?;
                if field.name() != Some(UPLOAD_FIELD) {
                    // Drain parts we do not care about so the stream can advance
                    while let Some(chunk) = field.next().await {
                        chunk.map_err(multipart_error)?;
                    }
                    continue;
                }

                let content_type = field.content_type().map(|m| m.essence_str().to_string());
                if !is_accepted_content_type(content_type.as_deref()) {
                    return Err(AppError::bad_request(
                        ErrorCode::InvalidContentType,
                        "Please upload an image file",
                    ));
                }
                let filename = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .map(str::to_string);

                let mut body = BytesMut::new();
                while let Some(chunk) = field.next().await {
                    let chunk = chunk.map_err(multipart_error)?;
                    if body.len() + chunk.len() > MAX_UPLOAD_BYTES {
                        return Err(AppError::Validation {
                            code: ErrorCode::ValidationError,
                            detail: format!("Image exceeds {MAX_UPLOAD_BYTES} bytes"),
                            status: StatusCode::PAYLOAD_TOO_LARGE,
                        });
                    }
                    body.extend_from_slice(&chunk);
                }

                if body.is_empty() {
                    return Err(AppError::bad_request(
                        ErrorCode::EmptyUpload,
                        "Uploaded file is empty",
                    ));
                }

                debug!(
                    bytes = body.len(),
                    content_type = content_type.as_deref().unwrap_or(""),
                    "image upload received"
                );
                return Ok(ImageUpload {
                    bytes: body.freeze(),
                    filename,
                    content_type,
                });
            }

            Err(AppError::bad_request(
                ErrorCode::BadRequest,
                format!("Missing multipart field '{UPLOAD_FIELD}'"),
            ))
        })
    }
}
