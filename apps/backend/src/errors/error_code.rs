//! Error codes for the Walls Incoming API.
//!
//! Add new codes here; never pass ad-hoc strings as error codes.
//! Every code is SCREAMING_SNAKE_CASE and maps 1:1 to the string that
//! appears in the `code` field of a Problem Details response.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Request validation
    /// Malformed request (body, multipart framing, path)
    BadRequest,
    /// Well-formed request with an out-of-range value
    ValidationError,
    /// Upload part is not an image
    InvalidContentType,
    /// Upload part is missing or has no bytes
    EmptyUpload,

    // Resource not found
    LevelNotFound,
    NotFound,

    // Conflicts
    /// Foreign key constraint violation (SQLSTATE 23503)
    FkViolation,
    /// Unique constraint violation (SQLSTATE 23505)
    UniqueViolation,
    Conflict,

    // System errors
    DbError,
    DbUnavailable,
    DbTimeout,
    PoseDetectionFailed,
    Internal,
    ConfigError,
}

impl ErrorCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::InvalidContentType => "INVALID_CONTENT_TYPE",
            Self::EmptyUpload => "EMPTY_UPLOAD",

            Self::LevelNotFound => "LEVEL_NOT_FOUND",
            Self::NotFound => "NOT_FOUND",

            Self::FkViolation => "FK_VIOLATION",
            Self::UniqueViolation => "UNIQUE_VIOLATION",
            Self::Conflict => "CONFLICT",

            Self::DbError => "DB_ERROR",
            Self::DbUnavailable => "DB_UNAVAILABLE",
            Self::DbTimeout => "DB_TIMEOUT",
            Self::PoseDetectionFailed => "POSE_DETECTION_FAILED",
            Self::Internal => "INTERNAL",
            Self::ConfigError => "CONFIG_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
