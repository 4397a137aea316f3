//! Errors raised by repos, independent of HTTP and of the database driver.
//!
//! `infra::db_errors` turns `DbErr` into these; `error.rs` turns these into
//! problem-details responses.

use thiserror::Error;

/// Operational failure kinds
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InfraErrorKind {
    Timeout,
    DbUnavailable,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NotFoundKind {
    Level,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConflictKind {
    /// Row references a parent that does not exist
    ForeignKey,
    Unique,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    /// Input rejected before it reached storage
    #[error("validation error: {0}")]
    Validation(String),
    #[error("conflict ({0:?}): {1}")]
    Conflict(ConflictKind, String),
    #[error("not found ({0:?}): {1}")]
    NotFound(NotFoundKind, String),
    #[error("infra ({0:?}): {1}")]
    Infra(InfraErrorKind, String),
}

impl DomainError {
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation(detail.into())
    }

    pub fn conflict(kind: ConflictKind, detail: impl Into<String>) -> Self {
        Self::Conflict(kind, detail.into())
    }

    pub fn not_found(kind: NotFoundKind, detail: impl Into<String>) -> Self {
        Self::NotFound(kind, detail.into())
    }

    pub fn infra(kind: InfraErrorKind, detail: impl Into<String>) -> Self {
        Self::Infra(kind, detail.into())
    }
}
