/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::pipeline::Stage;
use rusqlite::ErrorCode;
use thiserror::Error;
use vidhub_protocol::ViewType;

/// Failures reported by a [`crate::entity_store::DocumentStore`] backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Transient: the only class the adapter retries.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("malformed store data: {0}")]
    Malformed(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(f, _)
                if matches!(
                    f.code,
                    ErrorCode::DatabaseBusy
                        | ErrorCode::DatabaseLocked
                        | ErrorCode::CannotOpen
                        | ErrorCode::SystemIoFailure
                        | ErrorCode::OutOfMemory
                ) =>
            {
                StoreError::Unavailable(e.to_string())
            }
            _ => StoreError::Malformed(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Malformed(e.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        StoreError::Unavailable(format!("store task failed: {e}"))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    /// Bad request parameters. Never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// Stored data does not have the shape a view expects (schema drift).
    #[error("shape error: {0}")]
    Shape(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ViewError {
    /// HTTP-style status a route handler should answer with.
    pub fn status(&self) -> u16 {
        match self {
            ViewError::Validation(_) => 400,
            ViewError::NotFound(_) => 404,
            ViewError::Cancelled => 499,
            ViewError::Shape(_) | ViewError::Internal(_) => 500,
            ViewError::StoreUnavailable(_) => 503,
        }
    }
}

impl From<StoreError> for ViewError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(msg) => ViewError::StoreUnavailable(msg),
            StoreError::Malformed(msg) => ViewError::Shape(msg),
        }
    }
}

/// A pipeline failure, tagged with the stage that produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{view} failed at {stage}: {error}")]
pub struct ComposeError {
    pub view: ViewType,
    pub stage: Stage,
    #[source]
    pub error: ViewError,
}

impl ComposeError {
    pub fn status(&self) -> u16 {
        self.error.status()
    }
}

pub type ViewResult<T> = Result<T, ViewError>;
