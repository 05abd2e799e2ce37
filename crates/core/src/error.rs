// Copyright 2025 querybench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for benchmark runs.
//!
//! Every variant is fatal to the run that produced it unless the caller opted
//! into count-and-continue semantics for transport and status failures.

use thiserror::Error;

/// Maximum number of response body bytes kept in an [`BenchError::UnexpectedStatus`].
pub const BODY_PREVIEW_LIMIT: usize = 512;

/// Errors that can occur while building, sending or checking a benchmark request.
#[derive(Debug, Error)]
pub enum BenchError {
    /// Invalid benchmark configuration (empty query, inverted time range, ...)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The request could not be built (malformed URL, invalid header)
    #[error("Request construction error: {0}")]
    RequestConstruction(String),

    /// Connection, DNS, timeout or body read failure
    #[error("Transport error: {message}")]
    Transport {
        /// Human readable cause
        message: String,
        /// Whether the request exceeded its timeout
        timed_out: bool,
    },

    /// The backend answered with something other than 200 OK
    #[error("Received non-OK HTTP status: {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Leading part of the response body
        body: String,
    },

    /// A response body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl BenchError {
    /// Build an [`BenchError::UnexpectedStatus`] keeping at most
    /// [`BODY_PREVIEW_LIMIT`] bytes of the body.
    pub fn unexpected_status(status: u16, body: &[u8]) -> Self {
        let end = body.len().min(BODY_PREVIEW_LIMIT);
        BenchError::UnexpectedStatus {
            status,
            body: String::from_utf8_lossy(&body[..end]).into_owned(),
        }
    }

    /// Returns true when the request exceeded its timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, BenchError::Transport { timed_out: true, .. })
    }

    /// Returns true for failures reported by the backend or the network,
    /// as opposed to mistakes in the benchmark setup.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            BenchError::Transport { .. } | BenchError::UnexpectedStatus { .. }
        )
    }
}

/// Result type for querybench operations.
pub type Result<T> = std::result::Result<T, BenchError>;
