// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for FileZen.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all FileZen operations.
///
/// Never carries credential material: adapters format only byte lengths,
/// page indices, and collaborator diagnostics into the message.
#[derive(Debug, Error)]
pub enum FileZenError {
    // -- Caller mistakes (detected before any document I/O) --
    #[error("invalid input: {0}")]
    InputValidation(String),

    // -- Document errors --
    #[error("document could not be read: {0}")]
    CorruptDocument(String),

    #[error("password rejected: {0}")]
    Authentication(String),

    #[error("invalid content: {0}")]
    Content(String),

    #[error("image encoding failed: {0}")]
    Encoding(String),

    // -- Host limits --
    #[error("resource limit exceeded: {0}")]
    ResourceExhausted(String),

    #[error("renderer unavailable: {0}")]
    RendererUnavailable(String),

    // -- Lifecycle --
    #[error("job cancelled")]
    Cancelled,

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification of a failure, used by callers to decide what to show
/// (re-select the file, re-enter the password, or give up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InputValidation,
    CorruptDocument,
    Authentication,
    Content,
    ResourceExhaustion,
    /// The rendering capability never became ready.
    Unavailable,
    Cancelled,
    Internal,
}

impl FileZenError {
    /// Classify this error into the caller-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InputValidation(_) => ErrorKind::InputValidation,
            Self::CorruptDocument(_) => ErrorKind::CorruptDocument,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Content(_) | Self::Encoding(_) => ErrorKind::Content,
            Self::ResourceExhausted(_) => ErrorKind::ResourceExhaustion,
            Self::RendererUnavailable(_) => ErrorKind::Unavailable,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Io(err) if err.kind() == std::io::ErrorKind::OutOfMemory => {
                ErrorKind::ResourceExhaustion
            }
            Self::Io(_) => ErrorKind::Internal,
            Self::Serialization(_) => ErrorKind::InputValidation,
        }
    }

    /// Snapshot of this error as a terminal job rejection.
    pub fn to_failure(&self) -> JobFailure {
        JobFailure {
            kind: self.kind(),
            reason: self.to_string(),
        }
    }
}

/// The single terminal rejection a job surfaces: a kind and a human-readable
/// reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub kind: ErrorKind,
    pub reason: String,
}

impl std::fmt::Display for JobFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.reason)
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FileZenError>;
