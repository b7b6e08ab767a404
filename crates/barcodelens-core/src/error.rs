// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for barcodelens.

use serde::Serialize;
use thiserror::Error;

/// Detail text returned when an image decodes but holds no readable symbol.
pub const NO_BARCODE_DETECTED: &str = "Tidak ada barcode yang terdeteksi";

/// Top-level error type for component operations.
#[derive(Debug, Error)]
pub enum BarcodelensError {
    // -- Image errors --
    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Decode errors --
    #[error("symbol decoding failed: {0}")]
    Decode(String),

    // -- Lookup errors --
    #[error("invalid barcode argument: {0}")]
    InvalidBarcode(String),

    // -- HTTP front end --
    #[error("HTTP server error: {0}")]
    Server(String),

    // -- Configuration / I/O --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BarcodelensError>;

/// Which of the terminal failure outcomes a scan ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScanErrorKind {
    InvalidImage,
    NoBarcodeDetected,
    InternalError,
}

/// How the boundary should present a failure to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The uploaded bytes were unusable.
    BadInput,
    /// The image was fine but nothing was found in it.
    NotFound,
    /// Something broke on our side.
    Internal,
}

/// Structured failure of a whole scan.
///
/// This is the only error type that crosses the orchestrator boundary. Lookup
/// failures never appear here; they degrade to a per-entry not-found marker.
#[derive(Debug, Clone, Error)]
pub enum ScanError {
    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("Tidak ada barcode yang terdeteksi")]
    NoBarcodeDetected,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ScanError {
    pub fn kind(&self) -> ScanErrorKind {
        match self {
            Self::InvalidImage(_) => ScanErrorKind::InvalidImage,
            Self::NoBarcodeDetected => ScanErrorKind::NoBarcodeDetected,
            Self::Internal(_) => ScanErrorKind::InternalError,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidImage(_) => ErrorCategory::BadInput,
            Self::NoBarcodeDetected => ErrorCategory::NotFound,
            Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// HTTP status code the boundary answers with.
    pub fn http_status(&self) -> u16 {
        match self.category() {
            ErrorCategory::BadInput | ErrorCategory::NotFound => 400,
            ErrorCategory::Internal => 500,
        }
    }
}

impl From<BarcodelensError> for ScanError {
    fn from(err: BarcodelensError) -> Self {
        match err {
            BarcodelensError::InvalidImage(detail) => Self::InvalidImage(detail),
            other => Self::Internal(other.to_string()),
        }
    }
}
