// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable messages for scan failures.
//
// The HTTP front end returns these next to the raw detail so a shopper
// pointing a phone at a packet gets something they can act on.

use crate::error::{ErrorCategory, ScanError};

/// A human-readable error with plain message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Short summary (shown as a heading).
    pub message: String,
    /// What the user should try next.
    pub suggestion: String,
    /// Whether sending the same upload again could succeed.
    pub retriable: bool,
    pub category: ErrorCategory,
}

/// Convert a `ScanError` into something a shopper can understand.
pub fn humanize_scan_error(err: &ScanError) -> HumanError {
    match err {
        ScanError::InvalidImage(detail) => {
            let lower = detail.to_ascii_lowercase();
            let suggestion = if lower.contains("no pixels") {
                "The picture is empty. Take the photo again.".into()
            } else if lower.contains("format") || lower.contains("unsupported") {
                "Upload the photo as a JPEG or PNG file.".into()
            } else {
                "The file doesn't look like a photo. Try choosing the picture again.".into()
            };
            HumanError {
                message: "We couldn't open this image.".into(),
                suggestion,
                retriable: false,
                category: err.category(),
            }
        }

        ScanError::NoBarcodeDetected => HumanError {
            message: "No barcode was found in the picture.".into(),
            suggestion: "Hold the camera closer so the barcode fills most of the frame, keep it flat, and avoid glare.".into(),
            retriable: false,
            category: err.category(),
        },

        ScanError::Internal(_) => HumanError {
            message: "Something went wrong while reading the barcode.".into(),
            suggestion: "Please try again in a moment.".into(),
            retriable: true,
            category: err.category(),
        },
    }
}
