// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// barcodelens-vision — Image side of the barcode scanner.
//
// Provides the preprocessing pipeline (grayscale, blur, Otsu binarization,
// morphological closing) and symbol decoding behind a pluggable detector.

pub mod decode;
pub mod preprocess;

// Re-export the primary types so callers can use `barcodelens_vision::BarcodeDecoder` etc.
pub use decode::{BarcodeDecoder, QrDetector, RawSymbol, SymbolDetector};
pub use preprocess::{ImagePreprocessor, ProcessedImage, decode_image, preprocess};

#[cfg(feature = "linear")]
pub use decode::LinearDetector;
