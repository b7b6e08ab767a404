// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Multi-format detector backed by `rxing`, a Rust port of ZXing.
//
// Covers the 1D retail symbologies (EAN-13, EAN-8, UPC-A, UPC-E, Code 128,
// Code 39, ITF) as well as QR, Data Matrix, Aztec and PDF417.
//
// # Feature Gate
//
// Built with the default `linear` feature. A QR-only build opts out with:
//
// ```toml
// barcodelens-vision = { path = "crates/barcodelens-vision", default-features = false }
// ```

use barcodelens_core::error::{BarcodelensError, Result};
use barcodelens_core::types::Symbology;
use rxing::{BarcodeFormat, Exceptions};
use tracing::debug;

use super::{RawSymbol, SymbolDetector};
use crate::preprocess::ProcessedImage;

/// Finds every symbol ZXing knows about.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearDetector;

impl LinearDetector {
    pub fn new() -> Self {
        Self
    }
}

/// Sort key putting symbols in reading order: leftmost first, then topmost.
fn reading_position(region: &[(i32, i32)]) -> (i32, i32) {
    let x = region.iter().map(|&(x, _)| x).min().unwrap_or(i32::MAX);
    let y = region.iter().map(|&(_, y)| y).min().unwrap_or(i32::MAX);
    (x, y)
}

/// Map a ZXing format to the zbar-style tag (`EAN_13` → `EAN13`,
/// `QR_CODE` → `QRCODE`).
fn zbar_tag(format: &BarcodeFormat) -> String {
    format!("{format:?}").replace('_', "")
}

impl SymbolDetector for LinearDetector {
    fn name(&self) -> &'static str {
        "rxing"
    }

    fn detect(&self, image: &ProcessedImage) -> Result<Vec<RawSymbol>> {
        let (width, height) = image.dimensions();
        let luma = image.as_gray().as_raw().clone();

        let results = match rxing::helpers::detect_multiple_in_luma(luma, width, height) {
            Ok(results) => results,
            Err(Exceptions::NotFoundException(_)) => return Ok(Vec::new()),
            Err(err) => {
                return Err(BarcodelensError::Decode(format!("rxing detection failed: {err}")));
            }
        };
        debug!(count = results.len(), "rxing symbols decoded");

        // The multi-reader reports symbols in search order, not image order.
        let mut symbols: Vec<RawSymbol> = results
            .iter()
            .map(|result| RawSymbol {
                symbology: Symbology::new(zbar_tag(result.getBarcodeFormat())),
                // ZXing exposes the interpreted text; raw bytes are codewords.
                data: result.getText().as_bytes().to_vec(),
                region: result
                    .getPoints()
                    .iter()
                    .map(|p| (p.x.round() as i32, p.y.round() as i32))
                    .collect(),
            })
            .collect();
        symbols.sort_by_key(|symbol| reading_position(&symbol.region));
        Ok(symbols)
    }
}
