// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// QR code detector backed by the pure-Rust `rqrr` crate.

use barcodelens_core::error::Result;
use barcodelens_core::types::Symbology;
use rqrr::PreparedImage;
use tracing::{debug, warn};

use super::{RawSymbol, SymbolDetector};
use crate::preprocess::{BLACK, ProcessedImage};

/// zbar's tag for QR codes.
const QR_SYMBOLOGY: &str = "QRCODE";

/// Finds and decodes QR codes.
///
/// Grids that are located but fail error correction are skipped, so a
/// damaged code counts as "not found" rather than failing the whole image.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrDetector;

impl QrDetector {
    pub fn new() -> Self {
        Self
    }
}

impl SymbolDetector for QrDetector {
    fn name(&self) -> &'static str {
        "rqrr"
    }

    fn detect(&self, image: &ProcessedImage) -> Result<Vec<RawSymbol>> {
        let (width, height) = image.dimensions();
        let gray = image.as_gray();

        // The image is already binarized, so hand rqrr the bitmap directly
        // instead of letting it threshold again.
        let mut prepared = PreparedImage::prepare_from_bitmap(
            width as usize,
            height as usize,
            |x, y| gray.get_pixel(x as u32, y as u32).0[0] == BLACK,
        );

        let grids = prepared.detect_grids();
        debug!(grids = grids.len(), "QR grids located");

        let mut symbols = Vec::with_capacity(grids.len());
        for (index, grid) in grids.iter().enumerate() {
            let mut data = Vec::new();
            match grid.decode_to(&mut data) {
                Ok(_) => {
                    debug!(index, bytes = data.len(), "QR grid decoded");
                    symbols.push(RawSymbol {
                        symbology: Symbology::new(QR_SYMBOLOGY),
                        data,
                        region: grid.bounds.iter().map(|p| (p.x, p.y)).collect(),
                    });
                }
                Err(err) => {
                    warn!(index, error = %err, "QR grid located but not decodable");
                }
            }
        }

        Ok(symbols)
    }
}
