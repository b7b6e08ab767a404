// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Symbol decoding. Runs a pluggable detector over a preprocessed image and
// normalises what it reports into text payloads.
//
// # Detectors
//
// - [`QrDetector`] (always available): QR codes via `rqrr`.
// - [`LinearDetector`] (feature `linear`): EAN-13, UPC-A, Code 128 and the
//   other ZXing formats via `rxing`.
//
// Anything implementing [`SymbolDetector`] can be swapped in, which is how
// the tests drive the pipeline without real barcodes.

pub mod qr;

#[cfg(feature = "linear")]
pub mod linear;

use barcodelens_core::error::{BarcodelensError, Result};
use barcodelens_core::types::{DecodedSymbol, Symbology};
use tracing::{debug, info, instrument};

use crate::preprocess::ProcessedImage;

pub use qr::QrDetector;

#[cfg(feature = "linear")]
pub use linear::LinearDetector;

/// One symbol as reported by a detector, before payload normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSymbol {
    /// zbar-style format tag (`EAN13`, `QRCODE`, ...).
    pub symbology: Symbology,
    /// Payload bytes exactly as decoded.
    pub data: Vec<u8>,
    /// Corner points of the symbol in image coordinates, if known.
    pub region: Vec<(i32, i32)>,
}

impl RawSymbol {
    pub fn new(symbology: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            symbology: Symbology::new(symbology),
            data: data.into(),
            region: Vec::new(),
        }
    }
}

/// A symbol localisation and decoding capability.
///
/// Implementations must be deterministic for a fixed image and must return
/// an empty list, not an error, when nothing is found.
pub trait SymbolDetector: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &'static str;

    /// Find and decode every symbol in `image`, in the detector's own order.
    fn detect(&self, image: &ProcessedImage) -> Result<Vec<RawSymbol>>;
}

/// Turns a [`ProcessedImage`] into an ordered list of [`DecodedSymbol`]s.
pub struct BarcodeDecoder {
    detector: Box<dyn SymbolDetector>,
}

impl BarcodeDecoder {
    /// Wrap a specific detector.
    pub fn new(detector: impl SymbolDetector + 'static) -> Self {
        Self {
            detector: Box::new(detector),
        }
    }

    /// The best detector compiled into this build: `rxing` with the default
    /// `linear` feature (retail 1D codes and QR), `rqrr` in a QR-only build.
    pub fn with_default_detector() -> Self {
        #[cfg(feature = "linear")]
        {
            Self::new(LinearDetector::new())
        }
        #[cfg(not(feature = "linear"))]
        {
            Self::new(QrDetector::new())
        }
    }

    /// Name of the wrapped detector.
    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    /// Detect symbols and decode each payload as UTF-8 text.
    ///
    /// Detector order is preserved. Fails with [`BarcodelensError::Decode`]
    /// if any payload is not valid UTF-8.
    #[instrument(skip_all, fields(detector = self.detector.name(), width = image.width(), height = image.height()))]
    pub fn decode(&self, image: &ProcessedImage) -> Result<Vec<DecodedSymbol>> {
        let raw = self.detector.detect(image)?;
        debug!(count = raw.len(), "Detector finished");

        let symbols = raw
            .into_iter()
            .map(normalize_symbol)
            .collect::<Result<Vec<_>>>()?;

        info!(count = symbols.len(), "Symbols decoded");
        Ok(symbols)
    }
}

/// Convert a raw detector result into a [`DecodedSymbol`].
fn normalize_symbol(raw: RawSymbol) -> Result<DecodedSymbol> {
    let RawSymbol {
        symbology,
        data,
        region,
    } = raw;
    let payload = String::from_utf8(data).map_err(|err| {
        BarcodelensError::Decode(format!("{symbology} payload is not valid UTF-8: {err}"))
    })?;
    debug!(%symbology, payload_len = payload.len(), ?region, "Symbol normalised");
    Ok(DecodedSymbol { symbology, payload })
}
