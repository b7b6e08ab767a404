// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan orchestration.
//
// A scan is: decode the upload, preprocess it, find symbols, then resolve
// each payload against the product database in decoder order. The CPU-bound
// part runs on Tokio's blocking pool; lookups run one after another on the
// calling task. Lookup trouble never fails a scan, it only turns the affected
// entry into the not-found marker.

use std::sync::Arc;

use barcodelens_core::config::ServiceConfig;
use barcodelens_core::error::{BarcodelensError, Result, ScanError};
use barcodelens_core::types::{DecodedSymbol, ProductInfo, RawImage, ScanEntry, ScanResult};
use barcodelens_lookup::{OpenFoodFactsClient, ProductLookup};
use barcodelens_vision::{BarcodeDecoder, decode_image, preprocess};
use tokio::task::JoinError;
use tracing::{debug, info, instrument, warn};

/// Composes the decoder and the product lookup into a full scan.
///
/// Holds no per-scan state, so one instance serves any number of concurrent
/// scans.
#[derive(Clone)]
pub struct ScanOrchestrator {
    decoder: Arc<BarcodeDecoder>,
    lookup: Arc<dyn ProductLookup>,
}

impl ScanOrchestrator {
    pub fn new(decoder: BarcodeDecoder, lookup: Arc<dyn ProductLookup>) -> Self {
        Self {
            decoder: Arc::new(decoder),
            lookup,
        }
    }

    /// Default decoder plus an Open Food Facts client at the configured base.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let client = OpenFoodFactsClient::new(&config.product_api_base)?;
        let decoder = BarcodeDecoder::with_default_detector();
        info!(
            detector = decoder.detector_name(),
            product_api = %client.base_url(),
            "Scan orchestrator ready"
        );
        Ok(Self::new(decoder, Arc::new(client)))
    }

    pub fn detector_name(&self) -> &'static str {
        self.decoder.detector_name()
    }

    /// Run one scan.
    ///
    /// Fails with [`ScanError::InvalidImage`] when the bytes are not a
    /// readable image, [`ScanError::NoBarcodeDetected`] when the image holds no
    /// symbol, and [`ScanError::Internal`] for anything else that goes wrong
    /// before lookup (including a panicking detector). Never returns a
    /// partial result.
    #[instrument(skip_all, fields(bytes = image.len(), encoding = image.encoding.mime_type()))]
    pub async fn scan(&self, image: RawImage) -> std::result::Result<ScanResult, ScanError> {
        let decoder = Arc::clone(&self.decoder);
        let bytes = image.bytes;
        let symbols = tokio::task::spawn_blocking(move || extract_symbols(&decoder, &bytes))
            .await
            .map_err(join_failure)??;

        if symbols.is_empty() {
            info!("No barcode in image");
            return Err(ScanError::NoBarcodeDetected);
        }

        let mut result = ScanResult::default();
        for symbol in symbols {
            let product_info = self.resolve(&symbol).await;
            result.barcodes.push(ScanEntry {
                symbology: symbol.symbology,
                payload: symbol.payload,
                product_info,
            });
        }

        let found = result
            .barcodes
            .iter()
            .filter(|entry| entry.product_info.is_found())
            .count();
        info!(entries = result.len(), found, "Scan complete");
        Ok(result)
    }

    /// Look up one symbol, absorbing every failure into the not-found marker.
    async fn resolve(&self, symbol: &DecodedSymbol) -> ProductInfo {
        match self.lookup.lookup(&symbol.payload).await {
            Ok(info) => {
                debug!(symbology = %symbol.symbology, found = info.is_found(), "Lookup finished");
                info
            }
            Err(err) => {
                warn!(symbology = %symbol.symbology, error = %err, "Lookup rejected payload");
                ProductInfo::NotFound
            }
        }
    }
}

/// Steps 1 to 3 of a scan. Blocking; call from the blocking pool.
fn extract_symbols(
    decoder: &BarcodeDecoder,
    bytes: &[u8],
) -> std::result::Result<Vec<DecodedSymbol>, ScanError> {
    let image = decode_image(bytes)?;
    let processed = preprocess(&image)?;
    let symbols = decoder.decode(&processed)?;
    Ok(symbols)
}

/// Map a failed blocking task to [`ScanError::Internal`].
fn join_failure(err: JoinError) -> ScanError {
    if !err.is_panic() {
        return BarcodelensError::Internal(format!("decode task did not complete: {err}")).into();
    }
    let payload = err.into_panic();
    let message = if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic payload".to_string()
    };
    warn!(%message, "Decode stage panicked");
    ScanError::Internal(format!("decode stage panicked: {message}"))
}
