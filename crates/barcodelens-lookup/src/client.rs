// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Async product lookup client for the Open Food Facts API.
//
// One GET per barcode against `{base}/api/v0/product/{barcode}.json`. No
// retries and no timeout override: a slow database slows the scan down, a
// dead one turns every entry into "not found".

use async_trait::async_trait;
use barcodelens_core::error::{BarcodelensError, Result};
use barcodelens_core::types::ProductInfo;
use reqwest::Url;
use tracing::{debug, info, instrument, warn};

use crate::record::interpret_body;

/// `User-Agent` sent with every lookup, as Open Food Facts asks clients to
/// identify themselves.
const USER_AGENT: &str = concat!("barcodelens/", env!("CARGO_PKG_VERSION"));

/// Anything that can resolve a barcode to product data.
///
/// Implementations must absorb transport and parse failures into
/// [`ProductInfo::NotFound`]. The only error they may return is
/// [`BarcodelensError::InvalidBarcode`] for an argument that is not a
/// barcode at all.
#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn lookup(&self, barcode: &str) -> Result<ProductInfo>;
}

/// Reject arguments that cannot name a product (empty or whitespace-only).
pub fn validate_barcode(barcode: &str) -> Result<()> {
    if barcode.trim().is_empty() {
        return Err(BarcodelensError::InvalidBarcode("barcode is empty".into()));
    }
    if barcode.chars().any(char::is_control) {
        return Err(BarcodelensError::InvalidBarcode(
            "barcode contains control characters".into(),
        ));
    }
    Ok(())
}

/// Open Food Facts client wrapping a shared `reqwest` connection pool.
pub struct OpenFoodFactsClient {
    http: reqwest::Client,
    /// API root, e.g. `https://world.openfoodfacts.org`.
    base_url: Url,
}

impl OpenFoodFactsClient {
    /// Create a client rooted at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed: Url = base_url.parse().map_err(|e| {
            BarcodelensError::Config(format!("invalid product API base '{base_url}': {e}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
            return Err(BarcodelensError::Config(format!(
                "product API base '{base_url}' must be an http(s) URL"
            )));
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BarcodelensError::Config(format!("HTTP client setup: {e}")))?;

        Ok(Self {
            http,
            base_url: parsed,
        })
    }

    /// The API root this client targets.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the product URL for `barcode`. The barcode is percent-encoded as
    /// a single path segment, so QR payloads containing `/` stay in place.
    pub fn product_url(&self, barcode: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                BarcodelensError::Config(format!("'{}' cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(["api", "v0", "product", &format!("{barcode}.json")]);
        Ok(url)
    }
}

#[async_trait]
impl ProductLookup for OpenFoodFactsClient {
    #[instrument(skip(self), fields(base = %self.base_url))]
    async fn lookup(&self, barcode: &str) -> Result<ProductInfo> {
        validate_barcode(barcode)?;
        let url = self.product_url(barcode)?;

        debug!(%url, "sending product lookup");
        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "product database unreachable");
                return Ok(ProductInfo::NotFound);
            }
        };

        let status = response.status();
        if !status.is_success() {
            info!(status = status.as_u16(), "product lookup returned non-success status");
            return Ok(ProductInfo::NotFound);
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "failed to read product response body");
                return Ok(ProductInfo::NotFound);
            }
        };

        let info = interpret_body(&body);
        info!(found = info.is_found(), body_bytes = body.len(), "product lookup complete");
        Ok(info)
    }
}
