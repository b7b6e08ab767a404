// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the barcodelens scanner.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Placeholder values standing in for product fields the database left out.
pub mod sentinel {
    /// Used for the product name and nutrition grade.
    pub const UNKNOWN: &str = "Tidak diketahui";
    /// Used for brand, category, nutrients, and eco grade.
    pub const UNREGISTERED: &str = "tidak didaftarka";
    /// Used for the product image URL.
    pub const NO_IMAGE: &str = "informasi gambar kosong";
}

/// Message carried by the not-found marker.
pub const PRODUCT_NOT_FOUND: &str = "Produk tidak ditemukan";

/// Unique identifier for a single scan request (log correlation only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ScanId(pub Uuid);

impl ScanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Container formats accepted at the upload boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageEncoding {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    WebP,
    /// Not declared, or declared as something we don't recognise.
    Unknown,
}

impl ImageEncoding {
    /// MIME type string for this encoding.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
            Self::WebP => "image/webp",
            Self::Unknown => "application/octet-stream",
        }
    }

    /// Interpret a `Content-Type` value. Parameters after `;` are ignored.
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/png" => Self::Png,
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Self::Jpeg,
            "image/gif" => Self::Gif,
            "image/bmp" | "image/x-ms-bmp" => Self::Bmp,
            "image/tiff" => Self::Tiff,
            "image/webp" => Self::WebP,
            _ => Self::Unknown,
        }
    }

    /// Infer encoding from a file extension, with or without the leading dot.
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "gif" => Self::Gif,
            "bmp" => Self::Bmp,
            "tif" | "tiff" => Self::Tiff,
            "webp" => Self::WebP,
            _ => Self::Unknown,
        }
    }
}

/// Lifecycle of the HTTP front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ServerStatus {
    Stopped,
    Starting,
    Running,
}

/// Uploaded image bytes as they arrived, plus the declared encoding.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub bytes: Vec<u8>,
    pub encoding: ImageEncoding,
}

impl RawImage {
    pub fn new(bytes: Vec<u8>, encoding: ImageEncoding) -> Self {
        Self { bytes, encoding }
    }

    /// Build from an upload and its optional `Content-Type`.
    pub fn from_upload(bytes: Vec<u8>, content_type: Option<&str>) -> Self {
        let encoding = content_type
            .map(ImageEncoding::from_mime)
            .unwrap_or(ImageEncoding::Unknown);
        Self { bytes, encoding }
    }

    /// Fall back to the filename's extension when no usable type was declared.
    pub fn with_filename_hint(mut self, filename: Option<&str>) -> Self {
        if self.encoding == ImageEncoding::Unknown {
            if let Some((_, ext)) = filename.and_then(|name| name.rsplit_once('.')) {
                self.encoding = ImageEncoding::from_extension(ext);
            }
        }
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Barcode standard tag as reported by the decode capability (`EAN13`,
/// `QRCODE`, `CODE128`, ...). Passed through uninterpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Symbology(pub String);

impl Symbology {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One symbol found in an image, with its payload already decoded to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSymbol {
    pub symbology: Symbology,
    pub payload: String,
}

/// Nutrient breakdown for a product.
#[derive(Debug, Clone, PartialEq)]
pub enum NutrientDetail {
    /// The database returned a nutrient object; kept verbatim.
    Reported(Map<String, Value>),
    /// Nothing usable was returned.
    Unregistered,
}

impl Serialize for NutrientDetail {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Reported(map) => map.serialize(serializer),
            Self::Unregistered => serializer.serialize_str(sentinel::UNREGISTERED),
        }
    }
}

/// Normalised product metadata. Every field always carries either real data
/// or its sentinel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    #[serde(rename = "Nama_produk")]
    pub name: String,
    #[serde(rename = "Merk")]
    pub brand: String,
    #[serde(rename = "kategory")]
    pub category: String,
    #[serde(rename = "Nilai_nutrisi")]
    pub nutrition_grade: String,
    #[serde(rename = "nutriments")]
    pub nutrient_detail: NutrientDetail,
    #[serde(rename = "EcoLevel")]
    pub eco_grade: String,
    #[serde(rename = "Gambar")]
    pub image_reference: String,
}

/// Outcome of resolving one barcode against the product database.
///
/// "No such product" and "service unreachable" are deliberately the same
/// variant.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductInfo {
    Found(ProductRecord),
    NotFound,
}

impl ProductInfo {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn record(&self) -> Option<&ProductRecord> {
        match self {
            Self::Found(record) => Some(record),
            Self::NotFound => None,
        }
    }
}

impl Serialize for ProductInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Found(record) => record.serialize(serializer),
            Self::NotFound => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", PRODUCT_NOT_FOUND)?;
                map.end()
            }
        }
    }
}

/// A single line of the scan result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanEntry {
    #[serde(rename = "type")]
    pub symbology: Symbology,
    #[serde(rename = "data")]
    pub payload: String,
    pub product_info: ProductInfo,
}

/// All entries of a successful scan, in decoder order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanResult {
    pub barcodes: Vec<ScanEntry>,
}

impl ScanResult {
    pub fn len(&self) -> usize {
        self.barcodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.barcodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record() -> ProductRecord {
        ProductRecord {
            name: "Nutella".into(),
            brand: "Ferrero".into(),
            category: "Spreads".into(),
            nutrition_grade: "e".into(),
            nutrient_detail: NutrientDetail::Unregistered,
            eco_grade: sentinel::UNREGISTERED.into(),
            image_reference: sentinel::NO_IMAGE.into(),
        }
    }

    #[test]
    fn mime_parameters_are_ignored() {
        assert_eq!(ImageEncoding::from_mime("image/PNG; charset=binary"), ImageEncoding::Png);
        assert_eq!(ImageEncoding::from_mime("text/plain"), ImageEncoding::Unknown);
    }

    #[test]
    fn upload_without_content_type_is_unknown() {
        let raw = RawImage::from_upload(vec![1, 2, 3], None);
        assert_eq!(raw.encoding, ImageEncoding::Unknown);
        assert_eq!(raw.len(), 3);
    }

    #[test]
    fn filename_extension_fills_in_missing_type() {
        let raw = RawImage::from_upload(vec![0xff, 0xd8], None).with_filename_hint(Some("IMG_0042.JPG"));
        assert_eq!(raw.encoding, ImageEncoding::Jpeg);
        assert_eq!(raw.encoding.mime_type(), "image/jpeg");

        let octet = RawImage::from_upload(vec![1], Some("application/octet-stream"))
            .with_filename_hint(Some("shelf.webp"));
        assert_eq!(octet.encoding, ImageEncoding::WebP);

        // A declared type wins over the extension.
        let declared = RawImage::from_upload(vec![1], Some("image/png")).with_filename_hint(Some("a.gif"));
        assert_eq!(declared.encoding, ImageEncoding::Png);

        let bare = RawImage::from_upload(vec![1], None).with_filename_hint(Some("README"));
        assert_eq!(bare.encoding, ImageEncoding::Unknown);
        assert_eq!(ImageEncoding::from_extension(".tif"), ImageEncoding::Tiff);
    }

    #[test]
    fn product_record_uses_wire_keys() {
        let value = serde_json::to_value(sample_record()).unwrap();
        assert_eq!(value["Nama_produk"], "Nutella");
        assert_eq!(value["Merk"], "Ferrero");
        assert_eq!(value["kategory"], "Spreads");
        assert_eq!(value["Nilai_nutrisi"], "e");
        assert_eq!(value["nutriments"], "tidak didaftarka");
        assert_eq!(value["EcoLevel"], "tidak didaftarka");
        assert_eq!(value["Gambar"], "informasi gambar kosong");
    }

    #[test]
    fn reported_nutrients_serialize_as_object() {
        let mut map = Map::new();
        map.insert("sugars_100g".into(), json!(56.3));
        let detail = NutrientDetail::Reported(map);
        assert_eq!(serde_json::to_value(detail).unwrap(), json!({"sugars_100g": 56.3}));
    }

    #[test]
    fn not_found_marker_shape() {
        let value = serde_json::to_value(ProductInfo::NotFound).unwrap();
        assert_eq!(value, json!({"error": "Produk tidak ditemukan"}));
    }

    #[test]
    fn scan_entry_uses_type_and_data_keys() {
        let result = ScanResult {
            barcodes: vec![ScanEntry {
                symbology: Symbology::new("EAN13"),
                payload: "3017620422003".into(),
                product_info: ProductInfo::Found(sample_record()),
            }],
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["barcodes"][0]["type"], "EAN13");
        assert_eq!(value["barcodes"][0]["data"], "3017620422003");
        assert_eq!(value["barcodes"][0]["product_info"]["Nama_produk"], "Nutella");
    }
}
