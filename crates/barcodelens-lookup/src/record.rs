// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Mapping from Open Food Facts product JSON to `ProductRecord`.
//
// Every field of the record is described once in `FIELD_TABLE`: where it comes
// from in the response and which sentinel replaces it when the database has
// nothing usable.

use barcodelens_core::types::{NutrientDetail, ProductInfo, ProductRecord, sentinel};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// The fields of a [`ProductRecord`], in `FIELD_TABLE` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductField {
    Name,
    Brand,
    Category,
    NutritionGrade,
    NutrientDetail,
    EcoGrade,
    ImageReference,
}

/// Where a record field comes from and what stands in when it is missing.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: ProductField,
    /// Key inside the response's `product` object.
    pub source_key: &'static str,
    pub sentinel: &'static str,
}

/// Single source of truth for field sources and defaults.
///
/// Missing, `null` and blank values all become the field's sentinel, so no
/// field is ever empty or null. Numbers and booleans are rendered as text.
/// `nutriments` is taken only when it is a JSON object.
pub const FIELD_TABLE: [FieldSpec; 7] = [
    FieldSpec {
        field: ProductField::Name,
        source_key: "product_name",
        sentinel: sentinel::UNKNOWN,
    },
    FieldSpec {
        field: ProductField::Brand,
        source_key: "brands",
        sentinel: sentinel::UNREGISTERED,
    },
    FieldSpec {
        field: ProductField::Category,
        source_key: "categories",
        sentinel: sentinel::UNREGISTERED,
    },
    FieldSpec {
        field: ProductField::NutritionGrade,
        source_key: "nutriscore_grade",
        sentinel: sentinel::UNKNOWN,
    },
    FieldSpec {
        field: ProductField::NutrientDetail,
        source_key: "nutriments",
        sentinel: sentinel::UNREGISTERED,
    },
    FieldSpec {
        field: ProductField::EcoGrade,
        source_key: "ecoscore_grade",
        sentinel: sentinel::UNREGISTERED,
    },
    FieldSpec {
        field: ProductField::ImageReference,
        source_key: "image_url",
        sentinel: sentinel::NO_IMAGE,
    },
];

/// Look up the table row for `field`.
pub fn field_spec(field: ProductField) -> &'static FieldSpec {
    &FIELD_TABLE[field as usize]
}

/// Read a text field, falling back to its sentinel.
///
/// Strings are taken as-is unless blank. Numbers and booleans are rendered
/// as text. Null, blank, arrays and objects all count as missing.
fn text_field(product: &Map<String, Value>, field: ProductField) -> String {
    let spec = field_spec(field);
    match product.get(spec.source_key) {
        Some(Value::String(text)) if !text.trim().is_empty() => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => spec.sentinel.to_string(),
    }
}

fn nutrient_field(product: &Map<String, Value>) -> NutrientDetail {
    let spec = field_spec(ProductField::NutrientDetail);
    match product.get(spec.source_key) {
        Some(Value::Object(map)) => NutrientDetail::Reported(map.clone()),
        _ => NutrientDetail::Unregistered,
    }
}

/// Build a record from a `product` object. Unknown keys are ignored.
pub fn product_record_from(product: &Map<String, Value>) -> ProductRecord {
    ProductRecord {
        name: text_field(product, ProductField::Name),
        brand: text_field(product, ProductField::Brand),
        category: text_field(product, ProductField::Category),
        nutrition_grade: text_field(product, ProductField::NutritionGrade),
        nutrient_detail: nutrient_field(product),
        eco_grade: text_field(product, ProductField::EcoGrade),
        image_reference: text_field(product, ProductField::ImageReference),
    }
}

/// Whether the body's own `status` says "no such product".
///
/// The API sends an integer, but older mirrors send `"0"`; both are accepted.
/// A missing `status` is not treated as a miss.
fn status_says_missing(body: &Map<String, Value>) -> bool {
    match body.get("status") {
        Some(Value::Number(number)) => number.as_f64() == Some(0.0),
        Some(Value::String(text)) => text.trim() == "0",
        _ => false,
    }
}

/// Interpret the body of a successful (2xx) product response.
///
/// Never fails: an unparseable body or a `status` of 0 both give
/// [`ProductInfo::NotFound`]. A found response without a `product` object
/// gives a record made entirely of sentinels.
pub fn interpret_body(body: &[u8]) -> ProductInfo {
    let parsed: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "product response is not valid JSON");
            return ProductInfo::NotFound;
        }
    };

    let Value::Object(envelope) = parsed else {
        warn!("product response is not a JSON object");
        return ProductInfo::NotFound;
    };

    if status_says_missing(&envelope) {
        debug!("product database reports no match");
        return ProductInfo::NotFound;
    }

    let empty = Map::new();
    let product = match envelope.get("product") {
        Some(Value::Object(product)) => product,
        _ => &empty,
    };
    ProductInfo::Found(product_record_from(product))
}
