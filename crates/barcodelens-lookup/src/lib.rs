// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// barcodelens-lookup — Product data for decoded barcodes.
//
// Wraps the Open Food Facts product API behind the `ProductLookup` trait and
// maps its JSON into `ProductRecord`s with per-field sentinels.

pub mod client;
pub mod record;

pub use client::{OpenFoodFactsClient, ProductLookup, validate_barcode};
pub use record::{FIELD_TABLE, FieldSpec, ProductField, interpret_body, product_record_from};
