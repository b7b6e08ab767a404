// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// barcodelens-scan — Drives one upload through preprocessing, decoding and
// product lookup.

pub mod orchestrator;

pub use orchestrator::ScanOrchestrator;
