// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # AlgoCred Protocol — Core Library
//!
//! Academic credentials that can be checked by anyone and read only by the
//! student. An institution issues tokens on a public ledger; each token
//! carries a fingerprint of the credential in the clear and, for semester
//! proformas, the full marks sealed under the student's seat number.
//!
//! ## Modules
//!
//! - **config** — Wire constants, thresholds, labels.
//! - **crypto** — SHA-256, base64 and the AES-256-GCM primitive.
//! - **record** — Semester and degree records, and their JSON layout.
//! - **fingerprint** — Canonical field strings and their digests.
//! - **seal** — Seat-number keyed encryption of records.
//! - **envelope** — The note document that carries a sealed record.
//! - **grading** — Percentages, GPAs and the fail rule.
//! - **registry** — Issuing institutions and their grading scales.
//! - **ledger** — The read/write seam to whatever ledger holds the tokens.
//! - **issuance** — Records in, mint requests out.
//! - **verification** — Degree checks and semester reveals.
//! - **transcript** — Multi-semester marksheet figures.
//!
//! Everything here is synchronous and free of global state. The registry is
//! built once and passed by reference; the ledger is a trait object or a
//! generic parameter, never a singleton.

pub mod config;
pub mod crypto;
pub mod envelope;
pub mod fingerprint;
pub mod grading;
pub mod issuance;
pub mod ledger;
pub mod record;
pub mod registry;
pub mod seal;
pub mod transcript;
pub mod verification;
