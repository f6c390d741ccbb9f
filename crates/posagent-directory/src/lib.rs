// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// posagent Directory — HTTP client for the auth/printer-directory service and
// the in-memory printer profile cache built from it.

pub mod cache;
pub mod client;

pub use cache::{DirectoryCache, PrinterSource};
pub use client::DirectoryClient;
