// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// posagent — Core types, configuration, and error definitions shared across
// all crates.

pub mod config;
pub mod digest;
pub mod error;
pub mod hints;
pub mod types;

pub use config::AgentConfig;
pub use error::AgentError;
pub use types::*;
