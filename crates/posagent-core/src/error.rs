// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for posagent.

use thiserror::Error;

use crate::types::{MacAddress, TransportKind};

/// Top-level error type for all posagent operations.
#[derive(Debug, Error)]
pub enum AgentError {
    // -- Startup --
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    // -- Directory --
    #[error("printer directory fetch failed: {0}")]
    DirectoryFetch(String),

    // -- Broker --
    #[error("broker connection error: {0}")]
    Connection(String),

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    // -- Transport --
    #[error("cannot open {transport} channel: {detail}")]
    TransportOpen {
        transport: TransportKind,
        detail: String,
    },

    #[error("write to {transport} printer failed: {detail}")]
    TransportWrite {
        transport: TransportKind,
        detail: String,
    },

    #[error("no serial binding for bluetooth printer {0}")]
    UnboundDevice(MacAddress),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

impl AgentError {
    pub fn open(transport: TransportKind, detail: impl Into<String>) -> Self {
        Self::TransportOpen {
            transport,
            detail: detail.into(),
        }
    }

    pub fn write(transport: TransportKind, detail: impl Into<String>) -> Self {
        Self::TransportWrite {
            transport,
            detail: detail.into(),
        }
    }

    /// Errors that terminate the process when they occur during startup.
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(self, Self::Authentication(_) | Self::Configuration(_))
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, AgentError>;
