// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for platforms without the BlueZ `rfcomm` tool.
//
// Every call returns `PlatformUnavailable`; Bluetooth serial printers stay
// unbound and their jobs fail fast.

use async_trait::async_trait;

use posagent_core::error::{AgentError, Result};
use posagent_core::types::MacAddress;

use crate::traits::RfcommControl;

/// No-op RFCOMM control returned on non-Linux platforms.
pub struct StubRfcomm;

#[async_trait]
impl RfcommControl for StubRfcomm {
    async fn bind(&self, _slot: u8, _address: MacAddress, _channel: u8) -> Result<()> {
        tracing::warn!("RfcommControl::bind called on stub bridge");
        Err(AgentError::PlatformUnavailable)
    }

    async fn release(&self, _slot: u8) -> Result<()> {
        Err(AgentError::PlatformUnavailable)
    }
}
