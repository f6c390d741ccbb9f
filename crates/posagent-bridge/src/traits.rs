// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait for OS-level Bluetooth serial binding.

use async_trait::async_trait;

use posagent_core::error::Result;
use posagent_core::types::MacAddress;

/// Create and remove RFCOMM serial device bindings.
///
/// A slot is the index of the local device node (`/dev/rfcomm{slot}` on
/// Linux). Implementations must be safe to call for a slot that is not bound.
#[async_trait]
pub trait RfcommControl: Send + Sync {
    /// Bind `slot` to `address` on RFCOMM service `channel`.
    async fn bind(&self, slot: u8, address: MacAddress, channel: u8) -> Result<()>;

    /// Release whatever is bound to `slot`.
    async fn release(&self, slot: u8) -> Result<()>;
}
