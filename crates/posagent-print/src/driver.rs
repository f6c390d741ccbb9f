// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transport driver set: one entry point that writes a payload to whichever
// transport a printer profile describes.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use posagent_core::config::TransportSettings;
use posagent_core::error::{AgentError, Result};
use posagent_core::types::PrinterProfile;

use crate::binder::ChannelBinder;
use crate::ble::GattDriver;
use crate::transport::Transport;
use crate::{network, serial, usb};

/// Destination for rendered receipts.
#[async_trait]
pub trait PrinterSink: Send + Sync {
    /// Write `payload` to the printer described by `profile`.
    async fn send(&self, profile: &PrinterProfile, payload: &[u8]) -> Result<()>;
}

/// Dispatches to the USB, raw TCP, Bluetooth serial and GATT drivers.
pub struct TransportDriverSet {
    binder: Arc<ChannelBinder>,
    settings: TransportSettings,
    gatt: GattDriver,
}

impl TransportDriverSet {
    pub fn new(binder: Arc<ChannelBinder>, settings: TransportSettings) -> Self {
        let gatt = GattDriver::new(&settings);
        Self {
            binder,
            settings,
            gatt,
        }
    }
}

#[async_trait]
impl PrinterSink for TransportDriverSet {
    async fn send(&self, profile: &PrinterProfile, payload: &[u8]) -> Result<()> {
        let transport = Transport::from_profile(profile)?;
        let mut segments: Vec<&[u8]> = vec![payload];
        if let Some(terminator) = transport.terminator() {
            segments.push(terminator);
        }
        debug!(printer = %profile.name, transport = %transport.kind(), bytes = payload.len(), "dispatching");

        match &transport {
            Transport::Usb {
                vendor_id,
                product_id,
            } => usb::send_usb(*vendor_id, *product_id, &segments, self.settings.usb_timeout()).await,
            Transport::Network { host, port } => {
                network::send_raw(host, *port, &segments, self.settings.network_timeout()).await
            }
            Transport::BluetoothSerial { address, .. } => {
                // No inline bind: a missing handle waits for the next rebind.
                let handle = self
                    .binder
                    .handle_for(address)
                    .ok_or(AgentError::UnboundDevice(*address))?;
                serial::send_serial(&handle.device, &segments, self.settings.serial_timeout()).await
            }
            Transport::BluetoothGatt {
                address,
                characteristic,
            } => self.gatt.send(*address, *characteristic, &segments).await,
        }
    }
}
