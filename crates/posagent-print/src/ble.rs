// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bluetooth LE (GATT) receipt printer driver.
//
// Every job runs the full sequence: locate the peripheral by address, connect,
// discover services, find the configured writable characteristic, write the
// receipt in small chunks, disconnect. Locating and connecting are the slow,
// flaky steps, so each one has its own deadline.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    BDAddr, CharPropFlags, Central, Characteristic, Manager as _, Peripheral as PeripheralApi,
    ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use posagent_core::config::TransportSettings;
use posagent_core::error::{AgentError, Result};
use posagent_core::types::{MacAddress, TransportKind};

const KIND: TransportKind = TransportKind::BluetoothBle;

/// Interval between peripheral list polls while scanning.
const SCAN_POLL: Duration = Duration::from_millis(250);

/// The GATT operations one print job needs from a located peripheral.
#[async_trait]
pub(crate) trait GattLink: Send + Sync {
    async fn connect(&self) -> Result<()>;
    /// Discover services and return every characteristic found.
    async fn discover(&self) -> Result<BTreeSet<Characteristic>>;
    async fn write(&self, target: &Characteristic, chunk: &[u8], mode: WriteType) -> Result<()>;
    async fn disconnect(&self) -> Result<()>;
}

#[async_trait]
impl GattLink for Peripheral {
    async fn connect(&self) -> Result<()> {
        PeripheralApi::connect(self)
            .await
            .map_err(|e| AgentError::open(KIND, format!("connect: {e}")))
    }

    async fn discover(&self) -> Result<BTreeSet<Characteristic>> {
        PeripheralApi::discover_services(self)
            .await
            .map_err(|e| AgentError::open(KIND, format!("service discovery: {e}")))?;
        Ok(PeripheralApi::characteristics(self))
    }

    async fn write(&self, target: &Characteristic, chunk: &[u8], mode: WriteType) -> Result<()> {
        PeripheralApi::write(self, target, chunk, mode)
            .await
            .map_err(|e| AgentError::write(KIND, format!("GATT write: {e}")))
    }

    async fn disconnect(&self) -> Result<()> {
        PeripheralApi::disconnect(self)
            .await
            .map_err(|e| AgentError::write(KIND, format!("GATT disconnect: {e}")))
    }
}

/// GATT driver. The Bluetooth adapter is looked up on first use and reused.
pub struct GattDriver {
    adapter: OnceCell<Adapter>,
    connect_timeout: Duration,
    scan_window: Duration,
    chunk_size: usize,
}

impl GattDriver {
    pub fn new(settings: &TransportSettings) -> Self {
        Self {
            adapter: OnceCell::new(),
            connect_timeout: settings.ble_connect_timeout(),
            scan_window: settings.ble_scan(),
            chunk_size: settings.ble_chunk_size.max(1),
        }
    }

    async fn adapter(&self) -> Result<&Adapter> {
        self.adapter
            .get_or_try_init(|| async {
                let manager = Manager::new()
                    .await
                    .map_err(|e| AgentError::open(KIND, format!("bluetooth manager: {e}")))?;
                manager
                    .adapters()
                    .await
                    .map_err(|e| AgentError::open(KIND, format!("list adapters: {e}")))?
                    .into_iter()
                    .next()
                    .ok_or_else(|| AgentError::open(KIND, "no bluetooth adapter"))
            })
            .await
    }

    /// Write `segments` to `characteristic` on the peripheral at `address`.
    #[instrument(skip(self, segments), fields(mac = %address))]
    pub async fn send(
        &self,
        address: MacAddress,
        characteristic: Uuid,
        segments: &[&[u8]],
    ) -> Result<()> {
        let adapter = self.adapter().await?;
        let peripheral = self.locate(adapter, BDAddr::from(address.0)).await?;
        self.deliver(&peripheral, characteristic, segments).await?;
        info!("GATT receipt sent");
        Ok(())
    }

    /// Scan until the peripheral with `address` shows up or the scan window
    /// closes.
    async fn locate(&self, adapter: &Adapter, address: BDAddr) -> Result<Peripheral> {
        adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| AgentError::open(KIND, format!("start scan: {e}")))?;

        let found = tokio::time::timeout(self.scan_window, async {
            loop {
                if let Ok(peripherals) = adapter.peripherals().await {
                    if let Some(p) = peripherals.into_iter().find(|p| p.address() == address) {
                        return p;
                    }
                }
                tokio::time::sleep(SCAN_POLL).await;
            }
        })
        .await;

        if let Err(e) = adapter.stop_scan().await {
            debug!(error = %e, "stop scan failed");
        }

        found.map_err(|_| {
            AgentError::open(
                KIND,
                format!("{address} not found within {}ms", self.scan_window.as_millis()),
            )
        })
    }

    /// Connect, write, and disconnect. The disconnect runs whatever happened
    /// after the connect attempt started.
    async fn deliver<L: GattLink + ?Sized>(
        &self,
        link: &L,
        characteristic: Uuid,
        segments: &[&[u8]],
    ) -> Result<()> {
        let result = self.connect_and_write(link, characteristic, segments).await;
        if let Err(e) = link.disconnect().await {
            warn!(error = %e, "GATT disconnect failed");
        }
        result
    }

    async fn connect_and_write<L: GattLink + ?Sized>(
        &self,
        link: &L,
        characteristic: Uuid,
        segments: &[&[u8]],
    ) -> Result<()> {
        tokio::time::timeout(self.connect_timeout, link.connect())
            .await
            .map_err(|_| {
                AgentError::open(
                    KIND,
                    format!("connect timed out after {}ms", self.connect_timeout.as_millis()),
                )
            })??;
        debug!("GATT connected");

        let characteristics = tokio::time::timeout(self.connect_timeout, link.discover())
            .await
            .map_err(|_| AgentError::open(KIND, "service discovery timed out"))??;

        let (target, write_type) = characteristics
            .into_iter()
            .filter(|c| c.uuid == characteristic)
            .find_map(|c| write_type_for(&c).map(|wt| (c, wt)))
            .ok_or_else(|| {
                AgentError::open(KIND, format!("no writable characteristic {characteristic}"))
            })?;

        for segment in segments {
            for chunk in segment.chunks(self.chunk_size) {
                link.write(&target, chunk, write_type).await?;
            }
        }
        Ok(())
    }
}

/// Write mode for a characteristic, preferring write-without-response.
fn write_type_for(characteristic: &Characteristic) -> Option<WriteType> {
    preferred_write_type(characteristic.properties)
}

fn preferred_write_type(properties: CharPropFlags) -> Option<WriteType> {
    if properties.contains(CharPropFlags::WRITE_WITHOUT_RESPONSE) {
        Some(WriteType::WithoutResponse)
    } else if properties.contains(CharPropFlags::WRITE) {
        Some(WriteType::WithResponse)
    } else {
        None
    }
}
