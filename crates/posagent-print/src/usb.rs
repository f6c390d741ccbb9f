// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// USB receipt printer driver.
//
// Finds the device by vendor/product id, claims the interface that owns the
// first bulk OUT endpoint (detaching a kernel `usblp` driver where the OS
// has one attached), and submits the receipt as bulk transfers. The claimed
// interface is released when it goes out of scope.

use std::time::Duration;

use nusb::transfer::{Direction, EndpointType};
use tracing::{debug, info, instrument};

use posagent_core::error::{AgentError, Result};
use posagent_core::types::TransportKind;

const KIND: TransportKind = TransportKind::Usb;

/// Write `segments` in order to the USB printer `vendor_id:product_id`.
#[instrument(skip(segments, timeout))]
pub async fn send_usb(
    vendor_id: u16,
    product_id: u16,
    segments: &[&[u8]],
    timeout: Duration,
) -> Result<()> {
    let info = nusb::list_devices()
        .map_err(|e| AgentError::open(KIND, format!("enumerate USB devices: {e}")))?
        .find(|d| d.vendor_id() == vendor_id && d.product_id() == product_id)
        .ok_or_else(|| {
            AgentError::open(
                KIND,
                format!("device {vendor_id:04x}:{product_id:04x} not present"),
            )
        })?;

    let device = info
        .open()
        .map_err(|e| AgentError::open(KIND, format!("open device: {e}")))?;
    let (interface_number, endpoint) = bulk_out_endpoint(&device)?;
    let interface = device
        .detach_and_claim_interface(interface_number)
        .map_err(|e| {
            AgentError::open(KIND, format!("claim interface {interface_number} (busy?): {e}"))
        })?;
    debug!(interface_number, endpoint, "USB interface claimed");

    for segment in segments {
        let completion = tokio::time::timeout(timeout, interface.bulk_out(endpoint, segment.to_vec()))
            .await
            .map_err(|_| {
                AgentError::write(
                    KIND,
                    format!("bulk transfer timed out after {}ms", timeout.as_millis()),
                )
            })?;
        let written = completion
            .into_result()
            .map_err(|e| AgentError::write(KIND, format!("bulk transfer: {e}")))?;
        if written.actual_length() != segment.len() {
            return Err(AgentError::write(
                KIND,
                format!(
                    "short bulk transfer: {} of {} bytes",
                    written.actual_length(),
                    segment.len()
                ),
            ));
        }
    }

    info!("USB receipt sent");
    Ok(())
}

/// `(interface number, endpoint address)` of the first bulk OUT endpoint in
/// the active configuration.
fn bulk_out_endpoint(device: &nusb::Device) -> Result<(u8, u8)> {
    let config = device
        .active_configuration()
        .map_err(|e| AgentError::open(KIND, format!("read configuration: {e}")))?;

    config
        .interface_alt_settings()
        .find_map(|alt| {
            alt.endpoints()
                .find(|ep| ep.direction() == Direction::Out && ep.transfer_type() == EndpointType::Bulk)
                .map(|ep| (alt.interface_number(), ep.address()))
        })
        .ok_or_else(|| AgentError::open(KIND, "no bulk OUT endpoint on device"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_device_is_open_error() {
        // 0xffff is the reserved "no vendor" id, so nothing can match.
        let err = send_usb(0xffff, 0xfffe, &[b"x".as_slice()], Duration::from_secs(1))
            .await
            .expect_err("absent");
        assert!(matches!(
            err,
            AgentError::TransportOpen {
                transport: TransportKind::Usb,
                ..
            }
        ));
    }
}
