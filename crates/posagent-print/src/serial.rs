// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bluetooth serial driver.
//
// Writes to an RFCOMM device node created by the channel binder. Opening the
// node makes the kernel bring up the radio link; this driver never binds or
// pairs anything itself.

use std::path::Path;
use std::time::Duration;

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};

use posagent_core::error::{AgentError, Result};
use posagent_core::types::TransportKind;

const KIND: TransportKind = TransportKind::BluetoothSerial;

/// Write `segments` in order to the serial node at `device`.
#[instrument(skip_all, fields(device = %device.display()))]
pub async fn send_serial(device: &Path, segments: &[&[u8]], timeout: Duration) -> Result<()> {
    let mut port = tokio::time::timeout(timeout, OpenOptions::new().write(true).open(device))
        .await
        .map_err(|_| {
            AgentError::open(
                KIND,
                format!("opening {} timed out after {}ms", device.display(), timeout.as_millis()),
            )
        })?
        .map_err(|e| AgentError::open(KIND, format!("{}: {e}", device.display())))?;

    let write = async {
        for segment in segments {
            port.write_all(segment).await?;
        }
        port.flush().await
    };
    tokio::time::timeout(timeout, write)
        .await
        .map_err(|_| {
            AgentError::write(
                KIND,
                format!("write to {} timed out after {}ms", device.display(), timeout.as_millis()),
            )
        })?
        .map_err(|e| AgentError::write(KIND, format!("{}: {e}", device.display())))?;

    info!("serial receipt sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_to_device_node() {
        let dir = tempfile::tempdir().expect("tempdir");
        let node = dir.path().join("rfcomm0");
        std::fs::write(&node, b"").expect("create node");

        send_serial(&node, &[b"Hello".as_slice(), b"\x1dVA\x00".as_slice()], Duration::from_secs(1))
            .await
            .expect("send");

        assert_eq!(std::fs::read(&node).expect("read"), b"Hello\x1dVA\x00");
    }

    #[tokio::test]
    async fn missing_node_is_open_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = send_serial(&dir.path().join("rfcomm7"), &[b"x".as_slice()], Duration::from_secs(1))
            .await
            .expect_err("missing node");
        assert!(matches!(
            err,
            AgentError::TransportOpen {
                transport: TransportKind::BluetoothSerial,
                ..
            }
        ));
    }
}
