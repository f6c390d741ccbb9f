// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bluetooth RFCOMM channel binder.
//
// Bluetooth serial printers are written through `rfcommN` device nodes. The
// binder assigns every Bluetooth serial printer in the directory a slot
// number `N`, releases whatever the OS had bound at that slot, and binds the
// printer's address there. The resulting MAC -> node table is swapped in as a
// whole once the pass finishes. Nothing is persisted: every rebind starts
// from the current directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{debug, info, instrument, warn};

use posagent_bridge::RfcommControl;
use posagent_core::config::BluetoothSettings;
use posagent_core::types::{DirectorySnapshot, MacAddress, TransportKind};

use crate::transport::Transport;

/// A bound RFCOMM node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialHandle {
    pub slot: u8,
    pub device: PathBuf,
}

type BindingTable = BTreeMap<MacAddress, SerialHandle>;

pub struct ChannelBinder {
    control: Arc<dyn RfcommControl>,
    device_dir: PathBuf,
    default_channel: u8,
    table: RwLock<Arc<BindingTable>>,
    /// Slots handed out by the previous pass, so shrinking directories
    /// release what they no longer use.
    previous_slots: tokio::sync::Mutex<u8>,
}

impl ChannelBinder {
    pub fn new(control: Arc<dyn RfcommControl>, settings: &BluetoothSettings) -> Self {
        Self {
            control,
            device_dir: PathBuf::from(&settings.device_dir),
            default_channel: settings.default_channel,
            table: RwLock::new(Arc::new(BindingTable::new())),
            previous_slots: tokio::sync::Mutex::new(0),
        }
    }

    /// Re-create every binding from `snapshot`.
    ///
    /// Printers are taken in name order so the same directory always yields
    /// the same slots. Several printers sharing one address share the first
    /// one's slot. A failed bind leaves that address unbound until the next
    /// rebind; it is logged, never returned.
    #[instrument(skip_all)]
    pub async fn rebind(&self, snapshot: &DirectorySnapshot) {
        let mut previous_slots = self.previous_slots.lock().await;

        let mut profiles: Vec<_> = snapshot
            .values()
            .filter(|p| p.transport_kind() == Some(TransportKind::BluetoothSerial))
            .collect();
        profiles.sort_by(|a, b| a.name.cmp(&b.name));

        let mut wanted: Vec<(MacAddress, u8, &str)> = Vec::new();
        for profile in profiles {
            match Transport::from_profile(profile) {
                Ok(Transport::BluetoothSerial { address, channel }) => {
                    if wanted.iter().any(|(mac, _, _)| *mac == address) {
                        debug!(printer = %profile.name, mac = %address, "address already assigned a slot");
                        continue;
                    }
                    wanted.push((address, channel.unwrap_or(self.default_channel), &profile.name));
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "skipping Bluetooth serial printer"),
            }
        }

        if wanted.len() > usize::from(u8::MAX) {
            warn!(count = wanted.len(), "too many Bluetooth serial printers; extra ones stay unbound");
            wanted.truncate(usize::from(u8::MAX));
        }

        let mut table = BindingTable::new();
        let mut slot: u8 = 0;
        for (address, channel, printer) in wanted {
            if let Err(e) = self.control.release(slot).await {
                debug!(slot, error = %e, "release before bind failed");
            }
            match self.control.bind(slot, address, channel).await {
                Ok(()) => {
                    let device = device_path(&self.device_dir, slot);
                    info!(printer, mac = %address, channel, device = %device.display(), "RFCOMM bound");
                    table.insert(address, SerialHandle { slot, device });
                }
                Err(e) => {
                    warn!(printer, mac = %address, slot, error = %e, "RFCOMM bind failed; printer left unbound");
                }
            }
            slot += 1;
        }

        for stale in slot..*previous_slots {
            if let Err(e) = self.control.release(stale).await {
                debug!(slot = stale, error = %e, "release of stale slot failed");
            }
        }
        *previous_slots = slot;

        info!(bound = table.len(), slots = slot, "Bluetooth bindings refreshed");
        *self.table.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(table);
    }

    /// Bound node for `address`, if the last rebind succeeded for it.
    pub fn handle_for(&self, address: &MacAddress) -> Option<SerialHandle> {
        self.table
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(address)
            .cloned()
    }

    /// Current bindings, ordered by address.
    #[cfg(test)]
    pub(crate) fn assignments(&self) -> Vec<(MacAddress, SerialHandle)> {
        let table = Arc::clone(&self.table.read().unwrap_or_else(|e| e.into_inner()));
        table.iter().map(|(mac, h)| (*mac, h.clone())).collect()
    }
}

fn device_path(dir: &Path, slot: u8) -> PathBuf {
    dir.join(format!("rfcomm{slot}"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use posagent_core::error::{AgentError, Result};
    use posagent_core::types::PrinterProfile;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Call {
        Bind(u8, MacAddress, u8),
        Release(u8),
    }

    /// Records every call; binds for addresses in `failing` return an error.
    #[derive(Default)]
    pub(crate) struct RecordingRfcomm {
        pub(crate) calls: Mutex<Vec<Call>>,
        pub(crate) failing: HashSet<MacAddress>,
    }

    impl RecordingRfcomm {
        pub(crate) fn calls(&self) -> Vec<Call> {
            self.calls.lock().expect("calls").clone()
        }

        pub(crate) fn binds(&self) -> Vec<Call> {
            self.calls()
                .into_iter()
                .filter(|c| matches!(c, Call::Bind(..)))
                .collect()
        }
    }

    #[async_trait]
    impl RfcommControl for RecordingRfcomm {
        async fn bind(&self, slot: u8, address: MacAddress, channel: u8) -> Result<()> {
            self.calls
                .lock()
                .expect("calls")
                .push(Call::Bind(slot, address, channel));
            if self.failing.contains(&address) {
                return Err(AgentError::Bridge(format!("cannot bind {address}")));
            }
            Ok(())
        }

        async fn release(&self, slot: u8) -> Result<()> {
            self.calls.lock().expect("calls").push(Call::Release(slot));
            Ok(())
        }
    }

    pub(crate) fn serial_profile(name: &str, mac: &str) -> PrinterProfile {
        PrinterProfile {
            name: name.into(),
            kind: "bluetooth_serial".into(),
            connection_data: serde_json::json!({ "mac_address": mac })
                .as_object()
                .cloned()
                .unwrap_or_default(),
        }
    }

    fn snapshot(profiles: Vec<PrinterProfile>) -> DirectorySnapshot {
        profiles.into_iter().map(|p| (p.name.clone(), p)).collect()
    }

    fn mac(s: &str) -> MacAddress {
        s.parse().expect("mac")
    }

    fn binder(control: Arc<RecordingRfcomm>) -> ChannelBinder {
        ChannelBinder::new(control, &BluetoothSettings::default())
    }

    #[tokio::test]
    async fn slots_follow_name_order() {
        let control = Arc::new(RecordingRfcomm::default());
        let binder = binder(Arc::clone(&control));
        binder
            .rebind(&snapshot(vec![
                serial_profile("bar-2", "00:00:00:00:00:02"),
                serial_profile("bar-1", "00:00:00:00:00:01"),
            ]))
            .await;

        assert_eq!(
            control.calls(),
            vec![
                Call::Release(0),
                Call::Bind(0, mac("00:00:00:00:00:01"), 1),
                Call::Release(1),
                Call::Bind(1, mac("00:00:00:00:00:02"), 1),
            ]
        );
        assert_eq!(
            binder.handle_for(&mac("00:00:00:00:00:02")),
            Some(SerialHandle {
                slot: 1,
                device: PathBuf::from("/dev/rfcomm1")
            })
        );
    }

    #[tokio::test]
    async fn rebind_is_idempotent() {
        let control = Arc::new(RecordingRfcomm::default());
        let binder = binder(Arc::clone(&control));
        let snap = snapshot(vec![
            serial_profile("a", "00:00:00:00:00:01"),
            serial_profile("b", "00:00:00:00:00:02"),
        ]);

        binder.rebind(&snap).await;
        let first = binder.assignments();
        let first_calls = control.calls();
        binder.rebind(&snap).await;

        assert_eq!(binder.assignments(), first);
        // The second pass repeats exactly the first: release then bind per slot.
        assert_eq!(control.calls()[first_calls.len()..], first_calls[..]);
    }

    #[tokio::test]
    async fn failed_bind_leaves_only_that_printer_unbound() {
        let broken = mac("00:00:00:00:00:01");
        let control = Arc::new(RecordingRfcomm {
            failing: HashSet::from([broken]),
            ..Default::default()
        });
        let binder = binder(Arc::clone(&control));
        binder
            .rebind(&snapshot(vec![
                serial_profile("a", "00:00:00:00:00:01"),
                serial_profile("b", "00:00:00:00:00:02"),
            ]))
            .await;

        assert_eq!(binder.handle_for(&broken), None);
        assert_eq!(
            binder
                .handle_for(&mac("00:00:00:00:00:02"))
                .map(|h| h.slot),
            Some(1)
        );
    }

    #[tokio::test]
    async fn shared_address_binds_once_and_stale_slots_are_released() {
        let control = Arc::new(RecordingRfcomm::default());
        let binder = binder(Arc::clone(&control));
        binder
            .rebind(&snapshot(vec![
                serial_profile("a", "00:00:00:00:00:01"),
                serial_profile("b", "00:00:00:00:00:02"),
                serial_profile("c", "00:00:00:00:00:02"),
            ]))
            .await;
        assert_eq!(control.binds().len(), 2);

        let before = control.calls().len();
        binder
            .rebind(&snapshot(vec![serial_profile("a", "00:00:00:00:00:01")]))
            .await;
        assert_eq!(
            control.calls()[before..],
            [
                Call::Release(0),
                Call::Bind(0, mac("00:00:00:00:00:01"), 1),
                Call::Release(1),
            ]
        );
        assert_eq!(binder.handle_for(&mac("00:00:00:00:00:02")), None);
    }

    #[tokio::test]
    async fn profile_channel_overrides_default_and_other_kinds_are_ignored() {
        let control = Arc::new(RecordingRfcomm::default());
        let binder = binder(Arc::clone(&control));
        let mut with_channel = serial_profile("a", "00:00:00:00:00:01");
        with_channel
            .connection_data
            .insert("channel".into(), serde_json::json!(3));
        let network = PrinterProfile {
            name: "lan".into(),
            kind: "network".into(),
            connection_data: serde_json::json!({"ip_address": "10.0.0.5"})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        };
        binder.rebind(&snapshot(vec![with_channel, network])).await;

        assert_eq!(
            control.binds(),
            vec![Call::Bind(0, mac("00:00:00:00:00:01"), 3)]
        );
    }
}
