// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the posagent receipt print agent.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Stored description of how to reach one physical printer, exactly as the
/// printer directory returned it.
///
/// The transport descriptor inside `connection_data` is validated when a job
/// is dispatched, not when the directory is fetched, so a single bad entry
/// only fails the jobs addressed to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterProfile {
    /// Stable printer identifier; print jobs address printers by this name.
    pub name: String,
    /// Transport kind string (`usb`, `network`, `bluetooth_serial`, ...).
    /// Missing means unknown; the job fails at dispatch.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Transport-specific connection fields. `null` reads as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub connection_data: serde_json::Map<String, serde_json::Value>,
}

fn null_as_empty<'de, D>(
    deserializer: D,
) -> Result<serde_json::Map<String, serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<serde_json::Map<String, serde_json::Value>>::deserialize(deserializer)
        .map(Option::unwrap_or_default)
}

impl PrinterProfile {
    /// Parsed transport kind, or `None` when the directory used a kind this
    /// agent does not know.
    pub fn transport_kind(&self) -> Option<TransportKind> {
        TransportKind::parse(&self.kind)
    }

    /// String field from `connection_data`, trimmed; empty strings count as
    /// absent.
    pub fn connection_str(&self, key: &str) -> Option<&str> {
        self.connection_data
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Immutable directory snapshot keyed by printer name.
pub type DirectorySnapshot = HashMap<String, PrinterProfile>;

/// Physical transport used to reach a printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Usb,
    Network,
    /// Classic Bluetooth through a bound RFCOMM serial node.
    BluetoothSerial,
    /// Bluetooth Low Energy, written through a GATT characteristic.
    BluetoothBle,
}

impl TransportKind {
    /// Parse a directory `type` string. `bluetooth` is the legacy spelling of
    /// `bluetooth_serial`.
    pub fn parse(kind: &str) -> Option<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "usb" => Some(Self::Usb),
            "network" => Some(Self::Network),
            "bluetooth" | "bluetooth_serial" => Some(Self::BluetoothSerial),
            "bluetooth_ble" | "ble" => Some(Self::BluetoothBle),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Usb => "usb",
            Self::Network => "network",
            Self::BluetoothSerial => "bluetooth_serial",
            Self::BluetoothBle => "bluetooth_ble",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bluetooth hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress(pub [u8; 6]);

impl FromStr for MacAddress {
    type Err = String;

    /// Accepts `AA:BB:CC:DD:EE:FF` or `aa-bb-cc-dd-ee-ff`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split([':', '-']).collect();
        if parts.len() != 6 {
            return Err(format!("invalid MAC address {s:?}: expected 6 octets"));
        }
        let mut octets = [0u8; 6];
        for (slot, part) in octets.iter_mut().zip(parts) {
            if part.len() != 2 {
                return Err(format!("invalid MAC address {s:?}: bad octet {part:?}"));
            }
            *slot = u8::from_str_radix(part, 16)
                .map_err(|_| format!("invalid MAC address {s:?}: bad octet {part:?}"))?;
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

/// A print job as delivered on the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintJob {
    pub printer_id: String,
    pub lines: Vec<String>,
}

impl PrintJob {
    /// Receipt text: lines joined with newline separators.
    pub fn receipt_text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Kind of directory change announced by a control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Create,
    Update,
    Delete,
}

impl ControlAction {
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Directory-change notification. Carries nothing beyond the action; the
/// agent always refetches the whole directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlMessage {
    pub action: ControlAction,
}

/// Settlement decision for one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Processed (or deliberately dropped); the broker forgets the message.
    Ack,
    /// Not processed; `requeue` asks the broker to redeliver it.
    Nack { requeue: bool },
}

impl DispatchOutcome {
    pub const REQUEUE: Self = Self::Nack { requeue: true };
}

/// What to do with a delivery that cannot be printed for a reason that a
/// retry may or may not fix (unknown printer id, malformed body).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryPolicy {
    /// Nack with requeue so the broker redelivers it.
    #[default]
    Requeue,
    /// Ack and discard.
    Drop,
}

impl DeliveryPolicy {
    pub fn outcome(&self) -> DispatchOutcome {
        match self {
            Self::Requeue => DispatchOutcome::REQUEUE,
            Self::Drop => DispatchOutcome::Ack,
        }
    }
}

/// Broker connection parameters, from configuration or from
/// `GET {base_url}/auth/rabbitmq`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerEndpoint {
    pub url: String,
    pub queue_name: String,
}
