// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transport descriptors derived from directory profiles.

use serde_json::Value;
use uuid::Uuid;

use posagent_core::error::{AgentError, Result};
use posagent_core::types::{MacAddress, PrinterProfile, TransportKind};

/// Default raw TCP port (JetDirect).
pub const RAW_PORT: u16 = 9100;

/// ESC/POS `GS V A 0`: feed to the cutter and perform a full cut.
pub const CUT: &[u8] = &[0x1d, 0x56, 0x41, 0x00];

/// Bluetooth base UUID; 16-bit characteristic ids expand into it.
const BLUETOOTH_BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5f9b_34fb;

/// How to reach one printer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    Usb {
        vendor_id: u16,
        product_id: u16,
    },
    Network {
        host: String,
        port: u16,
    },
    /// Reached through a pre-bound RFCOMM node; `channel` overrides the
    /// configured default service channel when binding.
    BluetoothSerial {
        address: MacAddress,
        channel: Option<u8>,
    },
    BluetoothGatt {
        address: MacAddress,
        characteristic: Uuid,
    },
}

impl Transport {
    /// Validate a profile's kind and connection data.
    pub fn from_profile(profile: &PrinterProfile) -> Result<Self> {
        let kind = profile.transport_kind().ok_or_else(|| {
            config_err(profile, format!("unknown transport kind {:?}", profile.kind))
        })?;

        match kind {
            TransportKind::Usb => Ok(Self::Usb {
                vendor_id: usb_id(profile, "vendor_id")?,
                product_id: usb_id(profile, "product_id")?,
            }),
            TransportKind::Network => {
                let host = profile
                    .connection_str("ip_address")
                    .or_else(|| profile.connection_str("host"))
                    .ok_or_else(|| config_err(profile, "missing ip_address/host"))?
                    .to_string();
                let port = match profile.connection_data.get("port") {
                    None | Some(Value::Null) => RAW_PORT,
                    Some(v) => number_field(v)
                        .and_then(|n| u16::try_from(n).ok())
                        .filter(|p| *p != 0)
                        .ok_or_else(|| config_err(profile, format!("invalid port {v}")))?,
                };
                Ok(Self::Network { host, port })
            }
            TransportKind::BluetoothSerial => {
                let channel = match profile.connection_data.get("channel") {
                    None | Some(Value::Null) => None,
                    Some(v) => Some(
                        number_field(v)
                            .and_then(|n| u8::try_from(n).ok())
                            .filter(|c| (1..=30).contains(c))
                            .ok_or_else(|| {
                                config_err(profile, format!("invalid RFCOMM channel {v}"))
                            })?,
                    ),
                };
                Ok(Self::BluetoothSerial {
                    address: mac_address(profile)?,
                    channel,
                })
            }
            TransportKind::BluetoothBle => {
                let raw = profile
                    .connection_str("characteristic")
                    .or_else(|| profile.connection_str("write_characteristic"))
                    .ok_or_else(|| config_err(profile, "missing write characteristic"))?;
                let characteristic = parse_characteristic(raw).ok_or_else(|| {
                    config_err(profile, format!("invalid characteristic {raw:?}"))
                })?;
                Ok(Self::BluetoothGatt {
                    address: mac_address(profile)?,
                    characteristic,
                })
            }
        }
    }

    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Usb { .. } => TransportKind::Usb,
            Self::Network { .. } => TransportKind::Network,
            Self::BluetoothSerial { .. } => TransportKind::BluetoothSerial,
            Self::BluetoothGatt { .. } => TransportKind::BluetoothBle,
        }
    }

    /// Control sequence written after the receipt text. GATT printers get
    /// none.
    pub fn terminator(&self) -> Option<&'static [u8]> {
        match self {
            Self::Usb { .. } | Self::Network { .. } | Self::BluetoothSerial { .. } => Some(CUT),
            Self::BluetoothGatt { .. } => None,
        }
    }
}

fn config_err(profile: &PrinterProfile, detail: impl AsRef<str>) -> AgentError {
    AgentError::Configuration(format!("printer {}: {}", profile.name, detail.as_ref()))
}

fn number_field(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// USB ids are hexadecimal text, with or without a `0x` prefix.
fn usb_id(profile: &PrinterProfile, key: &str) -> Result<u16> {
    let raw = profile
        .connection_str(key)
        .ok_or_else(|| config_err(profile, format!("missing {key}")))?;
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    u16::from_str_radix(digits, 16)
        .map_err(|_| config_err(profile, format!("invalid {key} {raw:?}")))
}

fn mac_address(profile: &PrinterProfile) -> Result<MacAddress> {
    profile
        .connection_str("mac_address")
        .ok_or_else(|| config_err(profile, "missing mac_address"))?
        .parse()
        .map_err(|e: String| config_err(profile, e))
}

/// Full UUID, or a 4-digit 16-bit id expanded into the Bluetooth base UUID.
fn parse_characteristic(raw: &str) -> Option<Uuid> {
    if let Ok(uuid) = Uuid::parse_str(raw) {
        return Some(uuid);
    }
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    if digits.len() != 4 {
        return None;
    }
    let short = u16::from_str_radix(digits, 16).ok()?;
    Some(Uuid::from_u128(BLUETOOTH_BASE_UUID | (u128::from(short) << 96)))
}
