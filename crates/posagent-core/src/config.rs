// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Agent configuration, loaded from a JSON file next to the executable.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AgentError, Result};
use crate::types::{BrokerEndpoint, DeliveryPolicy};

/// Default config file name, resolved relative to the executable.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Process configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Base URL of the auth/printer-directory service.
    pub base_url: String,
    /// Agent password for `POST {base_url}/auth/login`.
    pub password: String,
    /// AMQP URL. When absent together with `queue_name`, fetched from the
    /// directory service.
    #[serde(default)]
    pub rabbitmq_url: Option<String>,
    #[serde(default)]
    pub queue_name: Option<String>,
    /// Jobs addressed to a printer missing from the directory.
    #[serde(default)]
    pub unknown_printer: DeliveryPolicy,
    /// Deliveries whose body is not a valid job or control message.
    #[serde(default)]
    pub malformed_message: DeliveryPolicy,
    /// AMQP heartbeat, in seconds.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u16,
    #[serde(default)]
    pub reconnect: ReconnectSettings,
    #[serde(default)]
    pub transport: TransportSettings,
    #[serde(default)]
    pub bluetooth: BluetoothSettings,
}

fn default_heartbeat_secs() -> u16 {
    30
}

/// Broker reconnect backoff. The defaults give a fixed 10 s delay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectSettings {
    pub delay_secs: u64,
    pub max_delay_secs: u64,
    pub multiplier: f64,
    pub jitter: bool,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            delay_secs: 10,
            max_delay_secs: 10,
            multiplier: 1.0,
            jitter: false,
        }
    }
}

/// Per-transport I/O limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    pub network_timeout_secs: u64,
    pub usb_timeout_secs: u64,
    pub serial_timeout_secs: u64,
    pub ble_connect_timeout_secs: u64,
    pub ble_scan_secs: u64,
    /// Bytes per GATT write.
    pub ble_chunk_size: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            network_timeout_secs: 10,
            usb_timeout_secs: 10,
            serial_timeout_secs: 10,
            ble_connect_timeout_secs: 15,
            ble_scan_secs: 5,
            ble_chunk_size: 20,
        }
    }
}

impl TransportSettings {
    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_secs)
    }

    pub fn usb_timeout(&self) -> Duration {
        Duration::from_secs(self.usb_timeout_secs)
    }

    pub fn serial_timeout(&self) -> Duration {
        Duration::from_secs(self.serial_timeout_secs)
    }

    pub fn ble_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.ble_connect_timeout_secs)
    }

    pub fn ble_scan(&self) -> Duration {
        Duration::from_secs(self.ble_scan_secs)
    }
}

/// RFCOMM binding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothSettings {
    /// Program and leading arguments used to run `rfcomm`, e.g.
    /// `["sudo", "-n", "rfcomm"]` when the agent is not privileged itself.
    pub rfcomm_command: Vec<String>,
    /// Directory holding the `rfcommN` device nodes.
    pub device_dir: String,
    /// RFCOMM service channel used when a profile does not name one.
    pub default_channel: u8,
}

impl Default for BluetoothSettings {
    fn default() -> Self {
        Self {
            rfcomm_command: vec!["rfcomm".into()],
            device_dir: "/dev".into(),
            default_channel: 1,
        }
    }
}

impl AgentConfig {
    /// Read and validate the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AgentError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            AgentError::Configuration(format!("cannot parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Check required fields and cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(AgentError::Configuration("base_url is empty".into()));
        }
        if self.password.is_empty() {
            return Err(AgentError::Configuration("password is empty".into()));
        }
        if self.bluetooth.rfcomm_command.is_empty() {
            return Err(AgentError::Configuration(
                "bluetooth.rfcomm_command is empty".into(),
            ));
        }
        if self.transport.ble_chunk_size == 0 {
            return Err(AgentError::Configuration(
                "transport.ble_chunk_size must be positive".into(),
            ));
        }
        self.static_broker().map(|_| ())
    }

    /// Broker endpoint from the config file, if configured statically.
    ///
    /// Both `rabbitmq_url` and `queue_name` must be given together; giving
    /// only one is a configuration error.
    pub fn static_broker(&self) -> Result<Option<BrokerEndpoint>> {
        match (&self.rabbitmq_url, &self.queue_name) {
            (Some(url), Some(queue_name)) => Ok(Some(BrokerEndpoint {
                url: url.clone(),
                queue_name: queue_name.clone(),
            })),
            (None, None) => Ok(None),
            _ => Err(AgentError::Configuration(
                "rabbitmq_url and queue_name must be set together".into(),
            )),
        }
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(u64::from(self.heartbeat_secs))
    }
}
