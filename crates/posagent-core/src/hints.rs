// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Operator hints for field diagnosis.
//
// Every error is mapped to a one-line summary and the first thing a technician
// at the till should check. Hints are attached to fatal startup messages and
// per-job failure logs.

use crate::error::AgentError;
use crate::types::TransportKind;

/// Whether the condition clears up on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// The agent retries (reconnect loop or broker redelivery).
    Automatic,
    /// Someone has to fix configuration, cabling, or the printer itself.
    Operator,
}

/// Operator-facing explanation of an error.
#[derive(Debug, Clone)]
pub struct OperatorHint {
    pub summary: String,
    pub check: String,
    pub recovery: Recovery,
}

impl OperatorHint {
    fn new(summary: impl Into<String>, check: impl Into<String>, recovery: Recovery) -> Self {
        Self {
            summary: summary.into(),
            check: check.into(),
            recovery,
        }
    }
}

/// Map an `AgentError` to what the operator should look at.
pub fn operator_hint(err: &AgentError) -> OperatorHint {
    match err {
        AgentError::Authentication(_) => OperatorHint::new(
            "The agent could not log in to the printer directory.",
            "Check `password` and `base_url` in config.json.",
            Recovery::Operator,
        ),
        AgentError::Configuration(detail) => OperatorHint::new(
            "The configuration is incomplete or invalid.",
            format!("Fix config.json or the printer entry in the directory ({detail})."),
            Recovery::Operator,
        ),
        AgentError::DirectoryFetch(_) => OperatorHint::new(
            "The printer list could not be refreshed; the previous list is still in use.",
            "Check that the directory service is reachable from this machine.",
            Recovery::Automatic,
        ),
        AgentError::Connection(_) => OperatorHint::new(
            "The message broker is unreachable.",
            "Check network access to the broker; the agent keeps reconnecting.",
            Recovery::Automatic,
        ),
        AgentError::MalformedMessage(_) => OperatorHint::new(
            "A queued message is not a valid print job.",
            "Check the sender of the print job; the payload does not parse.",
            Recovery::Operator,
        ),
        AgentError::TransportOpen { transport, .. } => open_hint(*transport),
        AgentError::TransportWrite { .. } => OperatorHint::new(
            "The printer connection dropped while printing.",
            "Check power and paper; the job will be redelivered.",
            Recovery::Automatic,
        ),
        AgentError::UnboundDevice(mac) => OperatorHint::new(
            format!("Bluetooth printer {mac} has no serial binding."),
            "Check that the printer is paired; bindings are recreated on the next directory change or restart.",
            Recovery::Operator,
        ),
        AgentError::Bridge(_) => OperatorHint::new(
            "An operating-system call failed.",
            "Check that `rfcomm` is installed and the agent may run it.",
            Recovery::Operator,
        ),
        AgentError::PlatformUnavailable => OperatorHint::new(
            "This transport is not supported on this operating system.",
            "Use a network or USB printer on this machine.",
            Recovery::Operator,
        ),
    }
}

fn open_hint(transport: TransportKind) -> OperatorHint {
    match transport {
        TransportKind::Usb => OperatorHint::new(
            "The USB printer is absent or busy.",
            "Check the USB cable and that no other program holds the printer.",
            Recovery::Automatic,
        ),
        TransportKind::Network => OperatorHint::new(
            "The network printer did not accept a connection.",
            "Check the printer's IP address and that it is switched on.",
            Recovery::Automatic,
        ),
        TransportKind::BluetoothSerial => OperatorHint::new(
            "The Bluetooth serial port could not be opened.",
            "Check that the printer is on and within range.",
            Recovery::Automatic,
        ),
        TransportKind::BluetoothBle => OperatorHint::new(
            "The Bluetooth LE printer could not be reached.",
            "Check that the printer is on, in range, and not connected to a phone.",
            Recovery::Automatic,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MacAddress;

    #[test]
    fn authentication_needs_operator() {
        let hint = operator_hint(&AgentError::Authentication("401".into()));
        assert_eq!(hint.recovery, Recovery::Operator);
        assert!(hint.check.contains("password"));
    }

    #[test]
    fn network_open_failure_recovers_automatically() {
        let hint = operator_hint(&AgentError::open(TransportKind::Network, "refused"));
        assert_eq!(hint.recovery, Recovery::Automatic);
        assert!(hint.summary.contains("network printer"));
    }

    #[test]
    fn unbound_device_names_the_address() {
        let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().expect("mac");
        let hint = operator_hint(&AgentError::UnboundDevice(mac));
        assert!(hint.summary.contains("AA:BB:CC:DD:EE:FF"));
    }

    #[test]
    fn malformed_message_points_at_the_sender() {
        let hint = operator_hint(&AgentError::MalformedMessage("not json".into()));
        assert_eq!(hint.recovery, Recovery::Operator);
        assert!(hint.check.contains("sender"));
    }
}
