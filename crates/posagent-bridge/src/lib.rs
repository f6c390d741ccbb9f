// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// posagent — operating-system bridges.
//
// Bluetooth serial printers are reached through RFCOMM device nodes that the
// OS creates on request. Binding a node is a privileged operation performed by
// an external tool; this crate wraps it behind `RfcommControl` so the binder
// can be exercised without Bluetooth hardware.

use std::sync::Arc;

use posagent_core::config::BluetoothSettings;

pub mod traits;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(not(target_os = "linux"))]
pub mod stub;

pub use traits::RfcommControl;

/// The RFCOMM binding implementation for the target operating system.
pub fn platform_rfcomm(settings: &BluetoothSettings) -> Arc<dyn RfcommControl> {
    #[cfg(target_os = "linux")]
    {
        Arc::new(linux::RfcommTool::new(settings.rfcomm_command.clone()))
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = settings;
        Arc::new(stub::StubRfcomm)
    }
}
