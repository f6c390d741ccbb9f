// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// posagent Print — physical printer transports (USB, raw TCP, Bluetooth
// serial, Bluetooth LE), RFCOMM channel binding, and the job router that
// turns queue deliveries into ack/nack decisions.

pub mod ble;
pub mod binder;
pub mod driver;
pub mod network;
pub mod router;
pub mod serial;
pub mod transport;
pub mod usb;

pub use binder::{ChannelBinder, SerialHandle};
pub use driver::{PrinterSink, TransportDriverSet};
pub use router::{InboundMessage, JobRouter, RoutingPolicy};
pub use transport::Transport;
