// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// posagent Broker — AMQP sessions, reconnect backoff, and the connection
// supervisor that keeps the job queue consumed for the life of the process.

pub mod amqp;
pub mod policy;
pub mod session;
pub mod supervisor;

pub use amqp::AmqpConnector;
pub use policy::ReconnectPolicy;
pub use session::{
    BrokerConnector, BrokerSession, InboundDelivery, MessageHandler, Sleeper, TokioSleeper,
};
pub use supervisor::Supervisor;
