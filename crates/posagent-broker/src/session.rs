// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Seams between the supervisor and the outside world: the broker, the clock,
// and whoever decides what a delivery means.

use std::time::Duration;

use async_trait::async_trait;

use posagent_core::error::Result;
use posagent_core::types::{BrokerEndpoint, DispatchOutcome};

/// One delivery taken off the queue, not yet settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundDelivery {
    pub delivery_tag: u64,
    pub body: Vec<u8>,
}

/// Opens consuming sessions against a broker.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    /// Connect, declare the durable queue, and start consuming from it.
    async fn connect(&self, endpoint: &BrokerEndpoint) -> Result<Box<dyn BrokerSession>>;
}

/// A live connection with a consumer on the job queue.
#[async_trait]
pub trait BrokerSession: Send {
    /// Next delivery. `Ok(None)` means the broker closed the consumer.
    async fn next_delivery(&mut self) -> Result<Option<InboundDelivery>>;

    /// Ack or nack the delivery identified by `delivery_tag`.
    async fn settle(&mut self, delivery_tag: u64, outcome: DispatchOutcome) -> Result<()>;

    /// Tear the connection down. Errors are ignored; the session is being
    /// abandoned anyway.
    async fn close(&mut self) {}
}

/// Decides how each delivery body is settled.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, body: &[u8]) -> DispatchOutcome;
}

/// Waits between reconnect attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
