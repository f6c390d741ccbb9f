// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// AMQP 0-9-1 broker sessions on top of `lapin`.
//
// Each connect builds everything from scratch: connection (with heartbeat),
// channel, prefetch of one, durable queue declaration, consumer. Nothing from
// a previous session is reused.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::uri::AMQPUri;
use lapin::{Channel, Connection, ConnectionProperties, Consumer};
use tracing::{debug, instrument};

use posagent_core::error::{AgentError, Result};
use posagent_core::types::{BrokerEndpoint, DispatchOutcome};

use crate::session::{BrokerConnector, BrokerSession, InboundDelivery};

/// Consumer tag announced to the broker.
pub const CONSUMER_TAG: &str = "posagent";

/// Opens `lapin` sessions.
pub struct AmqpConnector {
    heartbeat: Duration,
}

impl AmqpConnector {
    pub fn new(heartbeat: Duration) -> Self {
        Self { heartbeat }
    }

    /// Reject an endpoint whose URL is not a usable AMQP URI.
    pub fn check(&self, endpoint: &BrokerEndpoint) -> Result<()> {
        self.uri(&endpoint.url).map(|_| ())
    }

    fn uri(&self, url: &str) -> Result<AMQPUri> {
        let mut uri: AMQPUri = url
            .parse()
            .map_err(|e: String| AgentError::Configuration(format!("invalid AMQP URL: {e}")))?;
        let secs = u16::try_from(self.heartbeat.as_secs()).unwrap_or(u16::MAX);
        uri.query.heartbeat = Some(secs);
        Ok(uri)
    }
}

#[async_trait]
impl BrokerConnector for AmqpConnector {
    #[instrument(skip_all, fields(queue = %endpoint.queue_name))]
    async fn connect(&self, endpoint: &BrokerEndpoint) -> Result<Box<dyn BrokerSession>> {
        let uri = self.uri(&endpoint.url)?;
        let connection = Connection::connect_uri(uri, ConnectionProperties::default())
            .await
            .map_err(connection_err("connect"))?;
        let channel = connection
            .create_channel()
            .await
            .map_err(connection_err("open channel"))?;

        channel
            .basic_qos(1, BasicQosOptions::default())
            .await
            .map_err(connection_err("set prefetch"))?;
        channel
            .queue_declare(
                &endpoint.queue_name,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(connection_err("declare queue"))?;
        debug!("durable queue declared");

        let consumer = channel
            .basic_consume(
                &endpoint.queue_name,
                CONSUMER_TAG,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(connection_err("start consumer"))?;

        Ok(Box::new(AmqpSession {
            connection,
            channel,
            consumer,
        }))
    }
}

struct AmqpSession {
    connection: Connection,
    channel: Channel,
    consumer: Consumer,
}

#[async_trait]
impl BrokerSession for AmqpSession {
    async fn next_delivery(&mut self) -> Result<Option<InboundDelivery>> {
        match self.consumer.next().await {
            Some(Ok(delivery)) => Ok(Some(InboundDelivery {
                delivery_tag: delivery.delivery_tag,
                body: delivery.data,
            })),
            Some(Err(e)) => Err(AgentError::Connection(format!("consume: {e}"))),
            None => Ok(None),
        }
    }

    async fn settle(&mut self, delivery_tag: u64, outcome: DispatchOutcome) -> Result<()> {
        match outcome {
            DispatchOutcome::Ack => self
                .channel
                .basic_ack(delivery_tag, BasicAckOptions::default())
                .await
                .map_err(connection_err("ack")),
            DispatchOutcome::Nack { requeue } => self
                .channel
                .basic_nack(
                    delivery_tag,
                    BasicNackOptions {
                        multiple: false,
                        requeue,
                    },
                )
                .await
                .map_err(connection_err("nack")),
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.connection.close(200, "reconnecting").await {
            debug!(error = %e, "closing broker connection failed");
        }
    }
}

fn connection_err(step: &'static str) -> impl Fn(lapin::Error) -> AgentError {
    move |e| AgentError::Connection(format!("{step}: {e}"))
}
