// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Connection supervisor.
//
// Owns the broker connection for the life of the process: connect, consume,
// and on any connection-level failure tear the session down, back off, and
// start over. There is no attempt limit. Deliveries that were in flight when
// a connection dropped are redelivered by the broker; nothing is buffered
// here.

use std::sync::Arc;

use tracing::{error, info, warn};

use posagent_core::error::{AgentError, Result};
use posagent_core::hints::operator_hint;
use posagent_core::types::BrokerEndpoint;

use crate::policy::ReconnectPolicy;
use crate::session::{BrokerConnector, BrokerSession, MessageHandler, Sleeper};

pub struct Supervisor {
    connector: Arc<dyn BrokerConnector>,
    policy: ReconnectPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl Supervisor {
    pub fn new(
        connector: Arc<dyn BrokerConnector>,
        policy: ReconnectPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            connector,
            policy,
            sleeper,
        }
    }

    /// Consume `endpoint` forever, settling every delivery with `handler`.
    pub async fn run(&self, endpoint: &BrokerEndpoint, handler: &dyn MessageHandler) {
        let mut attempt: u32 = 0;
        loop {
            info!(queue = %endpoint.queue_name, attempt, "connecting to broker");
            match self.connector.connect(endpoint).await {
                Ok(mut session) => {
                    attempt = 0;
                    info!(queue = %endpoint.queue_name, "connected; listening for print jobs");
                    let err = consume(session.as_mut(), handler).await;
                    session.close().await;
                    warn!(error = %err, "broker session ended");
                }
                Err(e) => {
                    if matches!(e, AgentError::Configuration(_)) {
                        error!(error = %e, check = %operator_hint(&e).check, "broker endpoint rejected");
                    } else {
                        warn!(error = %e, "broker connection failed");
                    }
                }
            }

            let delay = self.policy.delay_for_attempt(attempt);
            warn!(attempt, delay_ms = delay.as_millis() as u64, "backing off before reconnect");
            self.sleeper.sleep(delay).await;
            attempt = attempt.saturating_add(1);
        }
    }
}

/// Handle deliveries until the session fails. Always returns the reason.
async fn consume(session: &mut dyn BrokerSession, handler: &dyn MessageHandler) -> AgentError {
    loop {
        match next_settled(session, handler).await {
            Ok(true) => {}
            Ok(false) => return AgentError::Connection("consumer cancelled by broker".into()),
            Err(e) => return e,
        }
    }
}

/// Take, handle, and settle one delivery. `Ok(false)` when the stream ended.
async fn next_settled(session: &mut dyn BrokerSession, handler: &dyn MessageHandler) -> Result<bool> {
    let Some(delivery) = session.next_delivery().await? else {
        return Ok(false);
    };
    let outcome = handler.handle(&delivery.body).await;
    session.settle(delivery.delivery_tag, outcome).await?;
    Ok(true)
}
