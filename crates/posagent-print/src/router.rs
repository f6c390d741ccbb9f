// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job router.
//
// Turns one raw queue delivery into a settlement decision. Control messages
// refresh the directory and rebind Bluetooth serial printers; print jobs are
// resolved against the directory and handed to the printer sink. Every error
// raised while handling a delivery ends here as an ack or a nack.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument, warn};

use posagent_core::config::AgentConfig;
use posagent_core::digest::short_digest;
use posagent_core::error::{AgentError, Result};
use posagent_core::hints::operator_hint;
use posagent_core::types::{
    ControlAction, ControlMessage, DeliveryPolicy, DispatchOutcome, PrintJob,
};
use posagent_directory::DirectoryCache;

use crate::binder::ChannelBinder;
use crate::driver::PrinterSink;

/// A classified delivery body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    Control(ControlMessage),
    Job(PrintJob),
}

impl InboundMessage {
    /// Classify a delivery body.
    ///
    /// `{"type": "printer", "action": "create"|"update"|"delete"}` is a
    /// control message. Anything else must be a print job
    /// (`{"printer_id", "lines"}`); a body that is neither is malformed.
    pub fn classify(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| AgentError::MalformedMessage(format!("not JSON: {e}")))?;

        let control = value
            .get("type")
            .and_then(Value::as_str)
            .filter(|t| *t == "printer")
            .and_then(|_| value.get("action").and_then(Value::as_str))
            .and_then(ControlAction::parse);
        if let Some(action) = control {
            return Ok(Self::Control(ControlMessage { action }));
        }

        serde_json::from_value(value)
            .map(Self::Job)
            .map_err(|e| AgentError::MalformedMessage(format!("not a print job: {e}")))
    }
}

/// What to do with deliveries that cannot be printed as addressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoutingPolicy {
    pub unknown_printer: DeliveryPolicy,
    pub malformed_message: DeliveryPolicy,
}

impl From<&AgentConfig> for RoutingPolicy {
    fn from(config: &AgentConfig) -> Self {
        Self {
            unknown_printer: config.unknown_printer,
            malformed_message: config.malformed_message,
        }
    }
}

pub struct JobRouter {
    directory: Arc<DirectoryCache>,
    binder: Arc<ChannelBinder>,
    sink: Arc<dyn PrinterSink>,
    policy: RoutingPolicy,
}

impl JobRouter {
    pub fn new(
        directory: Arc<DirectoryCache>,
        binder: Arc<ChannelBinder>,
        sink: Arc<dyn PrinterSink>,
        policy: RoutingPolicy,
    ) -> Self {
        Self {
            directory,
            binder,
            sink,
            policy,
        }
    }

    /// Handle one delivery body and decide how to settle it.
    #[instrument(skip_all, fields(digest = %short_digest(body), bytes = body.len()))]
    pub async fn route(&self, body: &[u8]) -> DispatchOutcome {
        let message = match InboundMessage::classify(body) {
            Ok(message) => message,
            Err(e) => {
                let outcome = self.policy.malformed_message.outcome();
                warn!(error = %e, ?outcome, "rejecting malformed delivery");
                return outcome;
            }
        };

        match message {
            InboundMessage::Control(control) => {
                info!(action = ?control.action, "directory change announced");
                self.reload().await;
                // Acked even when the refresh failed.
                DispatchOutcome::Ack
            }
            InboundMessage::Job(job) => self.print(job).await,
        }
    }

    async fn print(&self, job: PrintJob) -> DispatchOutcome {
        let Some(profile) = self.directory.lookup(&job.printer_id) else {
            let outcome = self.policy.unknown_printer.outcome();
            warn!(printer = %job.printer_id, ?outcome, "printer not in directory");
            return outcome;
        };

        let text = job.receipt_text();
        match self.sink.send(&profile, text.as_bytes()).await {
            Ok(()) => {
                info!(printer = %job.printer_id, lines = job.lines.len(), "job printed");
                DispatchOutcome::Ack
            }
            Err(e) => {
                let hint = operator_hint(&e);
                warn!(
                    printer = %job.printer_id,
                    error = %e,
                    check = %hint.check,
                    recovery = ?hint.recovery,
                    "print failed; requeueing"
                );
                DispatchOutcome::REQUEUE
            }
        }
    }

    /// Refetch the directory, then rebuild Bluetooth bindings.
    ///
    /// When the fetch fails the bindings are rebuilt from the snapshot still
    /// in the cache.
    pub async fn reload(&self) {
        let snapshot = match self.directory.refresh().await {
            Ok(snapshot) => snapshot,
            Err(_) => self.directory.snapshot(),
        };
        self.binder.rebind(&snapshot).await;
    }
}
