// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Dispatch loop glue: every delivery the supervisor receives goes through the
// job router.

use std::sync::Arc;

use async_trait::async_trait;

use posagent_broker::MessageHandler;
use posagent_core::types::DispatchOutcome;
use posagent_print::JobRouter;

pub struct RouterHandler(pub Arc<JobRouter>);

#[async_trait]
impl MessageHandler for RouterHandler {
    async fn handle(&self, body: &[u8]) -> DispatchOutcome {
        self.0.route(body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use posagent_bridge::RfcommControl;
    use posagent_core::config::{BluetoothSettings, TransportSettings};
    use posagent_core::error::{AgentError, Result};
    use posagent_core::types::{MacAddress, PrinterProfile};
    use posagent_directory::{DirectoryCache, PrinterSource};
    use posagent_print::{ChannelBinder, RoutingPolicy, TransportDriverSet};

    struct NoPrinters;

    #[async_trait]
    impl PrinterSource for NoPrinters {
        async fn fetch_printers(&self) -> Result<Vec<PrinterProfile>> {
            Ok(Vec::new())
        }
    }

    struct NoRfcomm;

    #[async_trait]
    impl RfcommControl for NoRfcomm {
        async fn bind(&self, _slot: u8, _address: MacAddress, _channel: u8) -> Result<()> {
            Err(AgentError::PlatformUnavailable)
        }

        async fn release(&self, _slot: u8) -> Result<()> {
            Ok(())
        }
    }

    fn handler(policy: RoutingPolicy) -> RouterHandler {
        let directory = Arc::new(DirectoryCache::new(Arc::new(NoPrinters)));
        let binder = Arc::new(ChannelBinder::new(
            Arc::new(NoRfcomm),
            &BluetoothSettings::default(),
        ));
        let drivers = Arc::new(TransportDriverSet::new(
            Arc::clone(&binder),
            TransportSettings::default(),
        ));
        RouterHandler(Arc::new(JobRouter::new(directory, binder, drivers, policy)))
    }

    #[tokio::test]
    async fn control_messages_are_acked() {
        let handler = handler(RoutingPolicy::default());
        assert_eq!(
            handler.handle(br#"{"type":"printer","action":"update"}"#).await,
            DispatchOutcome::Ack
        );
    }

    #[tokio::test]
    async fn unknown_printer_follows_policy() {
        let body = br#"{"printer_id":"nowhere","lines":["x"]}"#;
        assert_eq!(
            handler(RoutingPolicy::default()).handle(body).await,
            DispatchOutcome::REQUEUE
        );
    }
}
