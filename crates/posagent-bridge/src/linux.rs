// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Linux RFCOMM binding through the BlueZ `rfcomm` tool.
//
// `rfcomm bind <slot> <address> <channel>` creates `/dev/rfcomm<slot>`;
// `rfcomm release <slot>` removes it. Both need CAP_NET_ADMIN, so the command
// prefix is configurable (e.g. `sudo -n rfcomm`).

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use posagent_core::error::{AgentError, Result};
use posagent_core::types::MacAddress;

use crate::traits::RfcommControl;

/// Runs the `rfcomm` tool as a child process.
pub struct RfcommTool {
    /// Program followed by any leading arguments.
    command: Vec<String>,
}

impl RfcommTool {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    async fn run(&self, args: &[String]) -> Result<()> {
        let (program, prefix) = self
            .command
            .split_first()
            .ok_or_else(|| AgentError::Configuration("rfcomm command is empty".into()))?;

        let output = Command::new(program)
            .args(prefix)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AgentError::Bridge(format!("cannot run {program}: {e}")))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(AgentError::Bridge(format!(
                "{program} {} exited with {}: {}",
                args.join(" "),
                output.status,
                stderr.trim()
            )))
        }
    }
}

#[async_trait]
impl RfcommControl for RfcommTool {
    async fn bind(&self, slot: u8, address: MacAddress, channel: u8) -> Result<()> {
        let args = vec![
            "bind".to_string(),
            slot.to_string(),
            address.to_string(),
            channel.to_string(),
        ];
        self.run(&args).await?;
        info!(slot, mac = %address, channel, "rfcomm device bound");
        Ok(())
    }

    async fn release(&self, slot: u8) -> Result<()> {
        self.run(&["release".to_string(), slot.to_string()]).await?;
        debug!(slot, "rfcomm device released");
        Ok(())
    }
}
