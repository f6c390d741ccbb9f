// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw TCP receipt printer driver (JetDirect, port 9100).
//
// Open a TCP socket, write the receipt bytes, shut the socket down. Both the
// connect and the write phase are bounded by the caller's timeout, so an
// unreachable printer fails the job instead of stalling the consume loop.

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, instrument};

use posagent_core::error::{AgentError, Result};
use posagent_core::types::TransportKind;

const KIND: TransportKind = TransportKind::Network;

/// Write `segments` in order to `host:port`.
#[instrument(skip(segments), fields(total = segments.iter().map(|s| s.len()).sum::<usize>()))]
pub async fn send_raw(host: &str, port: u16, segments: &[&[u8]], timeout: Duration) -> Result<()> {
    let addr = format!("{host}:{port}");
    debug!(addr = %addr, "connecting via raw TCP");

    let mut stream = tokio::time::timeout(timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| {
            AgentError::open(
                KIND,
                format!("connection to {addr} timed out after {}ms", timeout.as_millis()),
            )
        })?
        .map_err(|e| AgentError::open(KIND, format!("connect to {addr}: {e}")))?;

    tokio::time::timeout(timeout, write_segments(&mut stream, segments))
        .await
        .map_err(|_| {
            AgentError::write(
                KIND,
                format!("write to {addr} timed out after {}ms", timeout.as_millis()),
            )
        })??;

    info!(addr = %addr, "raw TCP receipt sent");
    Ok(())
}

async fn write_segments(stream: &mut TcpStream, segments: &[&[u8]]) -> Result<()> {
    let mut sent = 0usize;
    for segment in segments {
        stream.write_all(segment).await.map_err(|e| {
            AgentError::write(KIND, format!("send failed at byte {sent}: {e}"))
        })?;
        sent += segment.len();
    }

    stream
        .flush()
        .await
        .map_err(|e| AgentError::write(KIND, format!("flush: {e}")))?;
    stream
        .shutdown()
        .await
        .map_err(|e| AgentError::write(KIND, format!("shutdown: {e}")))?;
    Ok(())
}
