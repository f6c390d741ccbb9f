// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer directory cache.
//
// Holds the latest fetched directory as one immutable snapshot behind an
// `Arc`. A refresh builds the complete new map first and then swaps the
// pointer, so a lookup sees either the old map or the new one, never a mix.
// On a failed fetch the previous snapshot stays in place.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use posagent_core::error::Result;
use posagent_core::types::{DirectorySnapshot, PrinterProfile};

/// Anything that can produce the full printer list.
#[async_trait]
pub trait PrinterSource: Send + Sync {
    async fn fetch_printers(&self) -> Result<Vec<PrinterProfile>>;
}

/// In-memory printer directory keyed by printer name.
pub struct DirectoryCache {
    source: Arc<dyn PrinterSource>,
    /// Current snapshot. The lock is held only to clone or replace the `Arc`.
    snapshot: RwLock<Arc<DirectorySnapshot>>,
    /// One refresh at a time.
    refresh_gate: tokio::sync::Mutex<()>,
}

impl DirectoryCache {
    /// Create an empty cache over `source`. Nothing is fetched until
    /// [`refresh`](Self::refresh) is called.
    pub fn new(source: Arc<dyn PrinterSource>) -> Self {
        Self {
            source,
            snapshot: RwLock::new(Arc::new(DirectorySnapshot::new())),
            refresh_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Refetch the whole directory and replace the cache on success.
    ///
    /// Returns the new snapshot. On error the previous snapshot is kept.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Arc<DirectorySnapshot>> {
        let _gate = self.refresh_gate.lock().await;

        let profiles = match self.source.fetch_printers().await {
            Ok(profiles) => profiles,
            Err(e) => {
                warn!(error = %e, "directory refresh failed; keeping previous snapshot");
                return Err(e);
            }
        };

        let mut fresh = DirectorySnapshot::with_capacity(profiles.len());
        for profile in profiles {
            if let Some(previous) = fresh.insert(profile.name.clone(), profile) {
                warn!(printer = %previous.name, "duplicate printer name in directory; last entry wins");
            }
        }

        let fresh = Arc::new(fresh);
        *self.snapshot.write().unwrap_or_else(|e| e.into_inner()) = Arc::clone(&fresh);

        let mut names: Vec<&str> = fresh.keys().map(String::as_str).collect();
        names.sort_unstable();
        info!(count = fresh.len(), printers = ?names, "printer directory refreshed");
        Ok(fresh)
    }

    /// Profile for `printer_id` in the current snapshot.
    pub fn lookup(&self, printer_id: &str) -> Option<PrinterProfile> {
        self.snapshot().get(printer_id).cloned()
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<DirectorySnapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(|e| e.into_inner()))
    }
}
