// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Delivery fingerprints: SHA-256 of message bodies, so broker redeliveries
// of the same payload can be matched up in field logs.

use sha2::{Digest, Sha256};

/// Length of the digest prefix written to logs.
const SHORT_LEN: usize = 12;

/// SHA-256 of `data` as a lowercase hex string.
pub fn payload_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// First 12 hex characters of [`payload_digest`].
pub fn short_digest(data: &[u8]) -> String {
    let mut full = payload_digest(data);
    full.truncate(SHORT_LEN);
    full
}
