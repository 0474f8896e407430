// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Expired Note Purger
//!
//! Background task that periodically deletes notes older than the
//! configured maximum age. Purging never runs on the request path.
//!
//! ## Strategy
//!
//! Every `interval` (default 1 h) the purger calls
//! [`NoteLifecycle::purge_expired`]. A failed sweep is logged and retried on
//! the next tick; it never stops the loop.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::lifecycle::{NoteLifecycle, DEFAULT_MAX_AGE};

/// Default interval between purge sweeps.
pub const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Background purger for aged-out notes.
pub struct ExpiryPurger {
    lifecycle: NoteLifecycle,
    interval: Duration,
    max_age: Duration,
}

impl ExpiryPurger {
    /// Create a purger with the default interval and age cutoff.
    pub fn new(lifecycle: NoteLifecycle) -> Self {
        Self {
            lifecycle,
            interval: DEFAULT_PURGE_INTERVAL,
            max_age: DEFAULT_MAX_AGE,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Run the purge loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(purger.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            max_age_secs = self.max_age.as_secs(),
            "Expired note purger starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Expired note purger shutting down");
                return;
            }

            self.sweep();

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Expired note purger shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one sweep. Returns the number of notes removed.
    pub fn sweep(&self) -> usize {
        match self.lifecycle.purge_expired(self.max_age) {
            Ok(removed) => removed,
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "Purge sweep failed, will retry");
                0
            }
        }
    }
}
