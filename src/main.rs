// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;

use relational_sealed_notes::{config::Config, logging, purger::ExpiryPurger, state::AppState};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            logging::init(logging::LogFormat::Pretty);
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    logging::init(config.log_format);

    let state = match AppState::open(&config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(
                path = %config.db_path().display(),
                error = %e,
                "Failed to open note storage"
            );
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    let purger = ExpiryPurger::new(state.notes.clone())
        .with_interval(config.purge_interval)
        .with_max_age(config.note_max_age);
    let purger_handle = tokio::spawn(purger.run(shutdown.clone()));

    tracing::info!(
        path = %state.storage.path().display(),
        "Sealed notes service running, press Ctrl+C to stop"
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }

    tracing::info!("Shutting down");
    shutdown.cancel();
    if let Err(e) = purger_handle.await {
        tracing::warn!(error = %e, "Purger task ended abnormally");
    }

    // Release every handle so the database file is closed before exit.
    drop(state);
    tracing::info!("Note storage closed");

    ExitCode::SUCCESS
}
