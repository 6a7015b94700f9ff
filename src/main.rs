//! AeroGuard Core entrypoint.
//!
//! Reads detection records as JSON lines on stdin, classifies each one,
//! and dispatches response actions to the backend. Exits once stdin
//! closes and all in-flight requests have settled.

use std::process;
use std::sync::Arc;
use std::time::Duration;

use env_logger::Env;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::sleep;

use aeroguard_core::logic::config::EngineConfig;
use aeroguard_core::logic::dispatch::DispatchCoordinator;
use aeroguard_core::logic::ledger::ResponseLedger;
use aeroguard_core::logic::threat::{classify, Detection};
use aeroguard_core::logic::toggles::SystemToggles;
use aeroguard_core::logic::transport::HttpAlertTransport;

/// How long to wait for in-flight requests after stdin closes.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    log::info!(
        "AeroGuard Core v{} starting up...",
        env!("CARGO_PKG_VERSION")
    );

    let config = EngineConfig::from_env();
    if let Err(e) = config.validate() {
        log::error!("Invalid configuration: {}", e);
        process::exit(1);
    }
    log::info!(
        "Backend: {} | thresholds low/medium/high: {}/{}/{}",
        config.transport.base_url,
        config.thresholds.low,
        config.thresholds.medium,
        config.thresholds.high
    );

    let transport = match HttpAlertTransport::new(&config.transport) {
        Ok(t) => Arc::new(t),
        Err(e) => {
            log::error!("Failed to build transport: {}", e);
            process::exit(1);
        }
    };

    // Non-fatal health probe; the backend may come up after we do.
    match transport.status().await {
        Ok(status) => log::info!("Backend status: {}", status),
        Err(e) => log::warn!("Backend status probe failed: {}", e),
    }

    let ledger = Arc::new(ResponseLedger::new());
    let toggles = Arc::new(SystemToggles::new());
    let coordinator = Arc::new(DispatchCoordinator::new(
        transport,
        Arc::clone(&ledger),
        Arc::clone(&toggles),
        config.retry,
        config.jammer_window,
    ));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut seen = 0u64;
    let mut dispatched = 0u64;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                log::error!("stdin read failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        seen += 1;

        let detection: Detection = match serde_json::from_str(&line) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("Skipping malformed detection record: {}", e);
                continue;
            }
        };

        let assessment = match classify(&detection, &config.thresholds) {
            Ok(a) => a,
            Err(e) => {
                log::warn!("Rejected detection {}: {}", detection.id, e);
                continue;
            }
        };
        log::info!(
            "Detection {} ({}, confidence {:.2}) classified {}",
            detection.id,
            detection.class_name,
            detection.confidence,
            assessment.level
        );

        let requests = coordinator.dispatch(&detection, &assessment);
        dispatched += requests.len() as u64;
    }

    // Stdin closed. Give background sends a chance to settle.
    let drain_started = tokio::time::Instant::now();
    while ledger.pending_count() > 0 {
        if drain_started.elapsed() > DRAIN_TIMEOUT {
            log::warn!(
                "Drain timeout: {} request(s) still in flight",
                ledger.pending_count()
            );
            break;
        }
        sleep(Duration::from_millis(200)).await;
    }

    log::info!(
        "Shutting down: {} detection(s) processed, {} request(s) dispatched, {} ledger entries",
        seen,
        dispatched,
        ledger.len()
    );
}
