//! NNTE console
//!
//! Loads the rule builder, then prints the live signal grid every time the
//! poller publishes a new snapshot. Stops cleanly on Ctrl-C.

use std::sync::Arc;

use dotenvy::dotenv;
use nnte::config::{get_environment, ClientConfig};
use nnte::core::{
    DashboardSnapshot, NoticeLevel, PollScheduler, RuleBuilder, SignalFilter, SignalPoller,
};
use nnte::logging;
use nnte::metrics::Metrics;
use nnte::services::RestApiClient;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    if let Err(e) = logging::init_logging() {
        eprintln!("Logging already initialized: {e}");
    }

    let config = ClientConfig::from_env()?;
    info!("Starting NNTE console");
    info!(environment = %get_environment(), "Environment");
    info!(api = %config.base_url, poll_seconds = config.poll_interval.as_secs(), "Backend");

    let metrics = Arc::new(Metrics::new()?);
    let client = Arc::new(RestApiClient::new(&config, metrics.clone())?);

    let builder = RuleBuilder::new(client.clone(), metrics.clone(), Default::default());
    let mut notices = builder.notices().subscribe();
    match builder.load().await {
        Ok(rule_config) => {
            let rules = builder.rules().await;
            info!(
                rules = rules.len(),
                timeframes = rule_config.timeframes().len(),
                "Rules loaded"
            );
            for rule in &rules {
                let id = rule.id.as_ref().map(ToString::to_string).unwrap_or_default();
                println!(
                    "rule {:>6}  {:<24} -> {:<12} conditions={} telegram={}",
                    id,
                    rule.name,
                    rule.signal,
                    rule.conditions.len(),
                    rule.telegram_enabled
                );
            }
        }
        Err(e) => warn!(error = %e, "Rule builder unavailable, showing signals only"),
    }

    let poller = Arc::new(SignalPoller::new(client.clone(), client, metrics.clone()));
    let scheduler = PollScheduler::new(poller.clone(), config.poll_interval)?;
    let mut snapshots = poller.subscribe();
    let filter = SignalFilter::default();

    scheduler.start().await;
    info!("Console started, waiting for shutdown signal...");

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Shutting down console...");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    error!("Snapshot channel closed");
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                render(&snapshot, &filter);
            }
            notice = notices.recv() => {
                if let Ok(notice) = notice {
                    match notice.level {
                        NoticeLevel::Success => info!(message = %notice.message, "Notice"),
                        NoticeLevel::Error => warn!(message = %notice.message, "Notice"),
                    }
                }
            }
        }
    }

    scheduler.stop().await;
    if let Ok(exported) = metrics.export() {
        info!(metrics = %exported, "Final metrics");
    }
    info!("Console stopped");
    Ok(())
}

fn render(snapshot: &DashboardSnapshot, filter: &SignalFilter) {
    if snapshot.is_loading() {
        match &snapshot.last_error {
            Some(message) => println!("Loading signals... (last attempt failed: {message})"),
            None => println!("Loading signals..."),
        }
        return;
    }
    if snapshot.is_refreshing() {
        return;
    }

    let rows = snapshot.filtered(filter);
    let updated = snapshot
        .last_updated
        .map(|at| at.format("%H:%M:%S").to_string())
        .unwrap_or_default();
    println!("--- signals ({} shown, updated {updated}) ---", rows.len());
    for entry in rows {
        println!(
            "{:<12} {:<14} {:<8?} {}",
            entry.symbol,
            entry.signal,
            entry.tone(),
            entry.rule_name.as_deref().unwrap_or("-")
        );
    }
    if let Some(message) = &snapshot.last_error {
        println!("(last refresh failed: {message})");
    }
}
