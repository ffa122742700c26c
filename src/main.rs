//! Netwatch - Network anomaly monitor (entry point)

mod logic;
pub mod constants;

use std::fs::File;
use std::io::{self, BufReader};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use logic::analysis_loop::{AnalysisLoop, Clock, EventClock, ExitReason, SystemClock};
use logic::collector;
use logic::config::{BlockMode, MonitorConfig};
use logic::incident::SqliteAlertStore;
use logic::model::{BootstrapOptions, ScoringEngine};
use logic::response::{BlockExecutor, DryRunExecutor, FirewallExecutor};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    std::panic::set_hook(Box::new(|info| {
        log::error!("FATAL: {}", info);
    }));

    log::info!("Starting {} v{}", constants::APP_NAME, constants::APP_VERSION);

    if let Err(e) = run() {
        log::error!("{}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config = MonitorConfig::from_env().map_err(|e| format!("Invalid configuration: {}", e))?;

    let engine = ScoringEngine::bootstrap(&BootstrapOptions::at(config.model_path.clone()))
        .map_err(|e| format!("Model bootstrap failed: {}", e))?;
    log::info!("Scorer ready: {} ({:?})", engine.scorer_name(), engine.outcome());

    let store = SqliteAlertStore::open(&config.alert_db_path);
    if let Err(e) = store.ensure_ready() {
        // Retried on the first alert
        log::warn!("Alert store {:?} not ready: {}", config.alert_db_path, e);
    }

    let executor: Option<Box<dyn BlockExecutor>> = match config.block_mode {
        BlockMode::Firewall => Some(Box::new(FirewallExecutor::new())),
        BlockMode::DryRun => Some(Box::new(DryRunExecutor)),
        BlockMode::Off => None,
    };
    log::info!("Block mode: {}", config.block_mode.as_str());

    let (tx, rx) = if config.queue_capacity > 0 {
        crossbeam_channel::bounded(config.queue_capacity)
    } else {
        crossbeam_channel::unbounded()
    };

    let reader = match &config.event_source {
        Some(path) => {
            let file = File::open(path).map_err(|e| format!("Cannot open {:?}: {}", path, e))?;
            log::info!("Reading events from {:?}", path);
            collector::spawn_reader(BufReader::new(file), tx)
        }
        None => {
            log::info!("Reading events from stdin");
            collector::spawn_reader(BufReader::new(io::stdin()), tx)
        }
    }
    .map_err(|e| format!("Failed to start collector: {}", e))?;

    // Recorded feeds run on their own timestamps
    let clock: Box<dyn Clock> = if config.event_source.is_some() {
        Box::new(EventClock::new())
    } else {
        Box::new(SystemClock)
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        log::info!("Interrupt received, shutting down...");
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| format!("Failed to register interrupt handler: {}", e))?;

    let mut controller = AnalysisLoop::new(
        config,
        engine,
        Box::new(store),
        executor,
        clock,
    );

    let reason = controller.run(&rx, &shutdown);

    if reason == ExitReason::SourceExhausted {
        match reader.join() {
            Ok(stats) => log::info!("Collector: {:?}", stats),
            Err(_) => log::error!("Collector thread panicked"),
        }
    }

    print_summary(&controller);
    Ok(())
}

const RECENT_ALERTS: usize = 5;

fn print_summary(controller: &AnalysisLoop) {
    let stats = controller.stats();
    log::info!(
        "Session: {} events ({} rejected), {} flows scored, {} alerts, {} suppressed",
        stats.events_ingested,
        stats.events_rejected,
        stats.flows_scored,
        stats.alerts_raised,
        stats.alerts_suppressed
    );
    if stats.scoring_failures + stats.persistence_failures + stats.action_failures > 0 {
        log::warn!(
            "Failures: scoring={} persistence={} action={}",
            stats.scoring_failures, stats.persistence_failures, stats.action_failures
        );
    }
    if let Some(executor) = controller.executor() {
        for (address, at) in executor.blocked() {
            log::info!("Blocked {} at {}", address, at);
        }
    }
    match controller.store().count() {
        Ok(total) => log::info!("Alert store holds {} alerts", total),
        Err(e) => log::warn!("Alert store unreadable: {}", e),
    }
    if let Ok(recent) = controller.store().recent(RECENT_ALERTS) {
        for alert in recent {
            log::info!("Recent alert {}", alert.summary());
        }
    }
    if !controller.aggregator().is_empty() {
        log::info!("{} live flows discarded at exit", controller.aggregator().len());
    }
}
