//! Tickbus CLI entry point

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::time::Instant;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use tickbus::cli::{Cli, Command, OutputFormat};
use tickbus::config::Config;
use tickbus::events::DispatchFailure;
use tickbus::runtime::Runtime;
use tickbus::ticker::{Period, StopReason, TickEvent, TickerStoppedEvent};

fn setup_logging(level: Option<&str>) -> Result<()> {
    let level = match level.map(|s| s.to_uppercase()).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") => tracing::Level::INFO,
        Some("ERROR") => tracing::Level::ERROR,
        Some("WARN") | Some("WARNING") | None => tracing::Level::WARN,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to WARN", other);
            tracing::Level::WARN
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to install tracing subscriber: {}", e))?;

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate()?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run {
            ticks,
            every_ms,
            format,
        } => cmd_run(&config, ticks, every_ms, format),
        Command::Config => cmd_config(&config),
    }
}

/// What one `run` did
#[derive(Debug, Serialize)]
struct RunSummary {
    tick_rate_hz: u32,
    period_ms: u64,
    ticks: u64,
    last_tick: i64,
    reason: StopReason,
    task_period_ms: u64,
    task_firings: u64,
    listener_failures: u64,
    elapsed_ms: u128,
}

fn cmd_run(config: &Config, ticks: u64, every_ms: u64, format: OutputFormat) -> Result<()> {
    debug!(ticks, every_ms, %format, "cmd_run: called");
    let failures = Arc::new(AtomicU64::new(0));
    let runtime = {
        let failures = Arc::clone(&failures);
        Runtime::with_sink(config, move |failure: &DispatchFailure| {
            failures.fetch_add(1, Ordering::Relaxed);
            tracing::error!(listener = %failure.listener, error = %failure.error, "Listener failed");
        })
    };

    let seen = Arc::new(AtomicU64::new(0));
    let last = i64::try_from(ticks - 1).context("Tick count too large")?;
    {
        let seen = Arc::clone(&seen);
        runtime.dispatcher().register(move |e: &mut TickEvent| {
            seen.fetch_add(1, Ordering::Relaxed);
            if e.tick() >= last {
                e.veto();
            }
        });
    }

    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    runtime.dispatcher().register(move |e: &mut TickerStoppedEvent| {
        let _ = tx.lock().send((e.last_tick(), e.reason()));
    });

    let firings = Arc::new(AtomicU64::new(0));
    {
        let firings = Arc::clone(&firings);
        runtime
            .ticker()
            .schedule(Period::millis(every_ms), move |_| {
                firings.fetch_add(1, Ordering::Relaxed);
            })
            .context("Failed to schedule sample task")?;
    }

    let started = Instant::now();
    runtime.ticker().start().context("Failed to start ticker")?;
    let (last_tick, reason) = rx.recv().context("Ticker exited without reporting")?;
    let elapsed = started.elapsed();
    runtime.shutdown();

    let summary = RunSummary {
        tick_rate_hz: config.ticker.tick_rate_hz,
        period_ms: config.ticker.period_ms(),
        ticks: seen.load(Ordering::Relaxed),
        last_tick,
        reason,
        task_period_ms: every_ms,
        task_firings: firings.load(Ordering::Relaxed),
        listener_failures: failures.load(Ordering::Relaxed),
        elapsed_ms: elapsed.as_millis(),
    };
    print_summary(&summary, format)
}

fn print_summary(summary: &RunSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
        OutputFormat::Text => {
            println!("{} ({})", "Ticker stopped".green().bold(), summary.reason.to_string().yellow());
            println!("  Rate:       {} Hz ({} ms period)", summary.tick_rate_hz, summary.period_ms);
            println!("  Ticks:      {} (last tick {})", summary.ticks, summary.last_tick);
            println!(
                "  Task:       fired {} times (every {} ms)",
                summary.task_firings, summary.task_period_ms
            );
            if summary.listener_failures > 0 {
                println!("  Failures:   {}", summary.listener_failures.to_string().red());
            }
            println!("  Elapsed:    {} ms", summary.elapsed_ms);
        }
    }
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    print!("{}", config.to_yaml()?);
    Ok(())
}
