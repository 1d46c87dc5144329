//! `roscom` – runs the animation bridge against the simulated rig.
//!
//! 1. Loads `~/.roscom/config.toml` (defaults when absent) with `ROSCOM_*`
//!    overrides.
//! 2. Constructs and initializes the bridge node on an in-process bus.
//! 3. Runs the control loop at `tick_hz` until **Ctrl-C**, then drops the
//!    node.
//!
//! `roscom init` writes the default config file and exits.

mod config;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::TimeDelta;
use colored::Colorize;
use roscom_middleware::{BridgeNode, LocalBus};
use roscom_rig::SimRig;
use roscom_runtime::ControlLoop;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, trace, warn};

fn main() -> ExitCode {
    // Set ROSCOM_LOG_FORMAT=json for newline-delimited JSON logs.
    let telemetry = roscom_runtime::init_tracing("roscom");

    print_banner();

    if std::env::args().nth(1).as_deref() == Some("init") {
        return write_default_config();
    }

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – dropping bridge node …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; the loop can only be stopped by killing the process");
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };
    println!(
        "  namespace {}  ·  {} Hz  ·  dispatch {:?}  ·  otlp {}",
        format!("/{}", cfg.namespace).bold(),
        cfg.tick_hz,
        cfg.dispatch,
        if telemetry.is_exporting() { "on" } else { "off" }
    );

    // ── Bridge node ───────────────────────────────────────────────────────
    let timeout = TimeDelta::milliseconds(i64::from(cfg.pau_active_timeout_ms));
    let rig = Arc::new(SimRig::new().with_pau_active_timeout(timeout));
    let bus = Arc::new(LocalBus::default());
    let node = match BridgeNode::construct(rig, bus.clone(), &cfg.bridge_config()) {
        Ok(node) => node,
        Err(e) => {
            let cause = if e.is_construction_fault() { "channel table" } else { "transport" };
            error!(error = %e, cause, "bridge construction failed");
            println!("{} ({cause}): {}", "Startup failed".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };
    if !node.initialize() {
        println!("{}", "Startup failed: no channels to initialize".red().bold());
        return ExitCode::FAILURE;
    }
    println!(
        "  {} {} channels bound.  Press Ctrl-C to stop.\n",
        "✓".green().bold(),
        node.registry().len()
    );

    // ── Control loop ──────────────────────────────────────────────────────
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            println!("{}: {}", "Failed to start async runtime".red(), e);
            return ExitCode::FAILURE;
        }
    };

    let period = cfg.tick_period();
    let stats = runtime.block_on(async move {
        let mut tap = bus.tap();
        tokio::spawn(async move {
            loop {
                match tap.recv().await {
                    Ok(message) => {
                        trace!(channel = %message.channel, id = %message.id, "published");
                    }
                    Err(RecvError::Lagged(skipped)) => trace!(skipped, "publish tap lagged"),
                    Err(RecvError::Closed) => break,
                }
            }
        });
        ControlLoop::new(node).run(shutdown, period).await
    });

    println!(
        "  {} {} ticks, {} queued commands executed, {} incomplete publishes.",
        "✓".green().bold(),
        stats.ticks,
        stats.executed,
        stats.failed_pushes
    );
    ExitCode::SUCCESS
}

fn write_default_config() -> ExitCode {
    let path = config::config_path();
    if path.exists() {
        println!("  Config already present at {}", path.display().to_string().bold());
        return ExitCode::SUCCESS;
    }
    match config::save(&config::Config::default()) {
        Ok(()) => {
            println!(
                "  {} Config saved to {}",
                "✓".green().bold(),
                path.display().to_string().bold()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{}: {}", "Error saving config".red(), e);
            ExitCode::FAILURE
        }
    }
}

fn print_banner() {
    println!();
    println!("{}", r#"   _ __ ___  ___  ___ ___  _ __ ___  "#.bold().cyan());
    println!("{}", r#"  | '__/ _ \/ __|/ __/ _ \| '_ ` _ \ "#.bold().cyan());
    println!("{}", r#"  | | | (_) \__ \ (_| (_) | | | | | |"#.bold().cyan());
    println!("{}", r#"  |_|  \___/|___/\___\___/|_| |_| |_|"#.bold().cyan());
    println!("{}", "  animation bridge".dimmed());
    println!();
}
