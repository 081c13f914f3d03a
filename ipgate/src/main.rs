#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use ipgate_lib::config::{load_from_path, Config, LoggingConfig};
use ipgate_lib::telemetry::{encode_metrics, init_metrics, init_tracing};
use ipgate_lib::{AccessGate, ConfigWatcher};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "IP whitelist admission checks")]
struct Cli {
    /// Path to configuration TOML file
    #[arg(short, long, value_name = "FILE", env = "IPGATE_CONFIG", default_value = "ipgate.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print ALLOWED or BLOCKED for each address; exits with 2 if any is blocked
    Check {
        #[arg(required = true, value_name = "ADDR")]
        addresses: Vec<String>,
    },
    /// Print rule counts and gate state
    Stats,
    /// Check addresses read from stdin, reloading the whitelist on config changes
    /// when `reload.enabled` is set
    Watch {
        /// Print Prometheus metrics to stderr on exit
        #[arg(long)]
        print_metrics: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let cfg = match load_from_path(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            let _ = init_tracing(&LoggingConfig::default());
            error!(%err, path = %cli.config.display(), "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_tracing(&cfg.logging) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    let gate = match AccessGate::from_config(&cfg.gate, &cfg.whitelist) {
        Ok(gate) => gate,
        Err(err) => {
            error!(%err, "failed to build whitelist");
            return ExitCode::FAILURE;
        }
    };
    info!(rules = gate.whitelist().len(), enabled = gate.is_enabled(), "configuration loaded");

    match cli.command {
        Command::Check { addresses } => check(&gate, &addresses),
        Command::Stats => stats(&gate),
        Command::Watch { print_metrics } => watch(cli.config, &cfg, gate, print_metrics).await,
    }
}

fn check(gate: &AccessGate, addresses: &[String]) -> ExitCode {
    let mut all_allowed = true;
    for addr in addresses {
        let allowed = gate.admit_str(addr);
        all_allowed &= allowed;
        println!("{addr}: {}", verdict(allowed));
    }
    if all_allowed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    }
}

fn stats(gate: &AccessGate) -> ExitCode {
    let rules = gate.whitelist().snapshot();
    println!("enabled:   {}", gate.is_enabled());
    println!("addresses: {}", rules.exact_count());
    println!("cidrs:     {}", rules.cidr_count());
    println!("ranges:    {}", rules.range_count());
    println!("patterns:  {}", rules.pattern_count());
    println!("total:     {}", rules.len());
    ExitCode::SUCCESS
}

async fn watch(path: PathBuf, cfg: &Config, gate: AccessGate, print_metrics: bool) -> ExitCode {
    let (metrics, registry) = match init_metrics() {
        Ok((metrics, registry)) => (Some(metrics), Some(registry)),
        Err(err) => {
            warn!(%err, "metrics unavailable");
            (None, None)
        }
    };
    let gate = Arc::new(match &metrics {
        Some(m) => gate.with_metrics(m.clone()),
        None => gate,
    });

    let _watcher = if cfg.reload.enabled {
        let debounce = Duration::from_millis(cfg.reload.debounce_ms);
        match ConfigWatcher::spawn(path, gate.clone(), debounce, metrics) {
            Ok(watcher) => Some(watcher),
            Err(err) => {
                error!(%err, "failed to watch configuration");
                return ExitCode::FAILURE;
            }
        }
    } else {
        info!("reload disabled, whitelist is fixed for this run");
        None
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let addr = line.trim();
                    if !addr.is_empty() {
                        println!("{addr}: {}", verdict(gate.admit_str(addr)));
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    error!(%err, "failed to read stdin");
                    return ExitCode::FAILURE;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
        }
    }

    if let (true, Some(registry)) = (print_metrics, registry) {
        match encode_metrics(&registry) {
            Ok(text) => eprint!("{text}"),
            Err(err) => warn!(%err, "failed to encode metrics"),
        }
    }

    ExitCode::SUCCESS
}

fn verdict(allowed: bool) -> &'static str {
    if allowed {
        "ALLOWED"
    } else {
        "BLOCKED"
    }
}
