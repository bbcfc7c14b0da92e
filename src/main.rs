//! hayesd — Hayes AT-command smart-modem emulator.

use std::sync::Arc;

use clap::Parser;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

use hayesd::config::Config;
use hayesd::dte::{Dte, SerialDte, TcpDte};
use hayesd::modem::{pump, Modem};
use hayesd::util::expand_tilde;
use hayesd::{led, net};

/// Hayes AT-command smart-modem emulator.
#[derive(Parser)]
#[command(name = "hayesd", version)]
struct Cli {
    /// Path to TOML config file.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref());

    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone());
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    info!("hayesd v{} starting", env!("CARGO_PKG_VERSION"));

    let (led_tx, led_rx) = mpsc::unbounded_channel();
    let led_task = tokio::spawn(led::run(led_rx));

    let profiles_path = expand_tilde(&config.modem.profiles_path).into_owned();
    let phonebook_path = expand_tilde(&config.modem.phonebook_path).into_owned();
    let modem = Modem::new(profiles_path, Some(phonebook_path), Some(led_tx));

    let serial_device = expand_tilde(&config.dte.serial_device).into_owned();
    let dte: Box<dyn Dte> = match config.dte.mode.as_str() {
        "serial" => match SerialDte::open(&serial_device) {
            Ok(d) => Box::new(d),
            Err(e) => {
                error!(error = %e, device = %config.dte.serial_device, "failed to open serial DTE");
                std::process::exit(1);
            }
        },
        _ => {
            info!(addr = %config.dte.tcp_listen, "waiting for DTE connection over TCP");
            let listener = match tokio::net::TcpListener::bind(&config.dte.tcp_listen).await {
                Ok(l) => l,
                Err(e) => {
                    error!(error = %e, "failed to bind DTE TCP listener");
                    std::process::exit(1);
                }
            };
            match listener.accept().await {
                Ok((stream, peer)) => {
                    info!(%peer, "DTE connected");
                    Box::new(TcpDte::new(stream))
                }
                Err(e) => {
                    error!(error = %e, "failed to accept DTE connection");
                    std::process::exit(1);
                }
            }
        }
    };

    let (reader, writer) = dte.split();
    let dte_sink = Arc::new(Mutex::new(writer));

    let pump_task = tokio::spawn(pump::run(modem.clone(), dte_sink.clone(), reader));

    let mut inbound_tasks = Vec::new();
    for cfg in config.inbound.clone() {
        let modem = modem.clone();
        let dte_sink = dte_sink.clone();
        info!(protocol = %cfg.protocol, addr = %cfg.listen, "starting inbound listener");
        inbound_tasks.push(tokio::spawn(async move {
            if let Err(e) = net::listen(cfg, modem, dte_sink).await {
                error!(error = %e, "inbound listener stopped");
            }
        }));
    }

    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("Failed to register SIGTERM");
            tokio::select! {
                _ = ctrl_c => info!("Received SIGINT"),
                _ = sigterm.recv() => info!("Received SIGTERM"),
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
            info!("Received SIGINT");
        }
    };

    tokio::select! {
        () = shutdown => {}
        () = async {
            if pump_task.await.is_err() {
                warn!("byte pump task ended unexpectedly");
            }
        } => {}
    }

    info!("Shutting down...");
    for task in inbound_tasks {
        task.abort();
    }
    led_task.abort();
    info!("Goodbye");
}
