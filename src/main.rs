//! # CGI Server - Entry Point
//! src/main.rs
//!
//! Carga la configuración, levanta el pool de workers y espera SIGINT o
//! SIGTERM. Al recibirla imprime cuántas conexiones atendió cada worker.

use cgi_server::config::{CliArgs, ServerConfiguration};
use cgi_server::logging;
use cgi_server::server::Server;
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};

fn main() -> ExitCode {
    let args = CliArgs::parse();
    logging::init(args.log_format);

    let config = match ServerConfiguration::load(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "configuración inválida");
            return ExitCode::FAILURE;
        }
    };
    config.log_summary();

    let server = match Server::bind(&config).and_then(Server::start) {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "no se pudo iniciar el servidor");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = wait_for_shutdown() {
        error!(error = %e, "no se pudieron instalar los handlers de señales");
        return ExitCode::FAILURE;
    }

    info!("apagando");
    for stats in server.worker_stats() {
        info!("{stats}");
    }
    ExitCode::SUCCESS
}

/// Bloquea hasta recibir SIGINT o SIGTERM
#[cfg(unix)]
fn wait_for_shutdown() -> std::io::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "señal recibida");
    }
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown() -> std::io::Result<()> {
    loop {
        std::thread::park();
    }
}
