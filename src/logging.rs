//! # Logging
//! src/logging.rs
//!
//! Inicializa `tracing-subscriber`. El nivel se controla con `RUST_LOG`
//! (por defecto `info`) y el formato con `--log-format`.

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Formato de salida del log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Texto legible, una línea por evento
    #[default]
    Text,

    /// Un objeto JSON por evento
    Json,
}

/// Instala el subscriber global
///
/// Si ya había uno instalado (por ejemplo en tests) no hace nada.
pub fn init(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_names(true);

    let _ = match format {
        LogFormat::Text => subscriber.try_init(),
        LogFormat::Json => subscriber.json().try_init(),
    };
}
