//! # Configuración del Servidor
//! src/config.rs
//!
//! Define `ServerConfiguration` y cómo se carga. Prioridad (de menor a mayor):
//!
//! 1. Valores por defecto
//! 2. Archivo de configuración (`--config server.conf`)
//! 3. Argumentos CLI / variables de entorno
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./cgi_server --root htmlfiles --port 8080 --workers 10
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 SERVER_ROOT=htmlfiles ./cgi_server
//! ```
//!
//! ### Archivo (`server.conf`)
//! ```text
//! server_root = "htmlfiles"
//! max_clients = 10
//! listen_port = 8080
//! server_signature = "cgi_server/0.1"
//! ```

use crate::logging::LogFormat;
use crate::script::InvocationMode;
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Argumentos de línea de comandos
///
/// Todo es opcional: lo que no se indique sale del archivo o de los defaults.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "cgi_server")]
#[command(about = "Servidor HTTP/1.x multihilo con archivos estáticos y scripts CGI")]
#[command(version)]
pub struct CliArgs {
    /// Archivo de configuración (formato server.conf)
    #[arg(short, long, env = "SERVER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directorio raíz de los archivos servidos
    #[arg(long, env = "SERVER_ROOT")]
    pub root: Option<PathBuf>,

    /// Valor del header `Server`
    #[arg(long, env = "SERVER_SIGNATURE")]
    pub signature: Option<String>,

    /// Número de workers (conexiones simultáneas)
    #[arg(short, long, env = "MAX_WORKERS")]
    pub workers: Option<usize>,

    /// Puerto en el que escucha el servidor
    #[arg(short, long, env = "HTTP_PORT")]
    pub port: Option<u16>,

    /// IP (v4) en la que escucha
    #[arg(long, env = "HTTP_HOST")]
    pub host: Option<Ipv4Addr>,

    /// Programa para ejecutar scripts `.py`
    #[arg(long, env = "PYTHON_BIN")]
    pub python_bin: Option<String>,

    /// Programa para ejecutar scripts `.php`
    #[arg(long, env = "PHP_BIN")]
    pub php_bin: Option<String>,

    /// Cómo se invoca el intérprete (argv es seguro, shell permite inyección)
    #[arg(long, value_enum, env = "SCRIPT_MODE")]
    pub script_mode: Option<InvocationMode>,

    /// Formato del log
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "LOG_FORMAT")]
    pub log_format: LogFormat,
}

/// Contenido del archivo de configuración
///
/// Las claves son las del `server.conf` original más algunas opcionales.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    server_root: Option<PathBuf>,
    server_signature: Option<String>,
    max_clients: Option<usize>,
    listen_port: Option<u16>,
    listen_host: Option<Ipv4Addr>,
    python_bin: Option<String>,
    php_bin: Option<String>,
    script_mode: Option<InvocationMode>,
}

/// Errores al cargar o validar la configuración; abortan el arranque
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuración del servidor, inmutable una vez arrancado
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfiguration {
    /// Directorio raíz; el path del request se concatena a este
    pub root_dir: PathBuf,

    /// Valor del header `Server`
    pub signature: String,

    /// Número de workers del pool
    pub max_workers: usize,

    pub listen_port: u16,

    pub listen_host: Ipv4Addr,

    pub python_bin: String,

    pub php_bin: String,

    pub script_mode: InvocationMode,
}

impl ServerConfiguration {
    /// Carga la configuración: defaults, luego archivo, luego CLI/env
    ///
    /// # Errores
    ///
    /// Si el archivo no se puede leer o parsear, o si el resultado no valida.
    pub fn load(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.merge_cli(args);
        config.validate()?;
        Ok(config)
    }

    /// Defaults + contenido de un archivo `server.conf`
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_conf_str(&text)
    }

    /// Defaults + contenido de un `server.conf` ya leído
    ///
    /// # Ejemplo
    /// ```rust
    /// use cgi_server::config::ServerConfiguration;
    ///
    /// let config = ServerConfiguration::from_conf_str("max_clients = 4\nlisten_port = 9000\n").unwrap();
    /// assert_eq!(config.max_workers, 4);
    /// assert_eq!(config.listen_port, 9000);
    /// ```
    pub fn from_conf_str(text: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(text)?;
        let mut config = Self::default();
        config.merge_file(file);
        Ok(config)
    }

    fn merge_file(&mut self, file: FileConfig) {
        if let Some(root) = file.server_root {
            self.root_dir = root;
        }
        if let Some(signature) = file.server_signature {
            self.signature = signature;
        }
        if let Some(workers) = file.max_clients {
            self.max_workers = workers;
        }
        if let Some(port) = file.listen_port {
            self.listen_port = port;
        }
        if let Some(host) = file.listen_host {
            self.listen_host = host;
        }
        if let Some(python) = file.python_bin {
            self.python_bin = python;
        }
        if let Some(php) = file.php_bin {
            self.php_bin = php;
        }
        if let Some(mode) = file.script_mode {
            self.script_mode = mode;
        }
    }

    fn merge_cli(&mut self, args: &CliArgs) {
        if let Some(root) = &args.root {
            self.root_dir = root.clone();
        }
        if let Some(signature) = &args.signature {
            self.signature = signature.clone();
        }
        if let Some(workers) = args.workers {
            self.max_workers = workers;
        }
        if let Some(port) = args.port {
            self.listen_port = port;
        }
        if let Some(host) = args.host {
            self.listen_host = host;
        }
        if let Some(python) = &args.python_bin {
            self.python_bin = python.clone();
        }
        if let Some(php) = &args.php_bin {
            self.php_bin = php.clone();
        }
        if let Some(mode) = args.script_mode {
            self.script_mode = mode;
        }
    }

    /// Dirección de escucha (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use cgi_server::config::ServerConfiguration;
    ///
    /// let config = ServerConfiguration::default();
    /// assert_eq!(config.address().to_string(), "0.0.0.0:8080");
    /// ```
    pub fn address(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.listen_host, self.listen_port))
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::Invalid("max workers must be >= 1".to_string()));
        }
        if self.signature.trim().is_empty() {
            return Err(ConfigError::Invalid("server signature must not be empty".to_string()));
        }
        if !self.root_dir.is_dir() {
            return Err(ConfigError::Invalid(format!(
                "server root {} is not a directory",
                self.root_dir.display()
            )));
        }
        if self.python_bin.trim().is_empty() || self.php_bin.trim().is_empty() {
            return Err(ConfigError::Invalid("interpreter programs must not be empty".to_string()));
        }
        Ok(())
    }

    /// Registra un resumen de la configuración en el log
    pub fn log_summary(&self) {
        info!(address = %self.address(), "red");
        info!(root = %self.root_dir.display(), signature = %self.signature, "contenido");
        info!(workers = self.max_workers, "pool de workers");
        info!(
            python = %self.python_bin,
            php = %self.php_bin,
            mode = ?self.script_mode,
            "scripts"
        );
    }
}

impl Default for ServerConfiguration {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("htmlfiles"),
            signature: "cgi_server/0.1".to_string(),
            max_workers: 10,
            listen_port: 8080,
            listen_host: Ipv4Addr::UNSPECIFIED,
            python_bin: "python".to_string(),
            php_bin: "php".to_string(),
            script_mode: InvocationMode::Argv,
        }
    }
}
