//! # CGI Server
//! src/lib.rs
//!
//! Servidor HTTP/1.x multi-thread que sirve archivos estáticos y ejecuta
//! scripts PHP y Python, devolviendo su salida como HTML.
//!
//! ## Arquitectura
//!
//! - `config`: CLI, variables de entorno y archivo `server.conf`
//! - `logging`: inicialización de `tracing`
//! - `http`: lectura del request, tipos de contenido, respuestas
//! - `script`: ejecución de los intérpretes externos
//! - `dispatcher`: clasifica y responde cada request de una conexión
//! - `server`: socket de escucha y pool fijo de workers
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use cgi_server::config::ServerConfiguration;
//! use cgi_server::server::Server;
//!
//! let config = ServerConfiguration::default();
//! let server = Server::bind(&config)?.start()?;
//! println!("escuchando en {}", server.local_addr());
//! # Ok::<(), cgi_server::server::ServerError>(())
//! ```

pub mod config;
pub mod dispatcher;
pub mod http;
pub mod logging;
pub mod script;
pub mod server;
