//! # Módulo HTTP
//!
//! Implementa la parte de protocolo del servidor:
//!
//! - Lectura incremental de la cabecera (`wire`, sobre `httparse`)
//! - Construcción del `Request` con sus argumentos de script
//! - Construcción y envío de las respuestas
//! - Status codes y tabla de tipos de contenido
//!
//! ### Formato de Request
//!
//! ```text
//! GET /scripts/hola.py?nombre=ana HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! \r\n
//! ```
//!
//! ### Formato de Response
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: text/html\r\n
//! Content-Length: 10\r\n
//! Date: Sun, 06 Nov 1994 08:49:37 GMT\r\n
//! Server: cgi_server/0.1\r\n
//! Last-Modified: Sun, 06 Nov 1994 08:49:37 GMT\r\n
//! \r\n
//! Hola ana!
//! ```

pub mod mime;
pub mod request;
pub mod response;
pub mod status;
pub mod wire;

pub use request::{Header, Method, Request, RequestError};
pub use response::{Response, ResponseWriter};
pub use status::StatusCode;
pub use wire::{read_request, ReadOutcome, WireError};
