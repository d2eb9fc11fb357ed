//! # Construcción y envío de Respuestas HTTP
//! src/http/response.rs
//!
//! `Response` arma la status line + headers (+ body) y `ResponseWriter`
//! la envía por el socket. Hay cinco tipos de respuesta:
//!
//! | Tipo              | Headers                                                     |
//! |-------------------|-------------------------------------------------------------|
//! | 200 archivo       | Content-Type, Content-Length, Date, Server, Last-Modified   |
//! | 200 script        | Content-Type, Content-Length, Date, Server, Last-Modified   |
//! | 200 OPTIONS       | Content-Length: 0, Date, Server, Allow                      |
//! | 400 / 404 / 500   | Content-Type, Content-Length, Date, Server + cuerpo HTML    |
//!
//! La versión menor de la status line repite la del request (`1` si el
//! request no llegó a parsearse).
//!
//! ## Ejemplo de uso
//!
//! ```
//! use cgi_server::http::{Response, StatusCode};
//!
//! let response = Response::error(StatusCode::NotFound, 1);
//! let text = String::from_utf8(response.to_bytes()).unwrap();
//! assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
//! assert!(text.ends_with("<html><b>404 Not Found</b></html>"));
//! ```

use super::StatusCode;
use std::io::{self, Read, Write};
use std::time::SystemTime;
use tracing::warn;

/// Métodos que se anuncian en la respuesta a OPTIONS
pub const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";

/// Representa una respuesta HTTP/1.x
#[derive(Debug, Clone)]
pub struct Response {
    /// Código de estado HTTP
    status: StatusCode,

    /// Versión menor para la status line (`HTTP/1.x`)
    minor_version: u8,

    /// Headers en el orden en que se envían
    headers: Vec<(String, String)>,

    /// Cuerpo de la respuesta (vacío si el cuerpo se envía aparte)
    body: Vec<u8>,
}

impl Response {
    /// Crea una respuesta sin headers ni body
    pub fn new(status: StatusCode, minor_version: u8) -> Self {
        Self {
            status,
            minor_version,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Agrega un header; si ya existe se sobrescribe manteniendo su posición
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    /// Versión mutable de `with_header`
    pub fn add_header(&mut self, name: &str, value: &str) {
        match self.headers.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    /// Establece el cuerpo y su `Content-Length`
    pub fn with_body(mut self, body: &[u8]) -> Self {
        self.body = body.to_vec();
        let len = self.body.len() as u64;
        self.with_content_length(len)
    }

    /// Fija `Content-Length` sin guardar cuerpo (el cuerpo se transmite aparte)
    pub fn with_content_length(self, len: u64) -> Self {
        self.with_header("Content-Length", &len.to_string())
    }

    /// Respuesta 200 para contenido de `len` bytes del tipo dado
    pub fn content(minor_version: u8, content_type: &str, len: u64) -> Self {
        Self::new(StatusCode::Ok, minor_version)
            .with_header("Content-Type", content_type)
            .with_content_length(len)
    }

    /// Respuesta de error con el cuerpo HTML fijo del status
    pub fn error(status: StatusCode, minor_version: u8) -> Self {
        let body = status.error_body().unwrap_or_default();
        Self::new(status, minor_version)
            .with_header("Content-Type", "text/html")
            .with_body(body.as_bytes())
    }

    /// Respuesta 200 a OPTIONS, sin cuerpo
    pub fn options(minor_version: u8) -> Self {
        Self::new(StatusCode::Ok, minor_version).with_content_length(0)
    }

    /// Status line + headers + línea vacía
    pub fn head_bytes(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.{} {}\r\n", self.minor_version, self.status);
        for (name, value) in &self.headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");
        head.into_bytes()
    }

    /// Respuesta completa lista para enviar por el socket
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.head_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

/// Envía las respuestas del servidor
///
/// Agrega `Date` y `Server` a todo lo que envía. Los fallos de envío se
/// registran en el log y nunca se propagan: el peer puede ya no estar.
#[derive(Debug, Clone)]
pub struct ResponseWriter {
    signature: String,
}

impl ResponseWriter {
    pub fn new(signature: &str) -> Self {
        Self {
            signature: signature.to_string(),
        }
    }

    /// Agrega los headers comunes a todas las respuestas
    fn stamp(&self, response: Response) -> Response {
        response
            .with_header("Date", &httpdate::fmt_http_date(SystemTime::now()))
            .with_header("Server", &self.signature)
    }

    /// 200 con el contenido de un archivo estático
    ///
    /// La cabecera se envía primero y luego el archivo se copia al socket.
    /// Nunca se copian más de `len` bytes, el valor anunciado en `Content-Length`.
    pub fn send_file<W: Write, R: Read>(
        &self,
        stream: &mut W,
        minor_version: u8,
        content_type: &str,
        file: &mut R,
        len: u64,
        modified: SystemTime,
    ) {
        let response = self
            .stamp(Response::content(minor_version, content_type, len))
            .with_header("Last-Modified", &httpdate::fmt_http_date(modified));

        if self.transmit(stream, &response.head_bytes()) {
            if let Err(e) = io::copy(&mut file.take(len), stream) {
                warn!(error = %e, "fallo al enviar el archivo");
            }
        }
    }

    /// 200 con la salida capturada de un script
    pub fn send_script<W: Write>(
        &self,
        stream: &mut W,
        minor_version: u8,
        output: &[u8],
        modified: SystemTime,
    ) {
        let response = self
            .stamp(Response::content(minor_version, "text/html", output.len() as u64))
            .with_header("Last-Modified", &httpdate::fmt_http_date(modified));

        let mut bytes = response.head_bytes();
        bytes.extend_from_slice(output);
        self.transmit(stream, &bytes);
    }

    /// 200 a OPTIONS con `Allow: GET, POST, OPTIONS`
    pub fn send_options<W: Write>(&self, stream: &mut W, minor_version: u8) {
        let response = self
            .stamp(Response::options(minor_version))
            .with_header("Allow", ALLOWED_METHODS);
        self.transmit(stream, &response.to_bytes());
    }

    /// 400, 404 o 500 con su cuerpo HTML
    pub fn send_error<W: Write>(&self, stream: &mut W, minor_version: u8, status: StatusCode) {
        let response = self.stamp(Response::error(status, minor_version));
        self.transmit(stream, &response.to_bytes());
    }

    /// Escribe los bytes en el socket; `false` si falló
    fn transmit<W: Write>(&self, stream: &mut W, bytes: &[u8]) -> bool {
        match stream.write_all(bytes).and_then(|_| stream.flush()) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "fallo al enviar la respuesta");
                false
            }
        }
    }
}
