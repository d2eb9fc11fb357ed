//! # Adaptador del parser de la cabecera HTTP
//! src/http/wire.rs
//!
//! Lee bytes de la conexión a un buffer de capacidad fija y, después de cada
//! `read`, intenta parsear la request line + headers con `httparse`.
//!
//! ## Resultados posibles
//!
//! 1. **Completo**: método, path, versión menor, headers y longitud de la cabecera
//! 2. **Incompleto**: se sigue leyendo (estado interno del bucle)
//! 3. **Error**: cabecera malformada (`WireError::Parse`)
//! 4. **Peer cerrado**: `read` retorna 0 sin datos previos, fin normal de
//!    una conexión persistente
//!
//! Si la cabecera no cabe en el buffer se falla con `WireError::BufferExhausted`,
//! que es fatal para la conexión (500) pero no para el servidor.
//!
//! El body es lo que quedó en el buffer detrás de la cabecera. No se hace
//! ninguna lectura extra guiada por `Content-Length`.

use super::request::Header;
use super::StatusCode;
use std::io::{self, Read};
use thiserror::Error;

/// Capacidad del buffer de lectura de una request (cabecera + body)
pub const HEAD_BUFFER_SIZE: usize = 4096;

/// Máximo de headers que acepta el parser
pub const MAX_HEADERS: usize = 100;

/// Cabecera parseada (request line + headers)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHead {
    /// Método tal cual llegó (ej: "GET")
    pub method: String,

    /// Path completo, query string incluida
    pub path: String,

    /// Versión menor de HTTP/1.x
    pub minor_version: u8,

    /// Headers en el orden recibido
    pub headers: Vec<Header>,

    /// Bytes que ocupa la cabecera en el buffer
    pub head_len: usize,
}

impl RawHead {
    /// Busca un header por nombre (sin distinguir mayúsculas)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

/// Cabecera más los bytes que la siguen en el buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRequest {
    pub head: RawHead,
    pub body: Vec<u8>,
}

/// Resultado de un intento de parseo sobre lo acumulado hasta ahora
#[derive(Debug, PartialEq, Eq)]
enum ParseStatus {
    Complete(RawHead),
    Partial,
}

/// Resultado de leer una request completa de la conexión
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Llegó una request completa
    Complete(RawRequest),

    /// El cliente cerró la conexión sin enviar nada
    PeerClosed,
}

/// Errores de lectura/parseo de la cabecera
#[derive(Debug, Error)]
pub enum WireError {
    #[error("request does not fit in the {0}-byte buffer")]
    BufferExhausted(usize),

    #[error("malformed request head: {0}")]
    Parse(#[from] httparse::Error),

    #[error("peer closed the connection after {0} bytes of an incomplete head")]
    Truncated(usize),

    #[error("read failed: {0}")]
    Io(#[from] io::Error),
}

impl WireError {
    /// Status a enviar al cliente, o `None` si ya no hay a quién responder
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            WireError::Parse(_) => Some(StatusCode::BadRequest),
            WireError::BufferExhausted(_) | WireError::Io(_) => Some(StatusCode::InternalServerError),
            WireError::Truncated(_) => None,
        }
    }
}

/// Buffer de capacidad fija donde se acumula la request
struct HeadBuffer {
    buf: Vec<u8>,
    filled: usize,
}

impl HeadBuffer {
    /// Crea un buffer de `HEAD_BUFFER_SIZE` bytes
    fn new() -> Self {
        Self {
            buf: vec![0; HEAD_BUFFER_SIZE],
            filled: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes acumulados hasta ahora
    fn filled(&self) -> &[u8] {
        &self.buf[..self.filled]
    }

    fn is_full(&self) -> bool {
        self.filled == self.buf.len()
    }

    /// Hace un `read` sobre el espacio libre del buffer
    ///
    /// Reintenta si la llamada fue interrumpida por una señal.
    fn fill_from<R: Read>(&mut self, reader: &mut R) -> io::Result<usize> {
        loop {
            match reader.read(&mut self.buf[self.filled..]) {
                Ok(n) => {
                    self.filled += n;
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Intenta parsear la cabecera con lo acumulado
    fn parse(&self) -> Result<ParseStatus, WireError> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut request = httparse::Request::new(&mut headers);

        match request.parse(self.filled())? {
            httparse::Status::Partial => Ok(ParseStatus::Partial),
            httparse::Status::Complete(head_len) => {
                let headers = request
                    .headers
                    .iter()
                    .map(|h| Header::new(h.name, &String::from_utf8_lossy(h.value)))
                    .collect();

                Ok(ParseStatus::Complete(RawHead {
                    method: request.method.unwrap_or_default().to_string(),
                    path: request.path.unwrap_or_default().to_string(),
                    minor_version: request.version.unwrap_or(1),
                    headers,
                    head_len,
                }))
            }
        }
    }

    /// Bytes que siguieron a la cabecera en el buffer
    fn body(&self, head: &RawHead) -> Vec<u8> {
        self.buf[head.head_len..self.filled].to_vec()
    }
}

/// Lee una request completa de la conexión
///
/// # Retorna
///
/// * `Ok(ReadOutcome::Complete)` - cabecera parseada + body en el buffer
/// * `Ok(ReadOutcome::PeerClosed)` - el cliente cerró sin enviar datos
/// * `Err(WireError)` - cabecera malformada, buffer agotado o fallo de lectura
///
/// # Ejemplo
///
/// ```
/// use cgi_server::http::wire::{read_request, ReadOutcome};
/// use std::io::Cursor;
///
/// let mut stream = Cursor::new(b"GET /index.html HTTP/1.1\r\nHost: x\r\n\r\n".to_vec());
/// match read_request(&mut stream).unwrap() {
///     ReadOutcome::Complete(request) => assert_eq!(request.head.path, "/index.html"),
///     ReadOutcome::PeerClosed => unreachable!(),
/// }
/// ```
pub fn read_request<R: Read>(reader: &mut R) -> Result<ReadOutcome, WireError> {
    let mut buffer = HeadBuffer::new();

    let head = loop {
        if buffer.fill_from(reader)? == 0 {
            if buffer.filled().is_empty() {
                return Ok(ReadOutcome::PeerClosed);
            }
            return Err(WireError::Truncated(buffer.filled().len()));
        }

        match buffer.parse()? {
            ParseStatus::Complete(head) => break head,
            ParseStatus::Partial if buffer.is_full() => {
                return Err(WireError::BufferExhausted(buffer.capacity()));
            }
            ParseStatus::Partial => continue,
        }
    };

    let body = buffer.body(&head);
    Ok(ReadOutcome::Complete(RawRequest { head, body }))
}
