//! # Modelo de Request
//! src/http/request.rs
//!
//! Convierte la salida del parser (`RawRequest`) en un `Request` estructurado.
//!
//! ## Argumentos de script
//!
//! Para `GET` y `POST` se juntan en un único string:
//!
//! 1. **Body** (solo POST): todo lo que sigue a la cabecera en el buffer
//! 2. **Query string**: lo que va después del primer `?` del path
//!
//! Si hay ambos se concatenan como `"<body> <query>"`.
//!
//! ```text
//! POST /calc.py?x=1 HTTP/1.1\r\n
//! Content-Length: 3\r\n
//! \r\n
//! foo                          → args = "foo x=1"
//! ```
//!
//! El `Request` se crea por cada petición y se libera antes de leer la
//! siguiente; nunca se comparte entre workers.

use super::wire::RawRequest;
use super::StatusCode;
use thiserror::Error;

/// Longitud máxima del path de un request
pub const MAX_PATH_LEN: usize = 255;

/// Longitud máxima del string de argumentos para un script
pub const MAX_ARGS_LEN: usize = 2047;

/// Longitud máxima del nombre o del valor de un header
pub const MAX_HEADER_FIELD_LEN: usize = 2047;

/// Un header HTTP (nombre y valor)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// Métodos HTTP que distingue el dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    GET,
    POST,
    OPTIONS,

    /// Cualquier otro método; se responde con 400
    Other(String),
}

impl Method {
    fn from_token(token: &str) -> Self {
        match token {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "OPTIONS" => Method::OPTIONS,
            other => Method::Other(other.to_string()),
        }
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::OPTIONS => "OPTIONS",
            Method::Other(token) => token,
        }
    }

    /// `true` para los métodos que pueden llevar argumentos de script
    pub fn carries_args(&self) -> bool {
        matches!(self, Method::GET | Method::POST)
    }
}

/// Errores al construir el `Request`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("nothing after '?' in the request path")]
    EmptyQuery,

    #[error("POST request without a body")]
    EmptyPostBody,

    #[error("request path of {0} bytes exceeds the {max}-byte limit", max = MAX_PATH_LEN)]
    PathTooLong(usize),

    #[error("script arguments of {0} bytes exceed the {max}-byte limit", max = MAX_ARGS_LEN)]
    ArgsTooLong(usize),

    #[error("header {0} exceeds the {max}-byte limit", max = MAX_HEADER_FIELD_LEN)]
    HeaderTooLong(String),
}

impl RequestError {
    /// Status con el que se responde este error
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::EmptyQuery | RequestError::EmptyPostBody => StatusCode::BadRequest,
            RequestError::PathTooLong(_)
            | RequestError::ArgsTooLong(_)
            | RequestError::HeaderTooLong(_) => StatusCode::InternalServerError,
        }
    }
}

/// Request HTTP/1.x ya estructurado
#[derive(Debug, Clone)]
pub struct Request {
    /// Método HTTP
    method: Method,

    /// Path sin query string (para GET/POST); tal cual para el resto
    path: String,

    /// Versión menor de HTTP/1.x, se repite en la respuesta
    http_minor_version: u8,

    /// Argumentos para el script (body y/o query string)
    args: String,

    has_args: bool,

    /// `false` si el cliente envió `Connection: Close`
    keep_alive: bool,
}

impl Request {
    /// Construye el request a partir de la salida del parser
    ///
    /// Para `GET`/`POST` el path se separa en el primer `?`; a partir de aquí
    /// el path original ya no está disponible.
    ///
    /// # Errores
    ///
    /// * `EmptyQuery` / `EmptyPostBody` - request malformado (400)
    /// * `PathTooLong` / `ArgsTooLong` / `HeaderTooLong` - no cabe en los límites (500)
    pub fn from_raw(raw: RawRequest) -> Result<Self, RequestError> {
        let RawRequest { head, body } = raw;

        if head.path.len() > MAX_PATH_LEN {
            return Err(RequestError::PathTooLong(head.path.len()));
        }
        for header in &head.headers {
            if header.name.len() > MAX_HEADER_FIELD_LEN || header.value.len() > MAX_HEADER_FIELD_LEN {
                return Err(RequestError::HeaderTooLong(header.name.clone()));
            }
        }

        let method = Method::from_token(&head.method);
        let mut path = head.path.clone();
        let mut args = String::new();
        let mut has_args = false;

        if method.carries_args() {
            if method == Method::POST {
                if body.is_empty() {
                    return Err(RequestError::EmptyPostBody);
                }
                args.push_str(&String::from_utf8_lossy(&body));
                has_args = true;
            }

            if let Some(mark) = path.find('?') {
                let query = path.split_off(mark + 1);
                path.truncate(mark);
                if query.is_empty() {
                    return Err(RequestError::EmptyQuery);
                }
                if has_args {
                    args.push(' ');
                }
                args.push_str(&query);
                has_args = true;
            }

            if args.len() > MAX_ARGS_LEN {
                return Err(RequestError::ArgsTooLong(args.len()));
            }
        }

        let keep_alive = !head
            .header("Connection")
            .is_some_and(|value| value.contains("Close"));

        Ok(Request {
            method,
            path,
            http_minor_version: head.minor_version,
            args,
            has_args,
            keep_alive,
        })
    }

    // === Métodos públicos para acceder a los campos ===

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn http_minor_version(&self) -> u8 {
        self.http_minor_version
    }

    /// Argumentos para el script, `""` si no hay
    pub fn args(&self) -> &str {
        &self.args
    }

    pub fn has_args(&self) -> bool {
        self.has_args
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }
}
