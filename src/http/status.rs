//! # Códigos de Estado HTTP
//! src/http/status.rs
//!
//! El servidor solo produce cuatro status lines:
//!
//! - `200 OK`
//! - `400 Bad Request`
//! - `404 Not Found`
//! - `500 Server Error`
//!
//! Los errores llevan además un cuerpo HTML mínimo fijo.

/// Códigos de estado que puede emitir el servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK - Archivo, salida de script u OPTIONS
    Ok = 200,

    /// 400 Bad Request - Request malformado, método desconocido, tipo no soportado
    BadRequest = 400,

    /// 404 Not Found - Archivo estático inexistente
    NotFound = 404,

    /// 500 Server Error - Fallo interno (buffer agotado, script sin salida, etc.)
    InternalServerError = 500,
}

impl StatusCode {
    /// Convierte el código a su valor numérico
    ///
    /// # Ejemplo
    /// ```
    /// use cgi_server::http::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// ```
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Retorna el texto de razón (reason phrase) asociado al código
    ///
    /// # Ejemplo
    /// ```
    /// use cgi_server::http::StatusCode;
    /// assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    /// assert_eq!(StatusCode::InternalServerError.reason_phrase(), "Server Error");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Server Error",
        }
    }

    /// Cuerpo HTML fijo que acompaña a cada respuesta de error
    ///
    /// `200 OK` no tiene cuerpo de error, retorna `None`.
    pub fn error_body(&self) -> Option<&'static str> {
        match self {
            StatusCode::Ok => None,
            StatusCode::BadRequest => Some("<html><b>400 Bad Request</b></html>"),
            StatusCode::NotFound => Some("<html><b>404 Not Found</b></html>"),
            StatusCode::InternalServerError => Some("<html><b>500 internal server error</b></html>"),
        }
    }

    /// Verifica si el código indica error del cliente (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.as_u16())
    }

    /// Verifica si el código indica error del servidor (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.as_u16())
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_values() {
        assert_eq!(StatusCode::Ok.as_u16(), 200);
        assert_eq!(StatusCode::BadRequest.as_u16(), 400);
        assert_eq!(StatusCode::NotFound.as_u16(), 404);
        assert_eq!(StatusCode::InternalServerError.as_u16(), 500);
    }

    #[test]
    fn test_display() {
        assert_eq!(StatusCode::Ok.to_string(), "200 OK");
        assert_eq!(StatusCode::BadRequest.to_string(), "400 Bad Request");
        assert_eq!(StatusCode::NotFound.to_string(), "404 Not Found");
        assert_eq!(StatusCode::InternalServerError.to_string(), "500 Server Error");
    }

    #[test]
    fn test_error_bodies() {
        assert_eq!(StatusCode::Ok.error_body(), None);
        assert_eq!(
            StatusCode::NotFound.error_body(),
            Some("<html><b>404 Not Found</b></html>")
        );
        assert!(StatusCode::BadRequest.error_body().unwrap().contains("400"));
        assert!(StatusCode::InternalServerError.error_body().unwrap().contains("500"));
    }

    #[test]
    fn test_error_classes() {
        assert!(StatusCode::BadRequest.is_client_error());
        assert!(StatusCode::NotFound.is_client_error());
        assert!(!StatusCode::Ok.is_client_error());
        assert!(StatusCode::InternalServerError.is_server_error());
        assert!(!StatusCode::BadRequest.is_server_error());
    }
}
