//! # Tabla de tipos de contenido
//! src/http/mime.rs
//!
//! Mapea la extensión del recurso pedido a su `Content-Type`. Las extensiones
//! `.py` y `.php` se sirven como `text/html` pero se ejecutan en vez de
//! transferirse tal cual.

use crate::script::Interpreter;
use std::path::Path;

/// Tipo de contenido resuelto para un path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentType {
    /// Valor del header `Content-Type`
    pub mime: &'static str,

    /// Intérprete a invocar si el recurso es un script
    pub interpreter: Option<Interpreter>,
}

impl ContentType {
    const fn file(mime: &'static str) -> Self {
        Self { mime, interpreter: None }
    }

    const fn script(interpreter: Interpreter) -> Self {
        Self { mime: "text/html", interpreter: Some(interpreter) }
    }
}

/// Resuelve el tipo de contenido de un path de request
///
/// Ignora cualquier query string. Retorna `None` si la extensión no está
/// en la tabla (o si no hay extensión).
///
/// # Ejemplo
/// ```
/// use cgi_server::http::mime::content_type_for;
///
/// assert_eq!(content_type_for("/index.html").unwrap().mime, "text/html");
/// assert!(content_type_for("/calc.py").unwrap().interpreter.is_some());
/// assert!(content_type_for("/archive.zip").is_none());
/// ```
pub fn content_type_for(path: &str) -> Option<ContentType> {
    let path = path.split('?').next().unwrap_or(path);
    let extension = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();

    let content_type = match extension.as_str() {
        "txt" => ContentType::file("text/plain"),
        "html" | "htm" => ContentType::file("text/html"),
        "gif" => ContentType::file("image/gif"),
        "jpeg" | "jpg" => ContentType::file("image/jpeg"),
        "mpeg" | "mpg" => ContentType::file("video/mpeg"),
        "avi" => ContentType::file("video/avi"),
        "mov" => ContentType::file("video/mov"),
        "doc" | "docx" => ContentType::file("application/msword"),
        "pdf" => ContentType::file("application/pdf"),
        "py" => ContentType::script(Interpreter::Python),
        "php" => ContentType::script(Interpreter::Php),
        _ => return None,
    };

    Some(content_type)
}
