//! # Dispatcher de Requests
//! src/dispatcher/mod.rs
//!
//! Decide cómo se responde cada request y si la conexión sigue abierta.
//!
//! ## Ciclo de un request
//!
//! ```text
//! Parsing → Classified → Responded → (ConnectionOpen | ConnectionClosed)
//! ```
//!
//! ## Clasificación (en orden)
//!
//! 1. Extensión desconocida → 400
//! 2. `GET` + no script → archivo estático (400 si trae argumentos)
//! 3. `GET`/`POST` + script (`.py`, `.php`) → ejecución del script
//! 4. `OPTIONS` → `Allow: GET, POST, OPTIONS`
//! 5. Cualquier otra cosa → 400
//!
//! Cada request recibe exactamente una respuesta.

use crate::config::ServerConfiguration;
use crate::http::mime::content_type_for;
use crate::http::{read_request, Method, ReadOutcome, Request, ResponseWriter, StatusCode};
use crate::script::{Interpreter, ScriptGateway};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, error, info, warn};

/// Estado de la conexión después de responder un request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Se puede leer el siguiente request
    Open,

    /// Hay que cerrar la conexión
    Closed,
}

/// Resultado de procesar un request en una conexión
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exchange {
    /// Status enviado; `None` si no se envió respuesta
    pub status: Option<StatusCode>,
    pub state: ConnectionState,
}

impl Exchange {
    fn closed(status: Option<StatusCode>) -> Self {
        Self {
            status,
            state: ConnectionState::Closed,
        }
    }
}

/// Cómo se va a responder un request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Transferir un archivo tal cual
    StaticFile {
        file: PathBuf,
        content_type: &'static str,
    },

    /// Ejecutar un script y devolver su salida
    Script {
        script: PathBuf,
        interpreter: Interpreter,
    },

    /// Responder a OPTIONS
    Options,

    /// Responder 400 (con el motivo para el log)
    Invalid(&'static str),
}

/// Dispatcher compartido (solo lectura) por todos los workers
#[derive(Debug, Clone)]
pub struct Dispatcher {
    root: PathBuf,
    writer: ResponseWriter,
    scripts: ScriptGateway,
}

impl Dispatcher {
    pub fn new(config: &ServerConfiguration) -> Self {
        Self {
            root: config.root_dir.clone(),
            writer: ResponseWriter::new(&config.signature),
            scripts: ScriptGateway::new(&config.python_bin, &config.php_bin, config.script_mode),
        }
    }

    /// Path absoluto del recurso bajo la raíz
    ///
    /// Retorna `None` si el path intenta salir de la raíz con `..`.
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative.components().any(|c| matches!(c, Component::ParentDir)) {
            return None;
        }
        Some(self.root.join(relative))
    }

    /// Clasifica un request ya construido
    pub fn classify(&self, request: &Request) -> Route {
        let Some(content_type) = content_type_for(request.path()) else {
            return Route::Invalid("unsupported content type");
        };

        match (request.method(), content_type.interpreter) {
            (Method::GET, None) if request.has_args() => {
                Route::Invalid("arguments on a non-script resource")
            }
            (Method::GET, None) => match self.resolve(request.path()) {
                Some(file) => Route::StaticFile {
                    file,
                    content_type: content_type.mime,
                },
                None => Route::Invalid("path escapes the server root"),
            },
            (Method::GET | Method::POST, Some(interpreter)) => match self.resolve(request.path()) {
                Some(script) => Route::Script { script, interpreter },
                None => Route::Invalid("path escapes the server root"),
            },
            (Method::OPTIONS, _) => Route::Options,
            _ => Route::Invalid("unsupported method for this resource"),
        }
    }

    /// Lee un request de la conexión, lo responde y decide si seguir
    ///
    /// Cualquier error queda contenido en esta conexión: se intenta enviar la
    /// respuesta de error que corresponda y se cierra.
    pub fn process_request<S: Read + Write>(&self, stream: &mut S) -> Exchange {
        let raw = match read_request(stream) {
            Ok(ReadOutcome::Complete(raw)) => raw,
            Ok(ReadOutcome::PeerClosed) => {
                debug!("el cliente cerró la conexión");
                return Exchange::closed(None);
            }
            Err(e) => {
                let status = e.status();
                match status {
                    Some(status) => {
                        warn!(error = %e, status = status.as_u16(), "request ilegible");
                        self.writer.send_error(stream, 1, status);
                    }
                    None => debug!(error = %e, "conexión cortada a mitad de request"),
                }
                return Exchange::closed(status);
            }
        };

        let minor_version = raw.head.minor_version;
        let request = match Request::from_raw(raw) {
            Ok(request) => request,
            Err(e) => {
                let status = e.status();
                warn!(error = %e, status = status.as_u16(), "request inválido");
                self.writer.send_error(stream, minor_version, status);
                return Exchange::closed(Some(status));
            }
        };

        let status = self.respond(stream, &request);
        log_request(&request, status);

        Exchange {
            status: Some(status),
            state: if request.keep_alive() {
                ConnectionState::Open
            } else {
                ConnectionState::Closed
            },
        }
    }

    /// Envía la única respuesta del request; retorna el status enviado
    fn respond<W: Write>(&self, stream: &mut W, request: &Request) -> StatusCode {
        let minor_version = request.http_minor_version();

        match self.classify(request) {
            Route::StaticFile { file, content_type } => {
                self.serve_static(stream, minor_version, &file, content_type)
            }
            Route::Script { script, interpreter } => {
                self.serve_script(stream, minor_version, &script, interpreter, request.args())
            }
            Route::Options => {
                self.writer.send_options(stream, minor_version);
                StatusCode::Ok
            }
            Route::Invalid(reason) => {
                debug!(reason, method = request.method().as_str(), path = request.path(), "400");
                self.writer.send_error(stream, minor_version, StatusCode::BadRequest);
                StatusCode::BadRequest
            }
        }
    }

    fn serve_static<W: Write>(
        &self,
        stream: &mut W,
        minor_version: u8,
        path: &Path,
        content_type: &str,
    ) -> StatusCode {
        let opened = File::open(path).and_then(|file| {
            let metadata = file.metadata()?;
            Ok((file, metadata))
        });

        let status = match opened {
            Ok((mut file, metadata)) if metadata.is_file() => {
                let modified = metadata.modified().unwrap_or_else(|_| SystemTime::now());
                self.writer
                    .send_file(stream, minor_version, content_type, &mut file, metadata.len(), modified);
                return StatusCode::Ok;
            }
            Ok(_) => StatusCode::BadRequest,
            Err(e) if e.kind() == io::ErrorKind::NotFound => StatusCode::NotFound,
            Err(e) => {
                warn!(error = %e, file = %path.display(), "no se pudo abrir el archivo");
                StatusCode::BadRequest
            }
        };

        self.writer.send_error(stream, minor_version, status);
        status
    }

    fn serve_script<W: Write>(
        &self,
        stream: &mut W,
        minor_version: u8,
        script: &Path,
        interpreter: Interpreter,
        args: &str,
    ) -> StatusCode {
        let modified = match fs::metadata(script) {
            Ok(metadata) if metadata.is_file() => metadata.modified().unwrap_or_else(|_| SystemTime::now()),
            _ => {
                self.writer.send_error(stream, minor_version, StatusCode::BadRequest);
                return StatusCode::BadRequest;
            }
        };

        match self.scripts.run(interpreter, script, args) {
            Ok(output) => {
                self.writer.send_script(stream, minor_version, &output, modified);
                StatusCode::Ok
            }
            Err(e) => {
                error!(error = %e, script = %script.display(), "fallo al ejecutar el script");
                self.writer
                    .send_error(stream, minor_version, StatusCode::InternalServerError);
                StatusCode::InternalServerError
            }
        }
    }
}

/// Registra el request atendido; el nivel depende de la clase del status
fn log_request(request: &Request, status: StatusCode) {
    let method = request.method().as_str();
    let path = request.path();
    let code = status.as_u16();

    if status.is_server_error() {
        error!(method, path, status = code, "request atendido");
    } else if status.is_client_error() {
        warn!(method, path, status = code, "request atendido");
    } else {
        info!(method, path, status = code, keep_alive = request.keep_alive(), "request atendido");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::wire::HEAD_BUFFER_SIZE;
    use crate::script::InvocationMode;
    use std::io::Cursor;
    use tempfile::TempDir;

    /// Conexión en memoria: lo que el cliente envía y lo que recibe
    struct MockStream {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
        /// Agotada la entrada, `read` falla (socket sin actividad) en vez de dar EOF
        idle: bool,
    }

    impl MockStream {
        fn new(input: &[u8]) -> Self {
            Self {
                input: Cursor::new(input.to_vec()),
                output: Vec::new(),
                idle: false,
            }
        }

        fn idle(input: &[u8]) -> Self {
            Self {
                idle: true,
                ..Self::new(input)
            }
        }

        fn response(&self) -> String {
            String::from_utf8_lossy(&self.output).into_owned()
        }
    }

    impl Read for MockStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.input.read(buf)? {
                0 if self.idle => Err(io::Error::new(io::ErrorKind::TimedOut, "no data")),
                n => Ok(n),
            }
        }
    }

    impl Write for MockStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn setup() -> (TempDir, Dispatcher) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "hello\nworld").unwrap();
        fs::write(dir.path().join("calc.py"), "echo \"args: $*\"\n").unwrap();
        fs::create_dir(dir.path().join("dir.html")).unwrap();

        let config = ServerConfiguration {
            root_dir: dir.path().to_path_buf(),
            signature: "test-server".to_string(),
            python_bin: "sh".to_string(),
            php_bin: "sh".to_string(),
            script_mode: InvocationMode::Argv,
            ..ServerConfiguration::default()
        };
        (dir, Dispatcher::new(&config))
    }

    fn exchange(dispatcher: &Dispatcher, raw: &[u8]) -> (ConnectionState, String) {
        let mut stream = MockStream::new(raw);
        let exchange = dispatcher.process_request(&mut stream);
        (exchange.state, stream.response())
    }

    fn request(raw: &[u8]) -> Request {
        match read_request(&mut Cursor::new(raw.to_vec())).unwrap() {
            ReadOutcome::Complete(raw) => Request::from_raw(raw).unwrap(),
            ReadOutcome::PeerClosed => panic!("expected a request"),
        }
    }

    #[test]
    fn test_classify_routes() {
        let (dir, dispatcher) = setup();

        assert_eq!(
            dispatcher.classify(&request(b"GET /index.html HTTP/1.1\r\n\r\n")),
            Route::StaticFile {
                file: dir.path().join("index.html"),
                content_type: "text/html"
            }
        );
        assert_eq!(
            dispatcher.classify(&request(b"POST /calc.py HTTP/1.1\r\n\r\nx=1")),
            Route::Script {
                script: dir.path().join("calc.py"),
                interpreter: Interpreter::Python
            }
        );
        assert_eq!(
            dispatcher.classify(&request(b"OPTIONS /index.html HTTP/1.1\r\n\r\n")),
            Route::Options
        );
    }

    #[test]
    fn test_classify_invalid() {
        let (_dir, dispatcher) = setup();

        let invalid = [
            &b"GET /archive.zip HTTP/1.1\r\n\r\n"[..],
            b"OPTIONS / HTTP/1.1\r\n\r\n",
            b"GET /index.html?x=1 HTTP/1.1\r\n\r\n",
            b"POST /index.html HTTP/1.1\r\n\r\nx=1",
            b"DELETE /index.html HTTP/1.1\r\n\r\n",
            b"GET /../etc/passwd.txt HTTP/1.1\r\n\r\n",
        ];
        for raw in invalid {
            assert!(
                matches!(dispatcher.classify(&request(raw)), Route::Invalid(_)),
                "{}",
                String::from_utf8_lossy(raw)
            );
        }
    }

    #[test]
    fn test_static_file() {
        let (_dir, dispatcher) = setup();
        let (state, response) = exchange(&dispatcher, b"GET /index.html HTTP/1.1\r\nHost: x\r\n\r\n");

        assert_eq!(state, ConnectionState::Open);
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Content-Type: text/html\r\n"));
        assert!(response.contains("Content-Length: 11\r\n"));
        assert!(response.contains("Server: test-server\r\n"));
        assert!(response.contains("Last-Modified: "));
        assert!(response.ends_with("\r\n\r\nhello\nworld"));
    }

    #[test]
    fn test_missing_file_is_404() {
        let (_dir, dispatcher) = setup();
        let (state, response) = exchange(&dispatcher, b"GET /missing.txt HTTP/1.1\r\n\r\n");

        assert_eq!(state, ConnectionState::Open);
        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(response.ends_with("<html><b>404 Not Found</b></html>"));
    }

    #[test]
    fn test_directory_is_400() {
        let (_dir, dispatcher) = setup();
        let (_, response) = exchange(&dispatcher, b"GET /dir.html HTTP/1.1\r\n\r\n");
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[test]
    fn test_status_echoes_http_1_0() {
        let (_dir, dispatcher) = setup();
        let (_, response) = exchange(&dispatcher, b"GET /missing.txt HTTP/1.0\r\n\r\n");
        assert!(response.starts_with("HTTP/1.0 404 Not Found\r\n"));
    }

    #[test]
    fn test_options() {
        let (_dir, dispatcher) = setup();
        let (state, response) = exchange(&dispatcher, b"OPTIONS /missing.txt HTTP/1.1\r\n\r\n");

        assert_eq!(state, ConnectionState::Open);
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Allow: GET, POST, OPTIONS\r\n"));
        assert!(response.contains("Content-Length: 0\r\n"));
    }

    #[cfg(unix)]
    #[test]
    fn test_script_post_with_query() {
        let (_dir, dispatcher) = setup();
        let (state, response) = exchange(
            &dispatcher,
            b"POST /calc.py?x=1 HTTP/1.1\r\nContent-Length:3\r\n\r\nfoo",
        );

        assert_eq!(state, ConnectionState::Open);
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Content-Type: text/html\r\n"));
        assert!(response.contains("Content-Length: 14\r\n"));
        assert!(response.ends_with("\r\n\r\nargs: foo x=1\n"));
    }

    #[cfg(unix)]
    #[test]
    fn test_script_body_is_what_arrived_with_the_head() {
        let (_dir, dispatcher) = setup();

        // Se declaran 10 bytes pero llegan 3 y el cliente queda a la espera
        let mut stream = MockStream::idle(b"POST /calc.py HTTP/1.1\r\nContent-Length: 10\r\n\r\nfoo");
        let outcome = dispatcher.process_request(&mut stream);

        assert_eq!(outcome.status, Some(StatusCode::Ok));
        assert!(stream.response().ends_with("\r\n\r\nargs: foo\n"));

        // Content-Length menor que lo recibido: se usa todo lo recibido
        let (_, response) = exchange(
            &dispatcher,
            b"POST /calc.py HTTP/1.1\r\nContent-Length: 3\r\n\r\nfoobar",
        );
        assert!(response.ends_with("\r\n\r\nargs: foobar\n"));
    }

    #[test]
    fn test_oversized_head_is_500_on_http_1_1() {
        let (_dir, dispatcher) = setup();
        let mut raw = b"GET /index.html HTTP/1.0\r\nX-Big: ".to_vec();
        raw.resize(HEAD_BUFFER_SIZE + 100, b'a');

        let mut stream = MockStream::new(&raw);
        let exchange = dispatcher.process_request(&mut stream);

        assert_eq!(exchange, Exchange::closed(Some(StatusCode::InternalServerError)));
        let response = stream.response();
        assert!(response.starts_with("HTTP/1.1 500 Server Error\r\n"));
        assert!(response.ends_with("<html><b>500 internal server error</b></html>"));
    }

    #[test]
    fn test_read_error_is_500() {
        let (_dir, dispatcher) = setup();
        let mut stream = MockStream::idle(b"");
        let exchange = dispatcher.process_request(&mut stream);

        assert_eq!(exchange, Exchange::closed(Some(StatusCode::InternalServerError)));
        assert!(stream.response().starts_with("HTTP/1.1 500 Server Error\r\n"));
    }

    #[test]
    fn test_missing_script_is_400() {
        let (_dir, dispatcher) = setup();
        let (_, response) = exchange(&dispatcher, b"GET /nope.php?x=1 HTTP/1.1\r\n\r\n");
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[test]
    fn test_script_failure_is_500() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("calc.py"), "print('hi')").unwrap();
        let config = ServerConfiguration {
            root_dir: dir.path().to_path_buf(),
            python_bin: "/nonexistent/python".to_string(),
            ..ServerConfiguration::default()
        };
        let dispatcher = Dispatcher::new(&config);

        let (state, response) = exchange(&dispatcher, b"GET /calc.py?x=1 HTTP/1.1\r\n\r\n");

        assert_eq!(state, ConnectionState::Open);
        assert!(response.starts_with("HTTP/1.1 500 Server Error\r\n"));
    }

    #[test]
    fn test_connection_close() {
        let (_dir, dispatcher) = setup();
        let (state, response) =
            exchange(&dispatcher, b"GET /index.html HTTP/1.1\r\nConnection: Close\r\n\r\n");

        assert_eq!(state, ConnectionState::Closed);
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    }

    #[test]
    fn test_peer_closed() {
        let (_dir, dispatcher) = setup();
        let mut stream = MockStream::new(b"");
        let exchange = dispatcher.process_request(&mut stream);

        assert_eq!(exchange, Exchange::closed(None));
        assert!(stream.output.is_empty());
    }

    #[test]
    fn test_malformed_request_closes() {
        let (_dir, dispatcher) = setup();
        let (state, response) = exchange(&dispatcher, b"\x00\x01\x02garbage\r\n\r\n");

        assert_eq!(state, ConnectionState::Closed);
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[test]
    fn test_empty_post_closes_with_400() {
        let (_dir, dispatcher) = setup();
        let (state, response) = exchange(&dispatcher, b"POST /calc.py HTTP/1.0\r\n\r\n");

        assert_eq!(state, ConnectionState::Closed);
        assert!(response.starts_with("HTTP/1.0 400 Bad Request\r\n"));
    }

    #[test]
    fn test_resolve_rejects_parent_dir() {
        let (dir, dispatcher) = setup();
        assert_eq!(dispatcher.resolve("/a/b.txt"), Some(dir.path().join("a/b.txt")));
        assert_eq!(dispatcher.resolve("/a/../../b.txt"), None);
    }
}
