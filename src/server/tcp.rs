//! # Servidor TCP con pool de workers
//! src/server/tcp.rs
//!
//! Un número fijo de workers comparte el socket de escucha. Cada worker
//! toma el lock, acepta una conexión, suelta el lock y atiende esa conexión
//! hasta que se cierra (keep-alive incluido).
//!
//! ```text
//!            ┌─────────── Mutex<TcpListener> ───────────┐
//! worker-0 ──┤ accept → serve_connection → accept → ... │
//! worker-1 ──┤ accept → serve_connection → ...          │
//!   ...      └──────────────────────────────────────────┘
//! ```

use super::pool::{WorkerSlot, WorkerStats, WorkerTable};
use crate::config::ServerConfiguration;
use crate::dispatcher::{ConnectionState, Dispatcher};
use socket2::{Domain, Protocol, Socket, Type};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Backlog mínimo del socket de escucha
const MIN_BACKLOG: usize = 16;

/// Errores al levantar el servidor; todos son fatales
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to create the listening socket: {0}")]
    Socket(#[source] io::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to listen: {0}")]
    Listen(#[source] io::Error),

    #[error("failed to spawn worker {worker}: {source}")]
    Spawn {
        worker: usize,
        #[source]
        source: io::Error,
    },
}

/// Servidor con pool fijo de workers
pub struct Server {
    listener: Mutex<TcpListener>,
    local_addr: SocketAddr,
    dispatcher: Dispatcher,
    workers: WorkerTable,
}

impl Server {
    /// Crea el socket de escucha según la configuración
    ///
    /// El puerto `0` pide uno efímero; ver [`Server::local_addr`].
    pub fn bind(config: &ServerConfiguration) -> Result<Self, ServerError> {
        let addr = config.address();

        let socket =
            Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP)).map_err(ServerError::Socket)?;
        socket.set_reuse_address(true).map_err(ServerError::Socket)?;
        socket
            .bind(&addr.into())
            .map_err(|source| ServerError::Bind { addr, source })?;

        let backlog = config.max_workers.max(MIN_BACKLOG);
        socket
            .listen(i32::try_from(backlog).unwrap_or(i32::MAX))
            .map_err(ServerError::Listen)?;

        let listener: TcpListener = socket.into();
        let local_addr = listener.local_addr().map_err(ServerError::Listen)?;

        info!(address = %local_addr, backlog, "escuchando");

        Ok(Self {
            listener: Mutex::new(listener),
            local_addr,
            dispatcher: Dispatcher::new(config),
            workers: WorkerTable::new(config.max_workers),
        })
    }

    /// Dirección real en la que escucha
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Lanza los workers; ninguno termina mientras viva el proceso
    ///
    /// # Errores
    ///
    /// `Spawn` si el sistema no deja crear un thread.
    pub fn start(self) -> Result<Arc<Self>, ServerError> {
        let server = Arc::new(self);

        for id in 0..server.workers.worker_count() {
            let worker = Arc::clone(&server);
            thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn(move || worker.worker_loop(id))
                .map_err(|source| ServerError::Spawn { worker: id, source })?;
        }

        info!(workers = server.workers.worker_count(), "workers iniciados");
        Ok(server)
    }

    /// Contadores actuales de cada worker
    pub fn worker_stats(&self) -> Vec<WorkerStats> {
        self.workers.stats()
    }

    fn worker_loop(&self, id: usize) {
        let Some(slot) = self.workers.slot(id) else {
            return;
        };

        loop {
            match self.accept() {
                Ok((mut stream, peer)) => {
                    slot.record_connection();
                    debug!(%peer, "conexión aceptada");
                    self.serve_connection(&mut stream, slot);
                    debug!(%peer, "conexión cerrada");
                }
                Err(e) => warn!(error = %e, "fallo en accept"),
            }
        }
    }

    /// Solo un worker a la vez espera en `accept`
    fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        let listener = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        listener.accept()
    }

    /// Atiende requests en la conexión hasta que haya que cerrarla
    fn serve_connection<S: Read + Write>(&self, stream: &mut S, slot: &WorkerSlot) {
        loop {
            let exchange = self.dispatcher.process_request(stream);
            if exchange.status.is_some() {
                slot.record_request();
            }
            if exchange.state == ConnectionState::Closed {
                break;
            }
        }
    }
}
