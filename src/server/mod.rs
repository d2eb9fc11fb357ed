//! # Módulo del Servidor
//! src/server/mod.rs
//!
//! - `tcp`: socket de escucha y loop de cada worker
//! - `pool`: contadores por worker

pub mod pool;
pub mod tcp;

pub use pool::{WorkerSlot, WorkerStats, WorkerTable};
pub use tcp::{Server, ServerError};
