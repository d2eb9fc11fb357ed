//! # Tabla de Workers
//! src/server/pool.rs
//!
//! Un slot por worker con sus contadores. Cada slot lo escribe solo su
//! worker, así que alcanza con atómicos `Relaxed` y no hay lock.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Contadores de un worker
#[derive(Debug)]
pub struct WorkerSlot {
    id: usize,
    connections: AtomicU64,
    requests: AtomicU64,
}

impl WorkerSlot {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            connections: AtomicU64::new(0),
            requests: AtomicU64::new(0),
        }
    }

    /// Una conexión aceptada por este worker
    pub fn record_connection(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Un request respondido por este worker
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> WorkerStats {
        WorkerStats {
            worker: self.id,
            connections: self.connections.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
        }
    }
}

/// Copia de los contadores de un worker en un instante
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub worker: usize,
    pub connections: u64,
    pub requests: u64,
}

impl fmt::Display for WorkerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "worker {}: {} connections, {} requests",
            self.worker, self.connections, self.requests
        )
    }
}

/// Todos los slots, indexados por id de worker
#[derive(Debug)]
pub struct WorkerTable {
    slots: Vec<WorkerSlot>,
}

impl WorkerTable {
    pub fn new(workers: usize) -> Self {
        Self {
            slots: (0..workers).map(WorkerSlot::new).collect(),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, id: usize) -> Option<&WorkerSlot> {
        self.slots.get(id)
    }

    pub fn stats(&self) -> Vec<WorkerStats> {
        self.slots.iter().map(WorkerSlot::snapshot).collect()
    }
}
