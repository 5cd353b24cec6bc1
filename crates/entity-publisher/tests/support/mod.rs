// Each integration test compiles this module independently via `mod support;`,
// so items used by one test appear unused in others.
#![allow(unused)]

pub mod collector;

use std::sync::{Arc, Mutex};

use entity_publisher::{Batch, Transport, TransportError};

/// Keeps every batch it is handed, in order.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    batches: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MemoryTransport {
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

impl Transport for MemoryTransport {
    async fn send(&self, batch: &Batch) -> Result<(), TransportError> {
        let ids: Vec<String> = batch.ids().map(str::to_owned).collect();
        self.batches.lock().unwrap().push(ids);
        Ok(())
    }
}
