//! Batching publisher for telemetry entities.
//!
//! A [`Client`] accepts entities from any number of callers and hands them to a
//! single background dispatcher, which sends them through a [`Transport`] in
//! the order they were submitted. Async submissions queued back to back are
//! merged into batches of at most `max_merge_size` entities; a sync submission
//! is always sent on its own and its caller gets the transport's verdict.

mod client;
pub mod config;
mod dispatcher;
mod entity;
mod merge;
mod queue;
mod stats;
mod transport;

#[cfg(test)]
mod testing;

pub use client::{Client, ClientState, PublishError};
pub use config::{Compression, Config, ConfigError, HttpConfig};
pub use entity::{Batch, Entity};
pub use stats::{Stats, StatsSnapshot};
pub use transport::{HttpTransport, Transport, TransportError};
