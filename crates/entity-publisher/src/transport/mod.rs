use std::future::Future;

use thiserror::Error;

use crate::entity::Batch;

mod http;

pub use http::HttpTransport;

/// Delivers one batch to the collector. The dispatcher awaits each call before
/// issuing the next, so implementations never see concurrent sends from the
/// same client.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, batch: &Batch) -> impl Future<Output = Result<(), TransportError>> + Send;
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("collector rejected entities: {status}")]
    Rejected { status: reqwest::StatusCode },

    #[error("failed to encode entities: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("gzip compression failed: {0}")]
    Compression(#[from] std::io::Error),

    #[error("{0}")]
    Unavailable(String),
}
