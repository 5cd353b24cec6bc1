use std::io::Write;

use flate2::write::GzEncoder;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::{Transport, TransportError};
use crate::config::{Compression, HttpConfig};
use crate::entity::Batch;

/// Posts each batch as `{"entities":[...]}` to the configured collector endpoint.
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
    compression: Compression,
    headers: Vec<(String, String)>,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            compression: config.compression,
            headers: config.headers.clone(),
        })
    }

    async fn post(&self, body: Vec<u8>) -> Result<(), TransportError> {
        let body = if self.compression == Compression::Gzip {
            compress_gzip(&body)?
        } else {
            body
        };

        let mut req = self
            .client
            .post(self.endpoint.clone())
            .header("content-type", "application/json");

        if self.compression == Compression::Gzip {
            req = req.header("content-encoding", "gzip");
        }

        for (k, v) in &self.headers {
            req = req.header(k, v);
        }

        let resp = req.body(body).send().await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(TransportError::Rejected {
                status: resp.status(),
            })
        }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, batch: &Batch) -> Result<(), TransportError> {
        let body = serde_json::to_vec(batch)?;
        debug!(entities = batch.len(), bytes = body.len(), "posting entities");
        self.post(body).await
    }
}

fn compress_gzip(data: &[u8]) -> Result<Vec<u8>, std::io::Error> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(data)?;
    encoder.finish()
}
