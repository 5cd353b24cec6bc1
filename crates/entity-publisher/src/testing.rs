use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{HeaderMap, Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use tokio::net::TcpListener;
use url::Url;

use crate::config::{Compression, HttpConfig};
use crate::entity::{Batch, Entity};
use crate::transport::{Transport, TransportError};

pub const FAILURE_CAUSE: &str = "ActualException";

/// Records every batch it accepts. Optionally sleeps after recording, to keep
/// the dispatcher busy while the test enqueues more work, and can be switched
/// into failing mode at any time.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    published: Arc<Mutex<Vec<Batch>>>,
    fail: Arc<AtomicBool>,
    delay: Option<Duration>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn published_ids(&self) -> Vec<Vec<String>> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|b| b.ids().map(str::to_owned).collect())
            .collect()
    }
}

impl Transport for RecordingTransport {
    async fn send(&self, batch: &Batch) -> Result<(), TransportError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable(FAILURE_CAUSE.into()));
        }
        self.published.lock().unwrap().push(batch.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

pub struct FailingTransport;

impl Transport for FailingTransport {
    async fn send(&self, _batch: &Batch) -> Result<(), TransportError> {
        Err(TransportError::Rejected {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        })
    }
}

/// Never completes. Used to observe a client while a send is in flight.
pub struct StalledTransport;

impl Transport for StalledTransport {
    async fn send(&self, _batch: &Batch) -> Result<(), TransportError> {
        std::future::pending().await
    }
}

pub fn entity(id: &str) -> Entity {
    Entity::new(id, "testEntity")
}

pub struct CapturedRequest {
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Serve a collector on an OS-assigned port that answers every request with
/// `status` and keeps what it received.
pub async fn spawn_collector(status: StatusCode) -> (Url, Arc<Mutex<Vec<CapturedRequest>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let captured = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&captured);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let sink = Arc::clone(&sink);
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let sink = Arc::clone(&sink);
                    async move {
                        let headers = req.headers().clone();
                        let body = req
                            .collect()
                            .await
                            .map(|c| c.to_bytes())
                            .unwrap_or_default();
                        sink.lock().unwrap().push(CapturedRequest { headers, body });
                        Ok::<_, Infallible>(
                            Response::builder()
                                .status(status)
                                .body(Full::<Bytes>::default())
                                .unwrap(),
                        )
                    }
                });
                let _ = Builder::new(TokioExecutor::new())
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    let endpoint = Url::parse(&format!(
        "http://127.0.0.1:{port}/ws/v2/timeline/entities"
    ))
    .unwrap();
    (endpoint, captured)
}

pub fn test_config(endpoint: Url) -> HttpConfig {
    let _ = rustls::crypto::ring::default_provider().install_default();
    HttpConfig {
        timeout: Duration::from_millis(500),
        compression: Compression::None,
        ..HttpConfig::new(endpoint)
    }
}
