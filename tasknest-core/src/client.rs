//! Client-side glue for API consumers: readiness polling before first use,
//! and in-flight deduplication of idempotent reads.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{CoreError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(200);
const READY_TIMEOUT: Duration = Duration::from_secs(60);
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

/// Polls the service's `/health` endpoint until it answers 200, so callers
/// don't race the server's startup.
pub struct ApiReadyGate {
    base_url: String,
    client: reqwest::Client,
}

impl ApiReadyGate {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Resolves once `/health` returns success; polls every 200 ms with a
    /// short per-attempt timeout, giving up after 60 s.
    pub async fn wait_ready(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url.trim_end_matches('/'));
        let deadline = Instant::now() + READY_TIMEOUT;

        loop {
            match self
                .client
                .get(&url)
                .timeout(ATTEMPT_TIMEOUT)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    debug!(status = %response.status(), "health probe not ready");
                }
                Err(e) => {
                    debug!(error = %e, "health probe failed");
                }
            }

            if Instant::now() >= deadline {
                return Err(CoreError::Internal(format!(
                    "API at {} not ready within {}s",
                    self.base_url,
                    READY_TIMEOUT.as_secs()
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

/// Body-agnostic snapshot of an HTTP response, cheap to clone across the
/// callers sharing one in-flight request.
#[derive(Debug, Clone)]
pub struct CoalescedResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

type RequestKey = (String, String, Option<Vec<u8>>);
type InflightFuture = Shared<BoxFuture<'static, std::result::Result<CoalescedResponse, Arc<CoreError>>>>;

/// Deduplicates concurrent identical requests: callers issuing the same
/// (method, URL, body) while one is in flight share its response. The map
/// entry is removed once the underlying response settles, so later calls
/// issue a fresh request.
#[derive(Clone, Default)]
pub struct RequestCoalescer {
    client: reqwest::Client,
    inflight: Arc<Mutex<HashMap<RequestKey, InflightFuture>>>,
}

impl RequestCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coalesced GET; the common case for idempotent reads.
    pub async fn get(&self, url: &str) -> Result<CoalescedResponse> {
        self.request(reqwest::Method::GET, url, None).await
    }

    pub async fn request(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<CoalescedResponse> {
        let key: RequestKey = (method.to_string(), url.to_string(), body.clone());

        let future = {
            let mut inflight = self.inflight.lock().await;
            if let Some(existing) = inflight.get(&key) {
                existing.clone()
            } else {
                let client = self.client.clone();
                let method = method.clone();
                let url = url.to_string();
                let future: InflightFuture = async move {
                    let mut builder = client.request(method, url.as_str());
                    if let Some(bytes) = body {
                        builder = builder.body(bytes);
                    }
                    let response = builder
                        .send()
                        .await
                        .map_err(|e| Arc::new(CoreError::Internal(format!("request failed: {e}"))))?;
                    let status = response.status().as_u16();
                    let bytes = response
                        .bytes()
                        .await
                        .map_err(|e| Arc::new(CoreError::Internal(format!("read failed: {e}"))))?;
                    Ok(CoalescedResponse {
                        status,
                        body: bytes.to_vec(),
                    })
                }
                .boxed()
                .shared();
                inflight.insert(key.clone(), future.clone());
                future
            }
        };

        let result = future.clone().await;

        // First settler wins the cleanup; ptr_eq guards against evicting a
        // newer in-flight request under the same key.
        {
            let mut inflight = self.inflight.lock().await;
            if let Some(existing) = inflight.get(&key) {
                if existing.ptr_eq(&future) {
                    inflight.remove(&key);
                }
            }
        }

        result.map_err(|e| CoreError::Internal(e.to_string()))
    }
}
