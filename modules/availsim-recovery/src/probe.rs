//! The Health/Probe Client (C13).

use async_trait::async_trait;

use crate::error::{RecoveryError, RecoveryResult};

/// HTTP status codes treated as "the pod is serving", mirroring the
/// original health checker's accept-set: a 404 still means the process is
/// up and routing requests, just to an unmapped path.
const HEALTHY_STATUSES: [u16; 2] = [200, 404];

#[async_trait]
pub trait HealthProbeClient: Send + Sync {
    /// Returns `true` if `url` responded with a status considered healthy.
    async fn is_serving(&self, url: &str) -> RecoveryResult<bool>;
}

/// `reqwest`-backed implementation of [`HealthProbeClient`].
pub struct HttpProbeClient {
    client: reqwest::Client,
}

impl HttpProbeClient {
    pub fn new(request_timeout: std::time::Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("reqwest client builds with a fixed timeout");
        Self { client }
    }
}

#[async_trait]
impl HealthProbeClient for HttpProbeClient {
    async fn is_serving(&self, url: &str) -> RecoveryResult<bool> {
        match self.client.get(url).send().await {
            Ok(response) => Ok(HEALTHY_STATUSES.contains(&response.status().as_u16())),
            Err(source) => {
                if source.is_timeout() || source.is_connect() {
                    // Connection refused / reset / timed out: the pod isn't
                    // serving yet, not a fatal probe error.
                    Ok(false)
                } else {
                    Err(RecoveryError::ProbeFailed {
                        url: url.to_string(),
                        source,
                    })
                }
            }
        }
    }
}
