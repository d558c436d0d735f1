use std::time::{Duration, Instant};

use reqwest::redirect::Policy;
use tokio::time::timeout;
use tracing::debug;

use super::types::ProbeResult;
use crate::config::ChecksConfig;
use crate::database::Monitor;

/// Hard deadline for a single probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(15_000);

pub const DEFAULT_MAX_REDIRECTS: usize = 10;

pub const DEFAULT_USER_AGENT: &str = concat!("upwatch/", env!("CARGO_PKG_VERSION"));

/// Probes one monitor.
///
/// Implementations never fail: every error ends up inside the returned
/// [`ProbeResult`], so one unreachable endpoint cannot abort a cycle.
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, monitor: &Monitor) -> ProbeResult;
}

/// HTTP/HTTPS prober issuing a single GET that follows redirects
pub struct HttpProber {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Self::with_options(timeout, DEFAULT_MAX_REDIRECTS, DEFAULT_USER_AGENT)
    }

    pub fn from_config(config: &ChecksConfig) -> Result<Self, reqwest::Error> {
        Self::with_options(config.timeout(), config.max_redirects, &config.user_agent)
    }

    pub fn with_options(
        timeout: Duration,
        max_redirects: usize,
        user_agent: &str,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(Policy::limited(max_redirects))
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn probe(&self, monitor: &Monitor) -> ProbeResult {
        let start = Instant::now();

        // Dropping the send future on expiry aborts the in-flight connection.
        let outcome = timeout(self.timeout, self.client.get(&monitor.url).send()).await;

        let elapsed = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(response)) => ProbeResult::response(response.status().as_u16(), elapsed),
            Ok(Err(error)) => {
                let message = format!("{:#}", anyhow::Error::new(error));
                debug!(monitor_id = %monitor.id, url = %monitor.url, "Probe failed: {message}");
                ProbeResult::failure(message, elapsed)
            }
            Err(_) => {
                debug!(monitor_id = %monitor.id, url = %monitor.url, "Probe timed out");
                ProbeResult::failure(
                    format!("Request timed out after {} ms", self.timeout.as_millis()),
                    elapsed,
                )
            }
        }
    }
}
