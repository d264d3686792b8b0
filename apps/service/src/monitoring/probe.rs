use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, lookup_host};
use tokio::time::{sleep, timeout};
use url::Url;

use super::jitter::jitter;
use super::types::{AttemptTiming, ProbeReading};
use super::validation::validate_endpoint;
use crate::error::ProbeError;

const USER_AGENT: &str = concat!("webpulse/", env!("CARGO_PKG_VERSION"));

/// Fetch behavior of one probe. All values come from the configuration
/// layer; the executor holds no defaults of its own.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Sequential fetch attempts per probe.
    pub attempts: u32,
    /// Bound on each individual attempt.
    pub timeout: Duration,
    /// Pause after every attempt, including failed ones.
    pub delay: Duration,
}

/// Executes timed fetches against one endpoint at a time.
pub struct ProbeExecutor {
    tls: tokio_native_tls::TlsConnector,
    config: ProbeConfig,
}

trait ProbeStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> ProbeStream for T {}

/// Connection coordinates extracted from a validated endpoint URL.
struct ProbeTarget {
    https: bool,
    host: String,
    port: u16,
    host_header: String,
    request_path: String,
}

impl ProbeTarget {
    fn parse(endpoint: &str) -> Result<Self> {
        let url = Url::parse(endpoint)?;
        let host = url.host_str().ok_or_else(|| anyhow!("endpoint has no host"))?.to_string();
        let port = url.port_or_known_default().ok_or_else(|| anyhow!("endpoint has no port"))?;

        let host_header = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.clone(),
        };
        let request_path = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        Ok(Self { https: url.scheme() == "https", host, port, host_header, request_path })
    }
}

impl ProbeExecutor {
    pub fn new(config: ProbeConfig) -> Result<Self, ProbeError> {
        let connector = native_tls::TlsConnector::new()?;
        Ok(Self { tls: tokio_native_tls::TlsConnector::from(connector), config })
    }

    /// Run the configured number of timed fetches against `endpoint`.
    ///
    /// Invalid endpoints are rejected before any attempt. Attempts that fail
    /// at the transport level are logged and skipped; the remaining attempts
    /// still run, each followed by the configured delay. If every attempt
    /// failed, the reading comes back all-zero so the caller still has a
    /// record to persist for the endpoint.
    pub async fn probe(&self, endpoint: &str) -> Result<ProbeReading, ProbeError> {
        let validation = validate_endpoint(endpoint);
        if !validation.is_valid {
            return Err(ProbeError::InvalidEndpoint(format!(
                "{endpoint}: {}",
                validation.reason()
            )));
        }

        let target = ProbeTarget::parse(endpoint)
            .map_err(|e| ProbeError::InvalidEndpoint(format!("{endpoint}: {e}")))?;

        let mut samples: Vec<AttemptTiming> = Vec::with_capacity(self.config.attempts as usize);

        for attempt in 1..=self.config.attempts {
            match timeout(self.config.timeout, self.fetch_attempt(&target)).await {
                Ok(Ok(timing)) => {
                    tracing::debug!(
                        url = endpoint,
                        attempt,
                        time_total = timing.time_total,
                        "attempt complete"
                    );
                    samples.push(timing);
                }
                Ok(Err(e)) => {
                    tracing::warn!(url = endpoint, attempt, "attempt failed: {e:#}");
                }
                Err(_) => {
                    tracing::warn!(
                        url = endpoint,
                        attempt,
                        timeout_secs = self.config.timeout.as_secs(),
                        "attempt timed out"
                    );
                }
            }

            sleep(self.config.delay).await;
        }

        let totals: Vec<f64> = samples.iter().map(|s| s.time_total).collect();
        let jitter = jitter(&totals);

        match samples.pop() {
            Some(last) => Ok(ProbeReading { last, jitter }),
            None => {
                tracing::warn!(url = endpoint, "all attempts failed, recording zero reading");
                Ok(ProbeReading::unreachable())
            }
        }
    }

    /// One timed GET. Phase timings are cumulative from attempt start,
    /// reproducing curl's phase boundaries; the response body is drained
    /// and discarded. Redirects are not followed, so `time_redirect`
    /// stays 0.
    async fn fetch_attempt(&self, target: &ProbeTarget) -> Result<AttemptTiming> {
        let start = Instant::now();

        let mut addrs = lookup_host((target.host.as_str(), target.port))
            .await
            .map_err(|e| anyhow!("name lookup failed: {e}"))?;
        let addr =
            addrs.next().ok_or_else(|| anyhow!("no addresses resolved for {}", target.host))?;
        let time_namelookup = start.elapsed().as_secs_f64();

        let tcp =
            TcpStream::connect(addr).await.map_err(|e| anyhow!("connect to {addr} failed: {e}"))?;
        let time_connect = start.elapsed().as_secs_f64();

        let time_appconnect;
        let mut stream: Box<dyn ProbeStream> = if target.https {
            let tls = self
                .tls
                .connect(&target.host, tcp)
                .await
                .map_err(|e| anyhow!("TLS handshake with {} failed: {e}", target.host))?;
            time_appconnect = start.elapsed().as_secs_f64();
            Box::new(tls)
        } else {
            time_appconnect = 0.0;
            Box::new(tcp)
        };

        let time_pretransfer = start.elapsed().as_secs_f64();

        let request = format!(
            "GET {} HTTP/1.1\r\nHost: {}\r\nUser-Agent: {}\r\nAccept: */*\r\nConnection: close\r\n\r\n",
            target.request_path, target.host_header, USER_AGENT
        );
        stream
            .write_all(request.as_bytes())
            .await
            .map_err(|e| anyhow!("request write failed: {e}"))?;

        let mut buf = [0u8; 8192];
        let mut header = Vec::new();
        let mut headers_done = false;
        let mut body_bytes: u64 = 0;
        let mut time_starttransfer = 0.0;

        loop {
            let n = stream.read(&mut buf).await.map_err(|e| anyhow!("response read failed: {e}"))?;
            if n == 0 {
                break;
            }
            if time_starttransfer == 0.0 {
                time_starttransfer = start.elapsed().as_secs_f64();
            }
            if headers_done {
                body_bytes += n as u64;
                continue;
            }
            header.extend_from_slice(&buf[..n]);
            if let Some(body_start) = find_header_end(&header) {
                headers_done = true;
                body_bytes += (header.len() - body_start) as u64;
            }
        }

        // An HTTP error status still counts as a completed attempt; a
        // connection dropped before the headers finished does not.
        if !headers_done {
            return Err(anyhow!("connection closed before response headers completed"));
        }

        let time_total = start.elapsed().as_secs_f64();
        let speed_download = if time_total > 0.0 { body_bytes as f64 / time_total } else { 0.0 };

        Ok(AttemptTiming {
            time_namelookup,
            time_connect,
            time_appconnect,
            time_pretransfer,
            time_redirect: 0.0,
            time_starttransfer,
            time_total,
            speed_download,
            speed_upload: 0.0,
            size_download: body_bytes as f64,
        })
    }
}

/// Index of the first body byte, once `\r\n\r\n` has arrived.
fn find_header_end(bytes: &[u8]) -> Option<usize> {
    bytes.windows(4).position(|w| w == b"\r\n\r\n").map(|pos| pos + 4)
}
