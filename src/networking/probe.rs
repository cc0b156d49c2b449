use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, Url};
use tokio::net::TcpStream;
use tokio::time::timeout;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP reachability probe with a TCP connect fallback.
#[derive(Clone)]
pub struct ReachabilityProbe {
    client: Client,
}

impl ReachabilityProbe {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn is_reachable(&self, url: &str) -> bool {
        if self.http_probe(url).await {
            return true;
        }

        // HEAD/GET may be blocked while the host is still up.
        match host_and_port(url) {
            Some((host, port)) => tcp_probe(&host, port).await,
            None => {
                warn!("probe: {url} is not a valid URL");
                false
            }
        }
    }

    async fn http_probe(&self, url: &str) -> bool {
        debug!("probe: HTTP {url}");
        let head_ok = self
            .client
            .head(url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .is_ok();
        if head_ok {
            return true;
        }

        let ok = self
            .client
            .get(url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .is_ok();
        if !ok {
            warn!("probe: {url} HTTP probe failed");
        }
        ok
    }
}

fn host_and_port(url: &str) -> Option<(String, u16)> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_owned();
    let port = parsed.port_or_known_default()?;
    Some((host, port))
}

async fn tcp_probe(host: &str, port: u16) -> bool {
    debug!("probe: TCP {host}:{port}");
    matches!(
        timeout(PROBE_TIMEOUT, TcpStream::connect((host, port))).await,
        Ok(Ok(_))
    )
}
