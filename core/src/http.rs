use crate::error::{AuditError, Result};
use crate::plugin::Prober;
use crate::types::ProbeOutcome;
use async_trait::async_trait;
use log::debug;
use regex::Regex;
use reqwest::header::HOST;
use reqwest::StatusCode;
use std::net::SocketAddr;
use std::time::Duration;
use url::{Host, Url};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_PORT: u16 = 80;
const NOT_FOUND_TITLE: &str = r"(?i)<title>.*not found</title>";

/// Request parameters derived from a locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub url: Url,
    pub host: String,
    pub port: u16,
    pub vhost: String,
    pub tls: bool,
}

impl ProbeTarget {
    /// Returns `None` when the locator is not a URL with a host.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut url = Url::parse(raw).ok()?;
        let host = url.host_str()?.to_string();
        let tls = url.scheme() == "https";
        let port = url.port_or_known_default().unwrap_or(DEFAULT_PORT);

        // port 80 is left out of Host, every other port is spelled out (443 included)
        let vhost = if port == DEFAULT_PORT {
            host.clone()
        } else {
            format!("{}:{}", host, port)
        };

        url.set_query(None);
        url.set_fragment(None);
        if url.path().is_empty() {
            url.set_path("/");
        }

        Some(Self {
            url,
            host,
            port,
            vhost,
            tls,
        })
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }
}

/// Network prober: DNS lookup, then a single GET without redirects.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
    timeout: Duration,
    not_found: Regex,
}

impl HttpProber {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| AuditError::HttpClient { source: e })?;

        let not_found = Regex::new(NOT_FOUND_TITLE).map_err(|e| AuditError::InvalidPattern {
            pattern: NOT_FOUND_TITLE.to_string(),
            source: e,
        })?;

        Ok(Self {
            client,
            timeout,
            not_found,
        })
    }

    /// Only IPv4 answers count.
    async fn resolve_ipv4(&self, target: &ProbeTarget) -> Option<SocketAddr> {
        let host = match target.url.host()? {
            Host::Domain(domain) => domain.to_string(),
            Host::Ipv4(ip) => ip.to_string(),
            Host::Ipv6(_) => return None,
        };

        let lookup = tokio::time::timeout(
            self.timeout,
            tokio::net::lookup_host((host.as_str(), target.port)),
        )
        .await;

        match lookup {
            Ok(Ok(mut addrs)) => addrs.find(|addr| addr.is_ipv4()),
            Ok(Err(e)) => {
                debug!("DNS lookup for {} failed: {}", host, e);
                None
            }
            Err(_) => {
                debug!("DNS lookup for {} timed out", host);
                None
            }
        }
    }

    async fn fetch(&self, target: &ProbeTarget) -> Option<(StatusCode, String)> {
        let response = match self
            .client
            .get(target.url.clone())
            .header(HOST, target.vhost.as_str())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!("GET {} failed: {}", target.url, e);
                return None;
            }
        };

        let status = response.status();
        match response.text().await {
            Ok(body) => Some((status, body)),
            Err(e) => {
                debug!("Reading body of {} failed: {}", target.url, e);
                None
            }
        }
    }

    /// Decides whether a received response counts as live content.
    pub fn classify(&self, status: StatusCode, body: &str) -> ProbeOutcome {
        if status == StatusCode::NOT_FOUND || self.not_found.is_match(body) {
            ProbeOutcome::Down
        } else {
            ProbeOutcome::Alive
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let target = match ProbeTarget::parse(url) {
            Some(target) => target,
            None => {
                debug!("Malformed locator: {}", url);
                return ProbeOutcome::Down;
            }
        };

        if self.resolve_ipv4(&target).await.is_none() {
            return ProbeOutcome::Down;
        }

        match self.fetch(&target).await {
            Some((status, body)) => self.classify(status, &body),
            None => ProbeOutcome::Down,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn http_response(status_line: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        )
    }

    /// Serves one canned response and hands back the raw request it received.
    async fn serve_once(response: String) -> (SocketAddr, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });

        (addr, handle)
    }

    #[test]
    fn test_target_defaults() {
        let target = ProbeTarget::parse("http://example.test").unwrap();
        assert_eq!(target.host, "example.test");
        assert_eq!(target.port, 80);
        assert_eq!(target.vhost, "example.test");
        assert_eq!(target.path(), "/");
        assert!(!target.tls);
    }

    #[test]
    fn test_target_vhost_includes_non_default_port() {
        let target = ProbeTarget::parse("http://example.test:8080/a").unwrap();
        assert_eq!(target.vhost, "example.test:8080");
        assert_eq!(target.path(), "/a");

        let target = ProbeTarget::parse("https://example.test/advisory").unwrap();
        assert!(target.tls);
        assert_eq!(target.port, 443);
        assert_eq!(target.vhost, "example.test:443");
    }

    #[test]
    fn test_target_drops_query_and_fragment() {
        let target = ProbeTarget::parse("http://example.test/x?id=1#top").unwrap();
        assert_eq!(target.url.as_str(), "http://example.test/x");
    }

    #[test]
    fn test_target_rejects_malformed() {
        assert!(ProbeTarget::parse("2021-1234").is_none());
        assert!(ProbeTarget::parse("http://").is_none());
        assert!(ProbeTarget::parse("").is_none());
    }

    #[test]
    fn test_classify() {
        let prober = HttpProber::new().unwrap();
        assert_eq!(prober.classify(StatusCode::OK, "<html></html>"), ProbeOutcome::Alive);
        assert_eq!(prober.classify(StatusCode::NOT_FOUND, ""), ProbeOutcome::Down);
        assert_eq!(
            prober.classify(StatusCode::OK, "<html><TITLE>Page Not Found</TITLE></html>"),
            ProbeOutcome::Down
        );
        // only 404 is treated as missing
        assert_eq!(prober.classify(StatusCode::INTERNAL_SERVER_ERROR, ""), ProbeOutcome::Alive);
        assert_eq!(
            prober.classify(StatusCode::OK, "<title>Found it</title><p>not found</p>"),
            ProbeOutcome::Alive
        );
    }

    #[tokio::test]
    async fn test_probe_alive_sends_path_and_vhost() {
        let (addr, handle) =
            serve_once(http_response("200 OK", "<title>CVE-2021-1234</title>")).await;
        let prober = HttpProber::new().unwrap();

        let url = format!("http://127.0.0.1:{}/cve/2021-1234?ref=1", addr.port());
        assert_eq!(prober.probe(&url).await, ProbeOutcome::Alive);

        let request = handle.await.unwrap();
        assert!(request.starts_with("GET /cve/2021-1234 HTTP/1.1\r\n"), "{}", request);
        assert!(
            request.to_lowercase().contains(&format!("host: 127.0.0.1:{}\r\n", addr.port())),
            "{}",
            request
        );
    }

    #[tokio::test]
    async fn test_probe_404_is_down() {
        let (addr, _handle) = serve_once(http_response("404 Not Found", "")).await;
        let prober = HttpProber::new().unwrap();

        let url = format!("http://127.0.0.1:{}/missing", addr.port());
        assert_eq!(prober.probe(&url).await, ProbeOutcome::Down);
    }

    #[tokio::test]
    async fn test_probe_not_found_title_is_down() {
        let body = "<html><head><title>Vulnerability not found</title></head></html>";
        let (addr, _handle) = serve_once(http_response("200 OK", body)).await;
        let prober = HttpProber::new().unwrap();

        let url = format!("http://127.0.0.1:{}/", addr.port());
        assert_eq!(prober.probe(&url).await, ProbeOutcome::Down);
    }

    #[tokio::test]
    async fn test_probe_redirect_is_not_followed() {
        let response = concat!(
            "HTTP/1.1 301 Moved Permanently\r\n",
            "Location: http://127.0.0.1:1/gone\r\n",
            "Content-Length: 0\r\nConnection: close\r\n\r\n"
        )
        .to_string();
        let (addr, _handle) = serve_once(response).await;
        let prober = HttpProber::new().unwrap();

        let url = format!("http://127.0.0.1:{}/old", addr.port());
        assert_eq!(prober.probe(&url).await, ProbeOutcome::Alive);
    }

    #[tokio::test]
    async fn test_probe_connection_refused_is_down() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let prober = HttpProber::new().unwrap();
        let url = format!("http://127.0.0.1:{}/", port);
        assert_eq!(prober.probe(&url).await, ProbeOutcome::Down);
    }

    #[tokio::test]
    async fn test_probe_timeout_is_down() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let prober = HttpProber::with_timeout(Duration::from_millis(200)).unwrap();
        let url = format!("http://127.0.0.1:{}/slow", addr.port());
        assert_eq!(prober.probe(&url).await, ProbeOutcome::Down);
    }

    #[tokio::test]
    async fn test_probe_malformed_and_unresolvable_are_down() {
        let prober = HttpProber::with_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(prober.probe("2021-1234").await, ProbeOutcome::Down);
        assert_eq!(prober.probe("http://[::1]/").await, ProbeOutcome::Down);
        assert_eq!(prober.probe("http://no-such-host.invalid/").await, ProbeOutcome::Down);
    }
}
