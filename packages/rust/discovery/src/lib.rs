//! Trending-topic discovery and research gathering.
//!
//! Discovery scrapes a blog listing page for post titles. It never fails past
//! its boundary: transport errors, non-2xx responses and unreadable bodies
//! all become [`DiscoveryResult::Unavailable`], and the caller decides what
//! to do with an empty result.

mod parser;
mod research;

use blogwright_shared::{BlogwrightError, DiscoveryConfig, Result, Topic};
use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub use parser::TitleSelector;
pub use research::gather_information;

/// Maximum number of redirects to follow when fetching the listing.
const MAX_REDIRECTS: usize = 5;

/// Default cap on the listing body, declared or streamed (10 MB).
pub const MAX_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

// ---------------------------------------------------------------------------
// DiscoveryResult
// ---------------------------------------------------------------------------

/// Outcome of a discovery attempt.
#[derive(Debug, Clone)]
pub enum DiscoveryResult {
    /// At least one title was extracted.
    Found {
        /// Titles in document order.
        topics: Vec<Topic>,
        /// Selector that matched.
        selector: TitleSelector,
    },
    /// The page was fetched but neither selector matched.
    NoTitles,
    /// The page could not be fetched.
    Unavailable {
        /// Transport or HTTP error, for logging.
        reason: String,
    },
}

impl DiscoveryResult {
    /// Discovered topics, empty unless `Found`.
    pub fn into_topics(self) -> Vec<Topic> {
        match self {
            Self::Found { topics, .. } => topics,
            Self::NoTitles | Self::Unavailable { .. } => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Discovery options
// ---------------------------------------------------------------------------

/// Configuration for the discovery process.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Listing page to scrape.
    pub source_url: String,
    /// Timeout for the HTTP request in seconds.
    pub timeout_secs: u64,
    /// User-Agent header value.
    pub user_agent: String,
    /// Largest body accepted, whether or not `Content-Length` is sent.
    pub max_response_bytes: u64,
}

impl From<&DiscoveryConfig> for DiscoveryOptions {
    fn from(config: &DiscoveryConfig) -> Self {
        Self {
            source_url: config.source_url.clone(),
            timeout_secs: config.timeout_secs,
            user_agent: config.user_agent.clone(),
            max_response_bytes: MAX_RESPONSE_SIZE,
        }
    }
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self::from(&DiscoveryConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Main entry points
// ---------------------------------------------------------------------------

/// Fetch the listing page and extract trending titles.
#[instrument(skip_all, fields(url = %opts.source_url))]
pub async fn discover(opts: &DiscoveryOptions) -> DiscoveryResult {
    info!("fetching trending topics");

    let body = match fetch_listing(opts).await {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "topic discovery unavailable");
            return DiscoveryResult::Unavailable {
                reason: e.to_string(),
            };
        }
    };

    match parser::extract_titles(&body) {
        Some((topics, selector)) => {
            info!(
                count = topics.len(),
                selector = selector.css(),
                "trending topics found"
            );
            DiscoveryResult::Found { topics, selector }
        }
        None => {
            info!("no trending topics on page");
            DiscoveryResult::NoTitles
        }
    }
}

/// Discover topics, collapsing every non-`Found` outcome to an empty list.
pub async fn discover_topics(opts: &DiscoveryOptions) -> Vec<Topic> {
    discover(opts).await.into_topics()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a reqwest client with appropriate settings.
fn build_client(opts: &DiscoveryOptions) -> Result<Client> {
    Client::builder()
        .user_agent(opts.user_agent.as_str())
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(std::time::Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| BlogwrightError::Network(format!("failed to build HTTP client: {e}")))
}

/// GET the listing page and return its body.
async fn fetch_listing(opts: &DiscoveryOptions) -> Result<String> {
    let url = Url::parse(&opts.source_url).map_err(|e| {
        BlogwrightError::validation(format!("invalid source URL '{}': {e}", opts.source_url))
    })?;

    let client = build_client(opts)?;

    let mut response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| BlogwrightError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(BlogwrightError::Network(format!("{url}: HTTP {status}")));
    }

    let max = opts.max_response_bytes;
    if let Some(len) = response.content_length() {
        if len > max {
            return Err(BlogwrightError::validation(format!(
                "{url}: response too large ({len} bytes, max {max})"
            )));
        }
    }

    // Chunked responses carry no length, so the cap is enforced while reading.
    let mut bytes = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| BlogwrightError::Network(format!("{url}: failed to read body: {e}")))?
    {
        if (bytes.len() + chunk.len()) as u64 > max {
            return Err(BlogwrightError::validation(format!(
                "{url}: response too large (over {max} bytes while streaming)"
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    let body = String::from_utf8_lossy(&bytes).into_owned();

    debug!(bytes = body.len(), "listing page fetched");
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    fn opts_for(server: &wiremock::MockServer) -> DiscoveryOptions {
        DiscoveryOptions {
            source_url: format!("{}/business/talent/blog", server.uri()),
            timeout_secs: 2,
            ..DiscoveryOptions::default()
        }
    }

    #[test]
    fn options_from_config() {
        let opts = DiscoveryOptions::default();
        assert_eq!(opts.timeout_secs, 10);
        assert!(opts.user_agent.starts_with("Mozilla/5.0"));
        assert!(opts.source_url.contains("talent/blog"));
    }

    #[tokio::test]
    async fn test_discover_primary_titles() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/business/talent/blog"))
            .and(wiremock::matchers::header("user-agent", "Mozilla/5.0 (X11; Linux x86_64)"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_string(fixture("talent-blog.html")),
            )
            .mount(&server)
            .await;

        let opts = DiscoveryOptions {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64)".into(),
            ..opts_for(&server)
        };
        match discover(&opts).await {
            DiscoveryResult::Found { topics, selector } => {
                assert_eq!(selector, TitleSelector::Primary);
                assert_eq!(topics[0].as_str(), "Skills-Based Hiring");
                assert_eq!(topics.len(), 3);
            }
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_discover_fallback_titles() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string(fixture("talent-blog-links.html")),
            )
            .mount(&server)
            .await;

        let topics = discover_topics(&opts_for(&server)).await;
        assert_eq!(
            topics,
            vec![Topic::new("Internal Mobility"), Topic::new("The Four-Day Week")]
        );
    }

    #[tokio::test]
    async fn test_discover_no_titles() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_string(fixture("no-titles.html")),
            )
            .mount(&server)
            .await;

        let result = discover(&opts_for(&server)).await;
        assert!(matches!(result, DiscoveryResult::NoTitles));
    }

    #[tokio::test]
    async fn test_discover_http_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(403))
            .mount(&server)
            .await;

        match discover(&opts_for(&server)).await {
            DiscoveryResult::Unavailable { reason } => assert!(reason.contains("HTTP")),
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_discover_timeout() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string(fixture("talent-blog.html"))
                    .set_delay(std::time::Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let opts = DiscoveryOptions {
            timeout_secs: 1,
            ..opts_for(&server)
        };
        let result = discover(&opts).await;
        assert!(matches!(result, DiscoveryResult::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_discover_invalid_url() {
        let opts = DiscoveryOptions {
            source_url: "not a url".into(),
            ..DiscoveryOptions::default()
        };
        assert!(discover_topics(&opts).await.is_empty());
    }

    #[tokio::test]
    async fn test_discover_declared_length_over_cap() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_string(fixture("talent-blog.html")),
            )
            .mount(&server)
            .await;

        let opts = DiscoveryOptions {
            max_response_bytes: 64,
            ..opts_for(&server)
        };
        match discover(&opts).await {
            DiscoveryResult::Unavailable { reason } => assert!(reason.contains("too large")),
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    /// Serve one chunked response with no `Content-Length` header.
    async fn serve_chunked(chunks: Vec<String>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;

            let mut response =
                String::from("HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nTransfer-Encoding: chunked\r\n\r\n");
            for chunk in &chunks {
                response.push_str(&format!("{:x}\r\n{chunk}\r\n", chunk.len()));
            }
            response.push_str("0\r\n\r\n");
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });

        format!("http://{addr}/business/talent/blog")
    }

    #[tokio::test]
    async fn test_discover_chunked_body_over_cap() {
        let chunk = format!("<p>{}</p>", "x".repeat(1000));
        let source_url = serve_chunked(vec![chunk; 8]).await;

        let opts = DiscoveryOptions {
            source_url,
            timeout_secs: 2,
            max_response_bytes: 4096,
            ..DiscoveryOptions::default()
        };
        match discover(&opts).await {
            DiscoveryResult::Unavailable { reason } => {
                assert!(reason.contains("while streaming"), "reason: {reason}")
            }
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_discover_chunked_body_under_cap() {
        let source_url = serve_chunked(vec![
            r#"<h2 class="blog-post__title">Skills-Based "#.to_string(),
            "Hiring</h2>".to_string(),
        ])
        .await;

        let opts = DiscoveryOptions {
            source_url,
            timeout_secs: 2,
            ..DiscoveryOptions::default()
        };
        let topics = discover_topics(&opts).await;
        assert_eq!(topics, vec![Topic::new("Skills-Based Hiring")]);
    }
}
