//! Downstream transport contract and the HTTP adapter
//!
//! The mapping core never performs I/O; a [`Dispatcher`] takes the finished
//! destination document and hands it to whatever system sits downstream.

use crate::cancel::CancellationSignal;
use crate::document::Document;
use crate::engine::Properties;
use crate::pipeline::behaviors::authentication::HEADERS;
use crate::{Error, Result};
use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// What the downstream system answered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReceipt {
    pub status: u16,
    pub body: String,
    /// Number of requests made, including retries
    pub attempts: u32,
}

/// Delivers a destination document downstream
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(
        &self,
        document: &Document,
        properties: &Properties,
        cancellation: &CancellationSignal,
    ) -> Result<DispatchReceipt>;
}

/// Retry policy for transient delivery failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Randomize delays to spread out retries
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Never retry
    pub fn none() -> Self {
        Self::new(0)
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff {
            current_interval: self.base_delay,
            initial_interval: self.base_delay,
            max_interval: self.max_delay,
            multiplier: self.multiplier,
            // Attempts are bounded by max_retries instead.
            max_elapsed_time: None,
            ..Default::default()
        };
        if !self.jitter {
            backoff.randomization_factor = 0.0;
        }
        backoff
    }
}

/// POSTs the rendered document to a fixed endpoint
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: reqwest::Client,
    endpoint: url::Url,
    retry: RetryPolicy,
    pretty: bool,
}

impl HttpDispatcher {
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_timeout(endpoint, Duration::from_secs(30))
    }

    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = url::Url::parse(endpoint).map_err(|e| Error::Configuration {
            message: format!("Invalid dispatch endpoint '{}'", endpoint),
            source: Some(e.into()),
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::configuration(format!(
                "Dispatch endpoint must be http or https, got '{}'",
                endpoint.scheme()
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http {
                message: format!("Failed to create HTTP client: {}", e),
                status_code: None,
                source: Some(e.into()),
            })?;
        Ok(Self {
            client,
            endpoint,
            retry: RetryPolicy::default(),
            pretty: false,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Send indented output
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }
}

/// Headers forwarded from the `headers` property object
fn forwarded_headers(properties: &Properties) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let Some(Value::Object(entries)) = properties.get(HEADERS) else {
        return headers;
    };
    for (name, value) in entries {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Null => continue,
            other => other.to_string(),
        };
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&text)) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(header = %name, "Skipping header that is not valid HTTP"),
        }
    }
    headers
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn dispatch(
        &self,
        document: &Document,
        properties: &Properties,
        cancellation: &CancellationSignal,
    ) -> Result<DispatchReceipt> {
        let body = document.render(self.pretty)?;
        let mut headers = forwarded_headers(properties);
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(document.format().content_type()),
        );

        let mut backoff = self.retry.create_backoff();
        let mut attempts = 0u32;
        loop {
            cancellation.check("dispatch")?;
            attempts += 1;
            debug!(endpoint = %self.endpoint, attempt = attempts, "Dispatching document");

            let request = self
                .client
                .post(self.endpoint.clone())
                .headers(headers.clone())
                .body(body.clone())
                .send();
            let response = tokio::select! {
                biased;
                _ = cancellation.cancelled() => return Err(Error::cancelled("dispatch")),
                response = request => response,
            };

            let (error, transient) = match response {
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    if status.is_success() {
                        return Ok(DispatchReceipt {
                            status: status.as_u16(),
                            body: text,
                            attempts,
                        });
                    }
                    let error = Error::Http {
                        message: format!("Downstream returned {}: {}", status, text),
                        status_code: Some(status.as_u16()),
                        source: None,
                    };
                    (error, is_transient_status(status))
                }
                Err(e) => {
                    let transient = e.is_timeout() || e.is_connect();
                    let error = Error::Http {
                        message: format!("Request to {} failed", self.endpoint),
                        status_code: e.status().map(|s| s.as_u16()),
                        source: Some(e.into()),
                    };
                    (error, transient)
                }
            };

            if !transient || attempts > self.retry.max_retries {
                warn!(endpoint = %self.endpoint, attempts, error = %error, "Dispatch failed, not retrying");
                return Err(error);
            }

            let delay = backoff.next_backoff().unwrap_or(self.retry.max_delay);
            warn!(endpoint = %self.endpoint, attempt = attempts, ?delay, error = %error, "Dispatch failed, retrying");
            tokio::select! {
                biased;
                _ = cancellation.cancelled() => return Err(Error::cancelled("dispatch")),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentFormat;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal HTTP/1.1 responder: answers each connection with the next
    /// scripted status and records the raw requests
    async fn serve(statuses: Vec<u16>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        tokio::spawn(async move {
            for status in statuses {
                let (mut stream, _) = listener.accept().await.unwrap();
                let request = read_request(&mut stream).await;
                seen.lock().unwrap().push(request);
                let body = "ok";
                let response = format!(
                    "HTTP/1.1 {} Scripted\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.ok();
            }
        });

        (format!("http://{}/inbound", address), requests)
    }

    async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&data).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if data.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&data).to_string()
    }

    fn fast_retries(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries)
            .with_base_delay(Duration::from_millis(5))
            .with_max_delay(Duration::from_millis(20))
            .with_jitter(false)
    }

    fn document() -> Document {
        Document::parse(DocumentFormat::Xml, "<Customer><Name>Ada</Name></Customer>").unwrap()
    }

    #[tokio::test]
    async fn test_posts_document_with_forwarded_headers() {
        let (endpoint, requests) = serve(vec![200]).await;
        let dispatcher = HttpDispatcher::new(&endpoint).unwrap();
        let mut properties = Properties::new();
        properties.insert(HEADERS.to_string(), json!({"Authorization": "Bearer abc"}));

        let receipt = dispatcher
            .dispatch(&document(), &properties, &CancellationSignal::never())
            .await
            .unwrap();
        assert_eq!(receipt, DispatchReceipt { status: 200, body: "ok".to_string(), attempts: 1 });

        let request = requests.lock().unwrap()[0].to_lowercase();
        assert!(request.starts_with("post /inbound"));
        assert!(request.contains("content-type: application/xml"));
        assert!(request.contains("authorization: bearer abc"));
        assert!(request.ends_with("<customer><name>ada</name></customer>"));
    }

    #[tokio::test]
    async fn test_retries_transient_statuses() {
        let (endpoint, requests) = serve(vec![503, 429, 201]).await;
        let dispatcher = HttpDispatcher::new(&endpoint).unwrap().with_retry(fast_retries(3));

        let receipt = dispatcher
            .dispatch(&document(), &Properties::new(), &CancellationSignal::never())
            .await
            .unwrap();
        assert_eq!(receipt.status, 201);
        assert_eq!(receipt.attempts, 3);
        assert_eq!(requests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let (endpoint, _requests) = serve(vec![400]).await;
        let dispatcher = HttpDispatcher::new(&endpoint).unwrap().with_retry(fast_retries(3));

        let err = dispatcher
            .dispatch(&document(), &Properties::new(), &CancellationSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http { status_code: Some(400), .. }));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let (endpoint, requests) = serve(vec![500, 500]).await;
        let dispatcher = HttpDispatcher::new(&endpoint).unwrap().with_retry(fast_retries(1));

        let err = dispatcher
            .dispatch(&document(), &Properties::new(), &CancellationSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http { status_code: Some(500), .. }));
        assert_eq!(requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_sending() {
        let source = crate::cancel::CancellationSource::new();
        source.cancel();
        let dispatcher = HttpDispatcher::new("http://127.0.0.1:9/never").unwrap();
        let err = dispatcher
            .dispatch(&document(), &Properties::new(), &source.signal())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_rejects_non_http_endpoints() {
        assert!(HttpDispatcher::new("ftp://example.com/x").is_err());
        assert!(HttpDispatcher::new("not a url").is_err());
    }
}
