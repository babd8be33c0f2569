use std::time::Duration;

use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use skilltrail_domain::{LlmConfig, SkillTrailError};
use tracing::debug;

use crate::errors::InfraError;

const DEFAULT_USER_AGENT: &str = concat!("skilltrail/", env!("CARGO_PKG_VERSION"));

/// HTTP client that retries transport failures and 5xx responses.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    pub fn new() -> Result<Self, SkillTrailError> {
        Self::builder().build()
    }

    /// Client tuned by the `llm` config section.
    pub fn for_llm(config: &LlmConfig) -> Result<Self, SkillTrailError> {
        Self::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .max_attempts(config.max_attempts)
            .build()
    }

    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute `builder`, retrying with exponential backoff.
    ///
    /// Non-5xx responses are returned as-is; callers interpret the status.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, SkillTrailError> {
        let attempts = self.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            let request = builder
                .try_clone()
                .ok_or_else(|| {
                    SkillTrailError::Internal("streaming request bodies cannot be retried".into())
                })?
                .build()
                .map_err(to_domain)?;
            let method = request.method().clone();
            let url = request.url().clone();

            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();
                    debug!(attempt, %method, %url, %status, "http response");
                    if status.is_server_error() && attempt < attempts {
                        self.backoff(attempt).await;
                        continue;
                    }
                    return Ok(response);
                }
                Err(err) => {
                    debug!(attempt, %method, %url, error = %err, "http request failed");
                    if attempt < attempts && is_transient(&err) {
                        last_error = Some(err);
                        self.backoff(attempt).await;
                        continue;
                    }
                    return Err(to_domain(err));
                }
            }
        }

        Err(last_error.map(to_domain).unwrap_or_else(|| {
            SkillTrailError::Internal("http client ran out of attempts".into())
        }))
    }

    fn backoff_delay(&self, attempt: usize) -> Duration {
        let shift = u32::try_from(attempt.saturating_sub(1).min(6)).unwrap_or(6);
        self.base_backoff.saturating_mul(1 << shift)
    }

    async fn backoff(&self, attempt: usize) {
        let delay = self.backoff_delay(attempt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: String,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 2,
            base_backoff: Duration::from_millis(250),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total attempts, including the first one.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    pub fn build(self) -> Result<HttpClient, SkillTrailError> {
        let client = ReqwestClient::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent)
            .no_proxy()
            .build()
            .map_err(to_domain)?;

        Ok(HttpClient {
            client,
            max_attempts: self.max_attempts,
            base_backoff: self.base_backoff,
        })
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

fn to_domain(err: reqwest::Error) -> SkillTrailError {
    InfraError::from(err).into()
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use reqwest::StatusCode;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn fast_client(attempts: usize) -> HttpClient {
        HttpClient::builder()
            .base_backoff(Duration::from_millis(5))
            .max_attempts(attempts)
            .build()
            .expect("http client")
    }

    #[tokio::test]
    async fn success_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = fast_client(3);
        let response = client.send(client.request(Method::GET, server.uri())).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn server_errors_are_retried_until_success() {
        let server = MockServer::start().await;
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        Mock::given(method("POST"))
            .respond_with(move |_: &wiremock::Request| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    ResponseTemplate::new(503)
                } else {
                    ResponseTemplate::new(200)
                }
            })
            .expect(2)
            .mount(&server)
            .await;

        let client = fast_client(3);
        let response = client
            .send(client.request(Method::POST, server.uri()).body("{}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn last_server_error_is_returned_to_caller() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .expect(2)
            .mount(&server)
            .await;

        let client = fast_client(2);
        let response = client.send(client.request(Method::GET, server.uri())).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let client = fast_client(3);
        let response = client.send(client.request(Method::GET, server.uri())).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = fast_client(2);
        let err = client.send(client.request(Method::GET, &url)).await.unwrap_err();

        assert!(matches!(err, SkillTrailError::Network(_)), "got {err:?}");
    }

    #[test]
    fn llm_config_sets_attempts() {
        let config = LlmConfig { max_attempts: 0, ..LlmConfig::default() };
        let client = HttpClient::for_llm(&config).unwrap();
        assert_eq!(client.max_attempts, 1);
    }
}
