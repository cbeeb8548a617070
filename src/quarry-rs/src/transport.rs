use async_trait::async_trait;
use quarry_core::{ApiWrapper, Config, Error, Method, RequestOptions, Result};
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub const APPLICATION_ID_HEADER: &str = "X-Algolia-Application-Id";
pub const API_KEY_HEADER: &str = "X-Algolia-API-Key";

/// reqwest-backed transport talking to one read host and one write host
pub struct HttpApiWrapper {
    client: HttpClient,
    read_host: String,
    write_host: String,
    app_id: String,
    api_key: String,
    read_timeout: Duration,
    write_timeout: Duration,
    read_retries: u32,
}

impl HttpApiWrapper {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let builder = if config.insecure_skip_verify {
            HttpClient::builder().danger_accept_invalid_certs(true)
        } else {
            HttpClient::builder()
        };
        let client = builder
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            client,
            read_host: config.read_host(),
            write_host: config.write_host(),
            app_id: config.app_id.clone(),
            api_key: config.api_key.clone(),
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
            read_retries: config.read_retries,
        })
    }

    async fn send(
        &self,
        host: &str,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: &RequestOptions,
        timeout: Duration,
    ) -> Result<Value> {
        let url = join_url(host, path);
        debug!(%method, %url, "Sending request");

        let mut request = self
            .client
            .request(reqwest_method(method), &url)
            .header(APPLICATION_ID_HEADER, self.app_id.as_str())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .timeout(timeout);

        let query = options.query_pairs();
        if !query.is_empty() {
            request = request.query(&query);
        }
        for (name, value) in options.headers() {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        // A truncated or garbled body is a transport failure, so reads retry it
        serde_json::from_str(&text)
            .map_err(|e| Error::Transport(format!("invalid response body: {}", e)))
    }
}

#[async_trait]
impl ApiWrapper for HttpApiWrapper {
    async fn read(&self, method: Method, path: &str, options: &RequestOptions) -> Result<Value> {
        let body = match method {
            Method::Get => None,
            _ => Some(Value::Object(options.body_parameters().clone())),
        };
        let timeout = options.read_timeout().unwrap_or(self.read_timeout);

        let mut attempt = 0;
        loop {
            match self
                .send(&self.read_host, method, path, body.clone(), options, timeout)
                .await
            {
                Err(e) if e.is_retryable() && attempt < self.read_retries => {
                    attempt += 1;
                    let delay = retry_delay(attempt);
                    warn!(
                        "Read {} {} failed: {}. Retrying in {:?} (attempt {}/{})",
                        method, path, e, delay, attempt, self.read_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    async fn write(
        &self,
        method: Method,
        path: &str,
        body: Value,
        options: &RequestOptions,
    ) -> Result<Value> {
        let timeout = options.write_timeout().unwrap_or(self.write_timeout);
        let body = options.apply_to_body(body);
        self.send(&self.write_host, method, path, Some(body), options, timeout)
            .await
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    Error::Transport(e.to_string())
}

fn join_url(host: &str, path: &str) -> String {
    format!("{}{}", host.trim_end_matches('/'), path)
}

/// Pause before read retry `attempt`
fn retry_delay(attempt: u32) -> Duration {
    Duration::from_millis(100 * u64::from(attempt))
}

/// Prefer the `message` field of a JSON error body, else the raw body
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
