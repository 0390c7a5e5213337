// HttpClient over reqwest
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use settle_core::port::{HttpClient, HttpError, HttpResponse};

/// Per-request timeout when none is configured (30s)
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(request_timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| HttpError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

fn classify(err: reqwest::Error) -> HttpError {
    if err.is_timeout() {
        HttpError::Timeout(err.to_string())
    } else if err.is_builder() {
        HttpError::InvalidUrl(err.to_string())
    } else {
        HttpError::Transport(err.to_string())
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        let response = self.client.get(url).send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;

        debug!(url = %url, status, bytes = body.len(), "HTTP GET completed");
        Ok(HttpResponse { status, body })
    }
}
