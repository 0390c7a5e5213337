// HTTP Client Port

use async_trait::async_trait;
use thiserror::Error;

/// Response as seen by probes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Result<serde_json::Value, HttpError> {
        serde_json::from_str(&self.body).map_err(|e| HttpError::InvalidBody(e.to_string()))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Invalid body: {0}")]
    InvalidBody(String),
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue a GET; any status code is a successful response at this layer
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted HTTP client; the last response repeats once exhausted
    pub struct MockHttpClient {
        responses: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
        last: Mutex<Option<Result<HttpResponse, HttpError>>>,
        requests: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        pub fn new(responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                last: Mutex::new(None),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn respond(status: u16, body: impl Into<String>) -> Result<HttpResponse, HttpError> {
            Ok(HttpResponse {
                status,
                body: body.into(),
            })
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
            self.requests.lock().unwrap().push(url.to_string());

            let next = self.responses.lock().unwrap().pop_front();
            let mut last = self.last.lock().unwrap();
            match next {
                Some(response) => {
                    *last = Some(response.clone());
                    response
                }
                None => last.clone().unwrap_or_else(|| {
                    Err(HttpError::Transport("no scripted response".to_string()))
                }),
            }
        }
    }
}
