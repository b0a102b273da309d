//! Common test utilities for api-client integration tests

#![allow(dead_code)]

use wiremock::matchers::any;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// One request as seen by the server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

/// Scripted response
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }
}

/// Mock server answering each request with the next scripted reply
///
/// Every reply is mounted for a single use, in order. Once the script is
/// exhausted the server falls back to wiremock's 404.
pub async fn scripted_server(replies: Vec<Reply>) -> MockServer {
    let server = MockServer::start().await;
    for reply in replies {
        Mock::given(any())
            .respond_with(
                ResponseTemplate::new(reply.status)
                    .set_body_raw(reply.body.into_bytes(), "application/json"),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
    }
    server
}

/// Requests the server has received, oldest first
pub async fn recorded(server: &MockServer) -> Vec<RecordedRequest> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|request| RecordedRequest {
            method: request.method.as_str().to_string(),
            path: request.url.path().to_string(),
            authorization: request
                .headers
                .get("authorization")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
            body: String::from_utf8_lossy(&request.body).to_string(),
        })
        .collect()
}
