// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP transport seam.
//!
//! The SDK core never talks to the network directly; it goes through the
//! [`Transport`] trait so tests can script responses and embedders can bring
//! their own client. [`HttpTransport`] is the production implementation over
//! reqwest with rustls.
//!
//! Timeouts and retries live here, not in the core: the core never retries,
//! and a transport error for a non-idempotent call (installation!) must
//! surface to the caller untouched.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};

/// Request timeout for the built-in transport.
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// How much response body to quote in a transport error message.
const ERROR_BODY_SNIPPET_LEN: usize = 256;

/// HTTP methods the API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// A raw response as the transport saw it: status, headers verbatim, body
/// bytes. Headers are never dropped here; pagination cursors and rate-limit
/// counters ride on them.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// Injected HTTP collaborator.
///
/// `send` fails with [`Error::Transport`] on network failure or any non-2xx
/// status; the error message carries the status and a body snippet.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        method: Method,
        url: &str,
        headers: HashMap<String, String>,
        body: Option<Vec<u8>>,
    ) -> Result<RawResponse>;
}

/// Production transport over reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport, optionally routing through an outbound proxy.
    pub fn new(proxy_url: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        if let Some(raw) = proxy_url {
            let parsed = url::Url::parse(raw)
                .map_err(|e| Error::Configuration(format!("invalid proxy URL {raw:?}: {e}")))?;
            let proxy = reqwest::Proxy::all(parsed.as_str())
                .map_err(|e| Error::Configuration(format!("unusable proxy URL {raw:?}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let http = builder
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: Method,
        url: &str,
        headers: HashMap<String, String>,
        body: Option<Vec<u8>>,
    ) -> Result<RawResponse> {
        let reqwest_method = match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut request = self.http.request(reqwest_method, url);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Transport(format!("{} {url} failed: {e}", method.as_str())))?;

        let status = response.status();
        let response_headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(format!("{} {url} body read failed: {e}", method.as_str())))?
            .to_vec();

        if !status.is_success() {
            let snippet: String = String::from_utf8_lossy(&body)
                .chars()
                .take(ERROR_BODY_SNIPPET_LEN)
                .collect();
            return Err(Error::Transport(format!(
                "{} {url} returned {status}: {snippet}",
                method.as_str()
            )));
        }

        debug!(method = method.as_str(), url, status = status.as_u16(), "request completed");

        Ok(RawResponse {
            status: status.as_u16(),
            headers: response_headers,
            body,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn send_returns_body_and_headers() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/session-server")
            .with_status(200)
            .with_header("X-Pagination-Older-Url", "/v1/things?older_id=5")
            .with_body(r#"{"Response":[]}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new(None).unwrap();
        let url = format!("{}/v1/session-server", server.url());
        let response = transport
            .send(Method::Get, &url, HashMap::new(), None)
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, br#"{"Response":[]}"#);
        assert_eq!(
            response.headers.get("x-pagination-older-url").map(String::as_str),
            Some("/v1/things?older_id=5")
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn request_headers_are_forwarded() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/device-server")
            .match_header("authorization", "Bearer install-token")
            .with_status(200)
            .with_body(r#"{"Response":[{"Id":{"id":1}}]}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new(None).unwrap();
        let url = format!("{}/v1/device-server", server.url());
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), "Bearer install-token".to_string());

        transport
            .send(Method::Post, &url, headers, Some(b"{}".to_vec()))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_a_transport_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/v1/installation")
            .with_status(409)
            .with_body("installation already exists")
            .create_async()
            .await;

        let transport = HttpTransport::new(None).unwrap();
        let url = format!("{}/v1/installation", server.url());
        let result = transport.send(Method::Post, &url, HashMap::new(), Some(b"{}".to_vec())).await;

        match result {
            Err(Error::Transport(message)) => {
                assert!(message.contains("409"));
                assert!(message.contains("installation already exists"));
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn invalid_proxy_url_is_a_configuration_error() {
        let result = HttpTransport::new(Some("not a url"));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
