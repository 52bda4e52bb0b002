//! Reqwest-backed HTTP client for desktop hosts.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Default per-request timeout when the request carries none.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Desktop [`HttpClient`] over a pooled `reqwest::Client`.
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Build with connection pooling and rustls TLS.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying TLS backend cannot initialize.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("reqwest init failed: {}", e)))?;
        Ok(Self { client })
    }

    fn method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(Self::method(request.method), &request.url);

        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("HTTP request failed: {}", e)))?;

        let status = response.status().as_u16();
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(text) = value.to_str() {
                headers.insert(name.as_str().to_string(), text.to_string());
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("HTTP body read failed: {}", e)))?;

        debug!(status, bytes = body.len(), "request completed");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds() {
        assert!(ReqwestHttpClient::new().is_ok());
    }

    #[test]
    fn test_method_mapping() {
        assert_eq!(
            ReqwestHttpClient::method(HttpMethod::Patch),
            reqwest::Method::PATCH
        );
        assert_eq!(
            ReqwestHttpClient::method(HttpMethod::Delete),
            reqwest::Method::DELETE
        );
    }
}
