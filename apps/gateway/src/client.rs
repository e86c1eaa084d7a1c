use axum::body::Bytes;
use axum::http::{HeaderValue, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::GatewayError;

/// Raw downstream response, replayed to the client as-is.
#[derive(Debug)]
pub struct DownstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// HTTP client for the downstream services with a bounded per-request
/// timeout. The caller's bearer token is forwarded unchanged on every hop.
#[derive(Clone)]
pub struct DownstreamClient {
    http: reqwest::Client,
}

impl DownstreamClient {
    pub fn new(timeout: Duration) -> eyre::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// Forward a request verbatim and return whatever the downstream
    /// answered, success or not.
    pub async fn forward(
        &self,
        method: Method,
        url: &str,
        authorization: Option<&HeaderValue>,
        body: Bytes,
    ) -> Result<DownstreamResponse, GatewayError> {
        let mut request = self.http.request(method, url);
        if let Some(value) = authorization {
            request = request.header(reqwest::header::AUTHORIZATION, value.clone());
        }
        if !body.is_empty() {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = request.send().await.map_err(GatewayError::from_reqwest)?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(GatewayError::from_reqwest)?;
        Ok(DownstreamResponse { status, body })
    }

    /// GET a JSON document, failing with a replayable error when the
    /// downstream answers with a non-success status.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        bearer: &str,
    ) -> Result<T, GatewayError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(GatewayError::from_reqwest)?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(GatewayError::from_reqwest)?;
        if !status.is_success() {
            return Err(GatewayError::Upstream { status, body });
        }

        serde_json::from_slice(&body)
            .map_err(|e| GatewayError::Transport(format!("invalid upstream JSON: {e}")))
    }
}
