//! Auth gateway: exchanges email + password for a bearer credential.
//!
//! The event API is a black box here. Contract:
//! `POST <api>/auth/login` with `{ email, password }`; a 2xx body carries
//! `token`, a non-2xx body may carry `message`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Successful login exchange. `token` is optional on the wire; the identity
/// store decides what a missing token means.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("login rejected ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Rejected { status: u16, message: Option<String> },

    #[error("network error: {0}")]
    Network(String),

    #[error("gateway setup failed: {0}")]
    Setup(String),
}

#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, GatewayError>;
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// HTTP implementation backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpAuthGateway {
    client: reqwest::Client,
    login_url: String,
}

impl HttpAuthGateway {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            login_url: format!("{}/auth/login", api_url.trim_end_matches('/')),
        })
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }
}

#[async_trait]
impl AuthGateway for HttpAuthGateway {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, GatewayError> {
        tracing::debug!(url = %self.login_url, "sending login request");

        let resp = self
            .client
            .post(&self.login_url)
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .filter(|m| !m.trim().is_empty());
            tracing::debug!(status = status.as_u16(), "login rejected");
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        match serde_json::from_slice::<LoginResponse>(&body) {
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::error!(status = status.as_u16(), error = %e, "unexpected login response body");
                Ok(LoginResponse::default())
            }
        }
    }
}
