//! Shared test fixtures.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use jsonwebtoken::{EncodingKey, Header};
use serde_json::Value;

use crate::gateway::{AuthGateway, GatewayError, LoginResponse};

/// Sign `payload` the way the event API does (HS256).
pub fn mint(payload: Value) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        &payload,
        &EncodingKey::from_secret(b"api-secret"),
    )
    .unwrap()
}

/// Gateway answering every login with the same scripted outcome.
pub struct ScriptedGateway {
    outcome: Result<LoginResponse, GatewayError>,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedGateway {
    pub fn token(token: &str) -> Arc<Self> {
        Self::outcome(Ok(LoginResponse {
            token: Some(token.to_string()),
        }))
    }

    pub fn outcome(outcome: Result<LoginResponse, GatewayError>) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn offline() -> Arc<Self> {
        Self::outcome(Err(GatewayError::Network("offline".to_string())))
    }
}

#[async_trait]
impl AuthGateway for ScriptedGateway {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, GatewayError> {
        self.calls
            .lock()
            .unwrap()
            .push((email.to_string(), password.to_string()));
        self.outcome.clone()
    }
}
