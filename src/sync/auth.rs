use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::PlannerConfig;
use crate::state::storage::{KeyValueStore, keys};
use crate::{PlannerError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl Token {
    /// Value for the `Authorization` header, e.g. `Bearer abc`.
    pub fn authorization(&self) -> String {
        let scheme = match self.token_type.to_ascii_lowercase().as_str() {
            "bearer" | "" => "Bearer".to_string(),
            _ => self.token_type.clone(),
        };
        format!("{} {}", scheme, self.access_token)
    }
}

#[derive(Serialize)]
struct SigninRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Signed-in state, persisted through the key-value store.
///
/// Only `is_authenticated`, `signin` and `signout` are offered; token
/// refresh lives outside this crate.
pub struct Session {
    auth_url: String,
    http: Client,
    storage: Arc<dyn KeyValueStore>,
}

impl Session {
    pub fn new(config: &PlannerConfig, storage: Arc<dyn KeyValueStore>) -> Result<Self> {
        let http = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self {
            auth_url: config.auth_url(),
            http,
            storage,
        })
    }

    pub fn token(&self) -> Option<Token> {
        let access_token = self.storage.get(keys::AUTH_TOKEN)?;
        let token_type = self.storage.get(keys::TOKEN_TYPE)?;
        Some(Token {
            access_token,
            token_type,
            refresh_token: self.storage.get(keys::REFRESH_TOKEN),
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn store_token(&self, token: &Token) {
        self.storage.set(keys::AUTH_TOKEN, &token.access_token);
        self.storage.set(keys::TOKEN_TYPE, &token.token_type);
        if let Some(refresh) = &token.refresh_token {
            self.storage.set(keys::REFRESH_TOKEN, refresh);
        }
    }

    pub async fn signin(&self, username: &str, password: &str) -> Result<Token> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(PlannerError::invalid("username and password are required"));
        }

        let url = format!("{}/access_token_json/", self.auth_url);
        log::debug!("POST {}", url);
        let resp = self
            .http
            .post(&url)
            .json(&SigninRequest { username, password })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PlannerError::from_status(status, body));
        }

        let token: Token = resp.json().await?;
        self.store_token(&token);
        log::info!("Signed in as {}", username);
        Ok(token)
    }

    pub fn signout(&self) {
        self.storage.remove(keys::AUTH_TOKEN);
        self.storage.remove(keys::TOKEN_TYPE);
        self.storage.remove(keys::REFRESH_TOKEN);
        log::info!("Signed out");
    }
}
