use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::{Credentials, IdentityProvider};

#[derive(Debug, Clone)]
pub struct SupabaseAuthProvider {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseAuthProvider {
    pub fn new(base_url: String, service_key: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            service_key,
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url.trim_end_matches('/'))
    }

    async fn post_credentials(
        &self,
        url: String,
        credentials: &Credentials,
    ) -> anyhow::Result<Value> {
        let payload = AuthRequest {
            email: &credentials.email,
            password: &credentials.password,
        };

        let response = self
            .client
            .post(url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                warn!(?error, "identity provider request failed");
                error
            })?;

        read_auth_response(response).await
    }
}

#[derive(Debug, Serialize)]
struct AuthRequest<'a> {
    email: &'a str,
    password: &'a str,
}

async fn read_auth_response(response: Response) -> anyhow::Result<Value> {
    let status = response.status();
    let body = response.text().await?;
    let parsed = serde_json::from_str::<Value>(&body).unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(parsed);
    }

    let message = provider_error_message(&parsed)
        .unwrap_or_else(|| format!("identity provider returned status {status}"));
    warn!(status = status.as_u16(), "identity provider rejected request");
    anyhow::bail!(message)
}

/// GoTrue reports errors under a handful of different keys depending on the
/// endpoint and version.
fn provider_error_message(body: &Value) -> Option<String> {
    ["msg", "error_description", "message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_owned)
}

#[async_trait]
impl IdentityProvider for SupabaseAuthProvider {
    async fn sign_up(&self, credentials: &Credentials) -> anyhow::Result<Value> {
        let data = self
            .post_credentials(self.auth_url("signup"), credentials)
            .await?;
        info!("identity provider sign-up succeeded");
        Ok(data)
    }

    async fn sign_in_with_password(&self, credentials: &Credentials) -> anyhow::Result<Value> {
        let data = self
            .post_credentials(self.auth_url("token?grant_type=password"), credentials)
            .await?;
        info!("identity provider password sign-in succeeded");
        Ok(data)
    }
}
