mod supabase;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

pub use supabase::SupabaseAuthProvider;

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Sign-up and password sign-in against an external identity service.
/// Successful payloads are returned unmodified; errors carry the
/// provider's own message.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, credentials: &Credentials) -> anyhow::Result<Value>;

    async fn sign_in_with_password(&self, credentials: &Credentials) -> anyhow::Result<Value>;
}

#[derive(Debug, Default)]
pub struct AuthService {
    pub supabase: Option<SupabaseAuthProvider>,
}

impl AuthService {
    fn provider(&self) -> anyhow::Result<&SupabaseAuthProvider> {
        self.supabase
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("identity provider is not configured"))
    }
}

#[async_trait]
impl IdentityProvider for AuthService {
    async fn sign_up(&self, credentials: &Credentials) -> anyhow::Result<Value> {
        self.provider()?.sign_up(credentials).await
    }

    async fn sign_in_with_password(&self, credentials: &Credentials) -> anyhow::Result<Value> {
        self.provider()?.sign_in_with_password(credentials).await
    }
}
