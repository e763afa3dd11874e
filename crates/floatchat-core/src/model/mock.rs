use async_trait::async_trait;

use crate::types::ChatRole;

use super::{ModelProvider, ModelRequest};

#[derive(Debug, Default)]
pub struct MockModelProvider;

#[async_trait]
impl ModelProvider for MockModelProvider {
    async fn complete(&self, request: ModelRequest) -> anyhow::Result<String> {
        let last_user = request
            .turns
            .iter()
            .rev()
            .find(|turn| turn.role == ChatRole::User)
            .map(|turn| turn.content.as_str())
            .unwrap_or_default();

        Ok(format!(
            "FloatChat mock reply ({} turns in context).\n\nUser: {last_user}",
            request.turns.len()
        ))
    }
}
