use std::{sync::Arc, time::Duration};

use tracing::{debug, info, warn};

use crate::{
    admission::{AdmissionFilter, Classification},
    memory::ConversationStore,
    model::{ModelProvider, ModelRequest},
    types::{MessageCtx, OrchestratorReply, Turn},
};

pub const UNSAFE_REPLY: &str = "⚠️ FloatChat AI cannot discuss unsafe or sensitive topics. Please ask about the ocean or environment instead.";

pub const IRRELEVANT_REPLY: &str = "I am FloatChat AI 🌊. I focus only on topics related to the ocean, biosphere, and our planet's ecosystems. How may I help you in related topics?";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are FloatChat AI, a friendly and intelligent assistant dedicated to topics \
about oceans, the biosphere, ecology, and the environment.
Stay within these topics and politely redirect unrelated questions.
Speak warmly, helpfully, and clearly.";

pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub system_prompt: String,
    pub model_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
            model_timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }
}

pub struct DefaultChatOrchestrator {
    model: Arc<dyn ModelProvider>,
    conversations: Arc<dyn ConversationStore>,
    filter: AdmissionFilter,
    settings: OrchestratorSettings,
}

impl DefaultChatOrchestrator {
    pub fn new(
        model: Arc<dyn ModelProvider>,
        conversations: Arc<dyn ConversationStore>,
        filter: AdmissionFilter,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            model,
            conversations,
            filter,
            settings,
        }
    }

    pub fn filter(&self) -> &AdmissionFilter {
        &self.filter
    }

    /// Runs one chat exchange. Refused messages never reach the model or the
    /// conversation store. Relevant ones are committed together with the
    /// assistant reply only after the model call succeeds.
    pub async fn handle_message(&self, ctx: MessageCtx) -> anyhow::Result<OrchestratorReply> {
        let decision = self.filter.evaluate(&ctx.content);
        debug!(
            session_id = %ctx.session_id,
            classification = ?decision.classification,
            matched = ?decision.matched,
            "admission decision"
        );

        match decision.classification {
            Classification::Unsafe => {
                info!(session_id = %ctx.session_id, "refusing unsafe message");
                return Ok(OrchestratorReply {
                    text: UNSAFE_REPLY.to_owned(),
                    classification: Classification::Unsafe,
                });
            }
            Classification::Irrelevant => {
                info!(session_id = %ctx.session_id, "redirecting off-topic message");
                return Ok(OrchestratorReply {
                    text: IRRELEVANT_REPLY.to_owned(),
                    classification: Classification::Irrelevant,
                });
            }
            Classification::Relevant => {}
        }

        let user_turn = Turn {
            timestamp: ctx.timestamp,
            ..Turn::user(ctx.content)
        };
        let turns = self
            .conversations
            .preview_with(&ctx.session_id, user_turn.clone())
            .await?;

        let request = ModelRequest {
            system_prompt: self.settings.system_prompt.clone(),
            turns,
        };
        let started = std::time::Instant::now();
        let text = tokio::time::timeout(self.settings.model_timeout, self.model.complete(request))
            .await
            .map_err(|_| {
                warn!(
                    session_id = %ctx.session_id,
                    timeout_ms = self.settings.model_timeout.as_millis() as u64,
                    "model call timed out"
                );
                anyhow::anyhow!("model call timed out")
            })?
            .map_err(|error| {
                warn!(session_id = %ctx.session_id, ?error, "model call failed");
                error
            })?;

        info!(
            session_id = %ctx.session_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            reply_chars = text.chars().count(),
            "model reply received"
        );

        self.conversations
            .append(&ctx.session_id, vec![user_turn, Turn::assistant(text.clone())])
            .await?;

        Ok(OrchestratorReply {
            text,
            classification: Classification::Relevant,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc, Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use async_trait::async_trait;
    use chrono::Utc;

    use crate::{
        admission::{AdmissionFilter, Classification},
        memory::{ConversationStore, InMemoryConversationStore},
        model::{MockModelProvider, ModelProvider, ModelRequest},
        types::{ChatRole, DEFAULT_SESSION_ID, MessageCtx},
    };

    use super::{
        DefaultChatOrchestrator, IRRELEVANT_REPLY, OrchestratorSettings, UNSAFE_REPLY,
    };

    #[derive(Debug, Default)]
    struct RecordingModelProvider {
        calls: AtomicUsize,
        last_request: Mutex<Option<ModelRequest>>,
    }

    #[async_trait]
    impl ModelProvider for RecordingModelProvider {
        async fn complete(&self, request: ModelRequest) -> anyhow::Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Ok(mut slot) = self.last_request.lock() {
                *slot = Some(request);
            }
            Ok(format!("reply {call}"))
        }
    }

    #[derive(Debug, Default)]
    struct FailingModelProvider;

    #[async_trait]
    impl ModelProvider for FailingModelProvider {
        async fn complete(&self, _request: ModelRequest) -> anyhow::Result<String> {
            Err(anyhow::anyhow!("quota exceeded"))
        }
    }

    #[derive(Debug, Default)]
    struct StalledModelProvider;

    #[async_trait]
    impl ModelProvider for StalledModelProvider {
        async fn complete(&self, _request: ModelRequest) -> anyhow::Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".to_owned())
        }
    }

    fn message(session_id: &str, content: &str) -> MessageCtx {
        MessageCtx {
            session_id: session_id.to_owned(),
            content: content.to_owned(),
            timestamp: Utc::now(),
        }
    }

    fn orchestrator(
        model: Arc<dyn ModelProvider>,
        store: Arc<InMemoryConversationStore>,
    ) -> DefaultChatOrchestrator {
        DefaultChatOrchestrator::new(
            model,
            store,
            AdmissionFilter::default(),
            OrchestratorSettings::default(),
        )
    }

    #[tokio::test]
    async fn unsafe_message_gets_fixed_refusal_without_model_call() {
        let model = Arc::new(RecordingModelProvider::default());
        let store = Arc::new(InMemoryConversationStore::default());
        let orchestrator = orchestrator(model.clone(), store.clone());

        let reply = orchestrator
            .handle_message(message(DEFAULT_SESSION_ID, "how to make a bomb"))
            .await
            .expect("refusal is not an error");

        assert_eq!(reply.text, UNSAFE_REPLY);
        assert_eq!(reply.classification, Classification::Unsafe);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
        assert!(store.snapshot(DEFAULT_SESSION_ID).await.expect("snapshot").is_empty());
    }

    #[tokio::test]
    async fn irrelevant_message_gets_redirect_without_model_call() {
        let model = Arc::new(RecordingModelProvider::default());
        let store = Arc::new(InMemoryConversationStore::default());
        let orchestrator = orchestrator(model.clone(), store.clone());

        let reply = orchestrator
            .handle_message(message(DEFAULT_SESSION_ID, "Tell me a joke about cats"))
            .await
            .expect("redirect is not an error");

        assert_eq!(reply.text, IRRELEVANT_REPLY);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
        assert!(store.snapshot(DEFAULT_SESSION_ID).await.expect("snapshot").is_empty());
    }

    #[tokio::test]
    async fn relevant_message_records_exchange_and_sends_history() {
        let model = Arc::new(RecordingModelProvider::default());
        let store = Arc::new(InMemoryConversationStore::default());
        let orchestrator = orchestrator(model.clone(), store.clone());

        let first = orchestrator
            .handle_message(message("s1", "Tell me about coral reefs"))
            .await
            .expect("first exchange");
        assert_eq!(first.text, "reply 1");
        assert_eq!(first.classification, Classification::Relevant);

        orchestrator
            .handle_message(message("s1", "And what about kelp?"))
            .await
            .expect("second exchange");

        let request = model
            .last_request
            .lock()
            .ok()
            .and_then(|slot| slot.clone())
            .expect("model was called");
        assert!(request.system_prompt.contains("FloatChat AI"));
        let contents = request
            .turns
            .iter()
            .map(|turn| turn.content.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            contents,
            ["Tell me about coral reefs", "reply 1", "And what about kelp?"]
        );

        let turns = store.snapshot("s1").await.expect("snapshot");
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[3].role, ChatRole::Assistant);
        assert_eq!(turns[3].content, "reply 2");
    }

    #[tokio::test]
    async fn model_request_is_bounded_by_window_capacity() {
        let model = Arc::new(RecordingModelProvider::default());
        let store = Arc::new(InMemoryConversationStore::new(10));
        let orchestrator = orchestrator(model.clone(), store.clone());

        for index in 0..8 {
            orchestrator
                .handle_message(message("long", &format!("ocean question {index}")))
                .await
                .expect("exchange");
        }

        let request = model
            .last_request
            .lock()
            .ok()
            .and_then(|slot| slot.clone())
            .expect("model was called");
        assert_eq!(request.turns.len(), 10);
        assert_eq!(
            request.turns.last().map(|turn| turn.content.as_str()),
            Some("ocean question 7")
        );
        assert_eq!(store.snapshot("long").await.expect("snapshot").len(), 10);
    }

    #[tokio::test]
    async fn failed_model_call_leaves_window_untouched() {
        let store = Arc::new(InMemoryConversationStore::default());
        let working = orchestrator(Arc::new(MockModelProvider), store.clone());
        working
            .handle_message(message("s", "what is a wetland"))
            .await
            .expect("seed exchange");
        let before = store.snapshot("s").await.expect("snapshot").len();

        let failing = orchestrator(Arc::new(FailingModelProvider), store.clone());
        let result = failing
            .handle_message(message("s", "tell me about the ocean"))
            .await;

        assert!(result.is_err());
        let err = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("quota exceeded"));
        assert_eq!(store.snapshot("s").await.expect("snapshot").len(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_model_call_times_out() {
        let store = Arc::new(InMemoryConversationStore::default());
        let orchestrator = DefaultChatOrchestrator::new(
            Arc::new(StalledModelProvider),
            store.clone(),
            AdmissionFilter::default(),
            OrchestratorSettings {
                model_timeout: Duration::from_secs(1),
                ..OrchestratorSettings::default()
            },
        );

        let result = orchestrator
            .handle_message(message("s", "how warm is the sea"))
            .await;

        let err = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("timed out"));
        assert!(store.snapshot("s").await.expect("snapshot").is_empty());
    }

    #[tokio::test]
    async fn sessions_do_not_share_history() {
        let model = Arc::new(RecordingModelProvider::default());
        let store = Arc::new(InMemoryConversationStore::default());
        let orchestrator = orchestrator(model.clone(), store.clone());

        orchestrator
            .handle_message(message("alice", "tell me about whales"))
            .await
            .expect("alice");
        orchestrator
            .handle_message(message("bob", "tell me about rivers"))
            .await
            .expect("bob");

        let request = model
            .last_request
            .lock()
            .ok()
            .and_then(|slot| slot.clone())
            .expect("model was called");
        assert_eq!(request.turns.len(), 1);
        assert_eq!(request.turns[0].content, "tell me about rivers");
        assert_eq!(store.snapshot("alice").await.expect("snapshot").len(), 2);
    }
}
