use std::sync::Arc;

use floatchat_core::{
    admission::AdmissionFilter,
    config::AppConfig,
    http::{self, AppState, HttpSettings},
    identity::{AuthService, IdentityProvider, SupabaseAuthProvider},
    lexicon::Lexicon,
    memory::{ConversationStore, InMemoryConversationStore},
    model::{GeminiProvider, MockModelProvider, ModelProvider},
    orchestrator::{DefaultChatOrchestrator, OrchestratorSettings},
};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;

    let model = build_model_provider(&config)?;
    let identity = build_identity_provider(&config)?;
    let conversations: Arc<dyn ConversationStore> =
        Arc::new(InMemoryConversationStore::with_max_sessions(
            config.window_capacity,
            config.max_sessions,
        ));

    let filter = AdmissionFilter::new(Lexicon::default(), config.fuzzy_threshold);
    info!(
        unsafe_terms = filter.lexicon().unsafe_terms().len(),
        allowed_topics = filter.lexicon().allowed_topics().len(),
        fuzzy_threshold = config.fuzzy_threshold,
        window_capacity = config.window_capacity,
        max_sessions = config.max_sessions,
        "admission filter ready"
    );

    let orchestrator = Arc::new(DefaultChatOrchestrator::new(
        model,
        conversations.clone(),
        filter,
        OrchestratorSettings {
            model_timeout: config.model_timeout,
            ..OrchestratorSettings::default()
        },
    ));

    let app = http::router(AppState {
        orchestrator,
        conversations,
        identity,
        settings: HttpSettings {
            max_message_chars: config.max_message_chars,
            session_inspection_enabled: config.session_inspection_enabled,
        },
    });
    if config.session_inspection_enabled {
        warn!("SESSION_INSPECTION_ENABLED is set; /api/sessions is served without auth");
    }
    let listener = TcpListener::bind(config.http_bind).await?;
    info!("FloatChat HTTP API listening on {}", config.http_bind);

    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .init();
}

fn build_model_provider(config: &AppConfig) -> anyhow::Result<Arc<dyn ModelProvider>> {
    let provider = config.model_provider.to_lowercase();
    let gemini = || -> anyhow::Result<Option<Arc<dyn ModelProvider>>> {
        let Some(api_key) = config.gemini_api_key.clone() else {
            return Ok(None);
        };
        let provider = GeminiProvider::new(
            api_key,
            config.gemini_model.clone(),
            config.gemini_base_url.clone(),
            config.model_timeout,
        )?;
        Ok(Some(Arc::new(provider)))
    };

    match provider.as_str() {
        "mock" => {
            warn!("MODEL_PROVIDER=mock; using mock model provider");
            Ok(Arc::new(MockModelProvider))
        }
        "gemini" => match gemini()? {
            Some(provider) => {
                info!(model = %config.gemini_model, "using Gemini model provider");
                Ok(provider)
            }
            None => {
                warn!("MODEL_PROVIDER=gemini but GEMINI_API_KEY is missing; using mock");
                Ok(Arc::new(MockModelProvider))
            }
        },
        other => {
            if other != "auto" {
                warn!(
                    provider = %other,
                    "unknown MODEL_PROVIDER value; valid values are auto|gemini|mock; falling back to auto"
                );
            }
            match gemini()? {
                Some(provider) => {
                    info!(model = %config.gemini_model, "using Gemini model provider (auto mode)");
                    Ok(provider)
                }
                None => {
                    warn!("No GEMINI_API_KEY configured; using mock model provider");
                    Ok(Arc::new(MockModelProvider))
                }
            }
        }
    }
}

fn build_identity_provider(config: &AppConfig) -> anyhow::Result<Arc<dyn IdentityProvider>> {
    let supabase = match (&config.supabase_url, &config.supabase_service_role_key) {
        (Some(url), Some(key)) => Some(SupabaseAuthProvider::new(
            url.clone(),
            key.clone(),
            config.identity_timeout,
        )?),
        _ => None,
    };

    if supabase.is_none() {
        warn!("SUPABASE_URL or SUPABASE_SERVICE_ROLE_KEY not set; /signup and /login will fail");
    }

    Ok(Arc::new(AuthService { supabase }))
}
