use std::{env, net::SocketAddr, time::Duration};

use crate::{
    admission::DEFAULT_FUZZY_THRESHOLD,
    http::DEFAULT_MAX_MESSAGE_CHARS,
    memory::{DEFAULT_MAX_SESSIONS, DEFAULT_WINDOW_CAPACITY},
    model::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL},
};

/// `CHAT_WINDOW_SIZE` is clamped to this.
pub const MAX_WINDOW_CAPACITY: usize = 1_000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_bind: SocketAddr,
    pub model_provider: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub supabase_url: Option<String>,
    pub supabase_service_role_key: Option<String>,
    pub window_capacity: usize,
    pub max_sessions: usize,
    pub max_message_chars: usize,
    pub session_inspection_enabled: bool,
    pub fuzzy_threshold: f64,
    pub model_timeout: Duration,
    pub identity_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("PORT").unwrap_or_else(|| "3000".to_owned());
        let http_bind = lookup("HTTP_BIND").unwrap_or_else(|| format!("0.0.0.0:{port}"));
        let http_bind = http_bind.parse()?;

        let fuzzy_threshold = env_f64(&lookup, "FUZZY_MATCH_THRESHOLD", DEFAULT_FUZZY_THRESHOLD);
        if !(0.0..=1.0).contains(&fuzzy_threshold) {
            anyhow::bail!("FUZZY_MATCH_THRESHOLD must be within [0, 1], got {fuzzy_threshold}");
        }

        Ok(Self {
            http_bind,
            model_provider: lookup("MODEL_PROVIDER").unwrap_or_else(|| "auto".to_owned()),
            gemini_api_key: non_empty(lookup("GEMINI_API_KEY")),
            gemini_model: lookup("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_owned()),
            gemini_base_url: lookup("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_owned()),
            supabase_url: non_empty(lookup("SUPABASE_URL")),
            supabase_service_role_key: non_empty(lookup("SUPABASE_SERVICE_ROLE_KEY")),
            window_capacity: env_usize(&lookup, "CHAT_WINDOW_SIZE", DEFAULT_WINDOW_CAPACITY)
                .clamp(1, MAX_WINDOW_CAPACITY),
            max_sessions: env_usize(&lookup, "CHAT_MAX_SESSIONS", DEFAULT_MAX_SESSIONS).max(1),
            max_message_chars: env_usize(&lookup, "MAX_MESSAGE_CHARS", DEFAULT_MAX_MESSAGE_CHARS)
                .max(1),
            session_inspection_enabled: env_bool(&lookup, "SESSION_INSPECTION_ENABLED", false),
            fuzzy_threshold,
            model_timeout: Duration::from_secs(env_u64(&lookup, "MODEL_TIMEOUT_SEC", 30)),
            identity_timeout: Duration::from_secs(env_u64(&lookup, "IDENTITY_TIMEOUT_SEC", 15)),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|raw| !raw.trim().is_empty())
}

fn env_bool<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str, default: bool) -> bool {
    lookup(name)
        .map(|raw| {
            matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(default)
}

fn env_u64<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str, default: u64) -> u64 {
    lookup(name)
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str, default: usize) -> usize {
    lookup(name)
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_f64<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str, default: f64) -> f64 {
    lookup(name)
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .unwrap_or(default)
}
