use std::env;

use serde_json::Value;

use crate::core::errors::ApiError;
use crate::kb::chunker::ChunkConfig;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai";
pub const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm-l6-v2";
pub const DEFAULT_TOP_K: usize = 4;
pub const DEFAULT_TEMPERATURE: f64 = 0.1;

/// Typed view over the merged YAML configuration.
///
/// Every field has a default so an empty config file yields a working
/// service; only the API key has no default.
#[derive(Debug, Clone)]
pub struct Settings {
    pub chunking: ChunkConfig,
    pub top_k: usize,
    pub llm_base_url: String,
    pub llm_model: String,
    pub temperature: f64,
    pub embedding_model: String,
}

impl Settings {
    pub fn from_config(config: &Value) -> Self {
        let kb = config.get("knowledge_base");
        let llm = config.get("llm");
        let retrieval = config.get("retrieval");
        let embedding = config.get("embedding");

        let chunking = ChunkConfig {
            chunk_size: read_usize(kb, "chunk_size", ChunkConfig::default().chunk_size),
            chunk_overlap: read_usize(kb, "chunk_overlap", ChunkConfig::default().chunk_overlap),
        };

        Settings {
            chunking,
            top_k: read_usize(retrieval, "top_k", DEFAULT_TOP_K),
            llm_base_url: read_string(llm, "base_url", DEFAULT_LLM_BASE_URL),
            llm_model: read_string(llm, "model", DEFAULT_LLM_MODEL),
            temperature: read_f64(llm, "temperature", DEFAULT_TEMPERATURE),
            embedding_model: read_string(embedding, "model", DEFAULT_EMBEDDING_MODEL),
        }
    }

    /// Resolve the hosted-model API key.
    ///
    /// Precedence: `GROQ_API_KEY` environment variable, then `llm.api_key`
    /// from the merged config (i.e. `secrets.yaml`). A missing key is a
    /// fatal configuration error; the service refuses to start rather
    /// than fail on the first question.
    pub fn resolve_api_key(config: &Value) -> Result<String, ApiError> {
        if let Ok(key) = env::var("GROQ_API_KEY") {
            let key = key.trim().to_string();
            if !key.is_empty() {
                return Ok(key);
            }
        }

        if let Some(key) = config
            .get("llm")
            .and_then(|llm| llm.get("api_key"))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|key| !key.is_empty())
        {
            return Ok(key.to_string());
        }

        Err(ApiError::Configuration(
            "missing hosted-model API key: set GROQ_API_KEY or llm.api_key in secrets.yaml"
                .to_string(),
        ))
    }
}

fn read_usize(section: Option<&Value>, key: &str, default: usize) -> usize {
    section
        .and_then(|v| v.get(key))
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .unwrap_or(default)
}

fn read_f64(section: Option<&Value>, key: &str, default: f64) -> f64 {
    section
        .and_then(|v| v.get(key))
        .and_then(|v| v.as_f64())
        .unwrap_or(default)
}

fn read_string(section: Option<&Value>, key: &str, default: &str) -> String {
    section
        .and_then(|v| v.get(key))
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .unwrap_or_else(|| default.to_string())
}
