use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::config::{AppPaths, ConfigService, Settings};
use crate::embed::{Embedder, LocalEmbedder};
use crate::kb::{KnowledgeBase, SqliteVectorStore};
use crate::llm::GroqProvider;
use crate::qa::Answerer;

/// Long-lived handles shared by every request.
///
/// The index, the embedder and the model client are built exactly once
/// here and injected into the components that need them; nothing in the
/// pipeline reaches for globals.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub kb: Arc<KnowledgeBase>,
    pub answerer: Arc<Answerer>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Construct the full service. Fails fast on a missing API key, an
    /// unknown embedding model, or an index built with a different
    /// embedding model.
    pub async fn initialize() -> anyhow::Result<Arc<Self>> {
        let paths = Arc::new(AppPaths::new());
        let config = ConfigService::new(paths.clone());

        let merged = config.load_config()?;
        let settings = Settings::from_config(&merged);
        let api_key = Settings::resolve_api_key(&merged)?;

        let embedder = Arc::new(LocalEmbedder::new(&settings.embedding_model)?);
        let store = SqliteVectorStore::open(
            paths.kb_db_path.clone(),
            &settings.embedding_model,
            embedder.dimension(),
        )
        .await?;

        let kb = Arc::new(KnowledgeBase::new(
            Arc::new(store),
            embedder,
            settings.chunking,
        )?);

        let provider = Arc::new(GroqProvider::new(settings.llm_base_url.clone(), api_key));
        let answerer = Arc::new(Answerer::new(
            kb.clone(),
            provider,
            settings.llm_model.clone(),
            settings.temperature,
            settings.top_k,
        ));

        Ok(Arc::new(AppState {
            paths,
            config,
            kb,
            answerer,
            started_at: Utc::now(),
        }))
    }
}
