//! Local text embeddings.
//!
//! Chunks and queries are embedded by a fixed local model; no embedding
//! API calls leave the machine. The model is chosen once, when the vector
//! store is created; vectors from different models are not comparable, so
//! the store records the model id and refuses to open under a different
//! one (see `kb::sqlite`).

use std::sync::Mutex;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::core::errors::ApiError;

/// Seam for embedding computation so the pipeline can be tested with a
/// deterministic stub.
pub trait Embedder: Send + Sync {
    /// Stable identifier of the underlying model.
    fn model_id(&self) -> &str;

    /// Output dimensionality; constant for the life of the embedder.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, one vector per input, in input order.
    fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;
}

/// `fastembed`-backed embedder running the model in-process.
///
/// `TextEmbedding::embed` takes `&mut self`, so the model sits behind a
/// mutex; batches from concurrent requests serialize here.
pub struct LocalEmbedder {
    model_id: String,
    dimension: usize,
    inner: Mutex<TextEmbedding>,
}

impl LocalEmbedder {
    pub fn new(model_id: &str) -> Result<Self, ApiError> {
        let (model, dimension) = resolve_model(model_id)?;

        let inner = TextEmbedding::try_new(
            InitOptions::new(model).with_show_download_progress(false),
        )
        .map_err(|e| {
            ApiError::Configuration(format!("failed to load embedding model {model_id}: {e}"))
        })?;

        Ok(Self {
            model_id: model_id.to_string(),
            dimension,
            inner: Mutex::new(inner),
        })
    }
}

impl Embedder for LocalEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let mut model = self
            .inner
            .lock()
            .map_err(|_| ApiError::Internal("embedding model mutex poisoned".to_string()))?;

        model
            .embed(inputs.to_vec(), None)
            .map_err(|e| ApiError::Internal(format!("embedding failed: {e}")))
    }
}

fn resolve_model(model_id: &str) -> Result<(EmbeddingModel, usize), ApiError> {
    match model_id {
        "all-minilm-l6-v2" => Ok((EmbeddingModel::AllMiniLML6V2, 384)),
        "bge-small-en-v1.5" => Ok((EmbeddingModel::BGESmallENV15, 384)),
        other => Err(ApiError::Configuration(format!(
            "unknown embedding model: {other}"
        ))),
    }
}
