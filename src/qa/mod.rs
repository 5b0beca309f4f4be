//! Question answering over the knowledge base.
//!
//! `Answerer` ties retrieval and the hosted chat model together: fetch
//! the top-k chunks, build the grounding prompt, make one model call,
//! and hand back the answer together with the contexts that produced it.

pub mod prompt;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use prompt::{build_prompt, render_context_block, NO_CONTEXT_PLACEHOLDER};

use crate::core::errors::ApiError;
use crate::kb::{Context, KnowledgeBase};
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};

const SYSTEM_INSTRUCTION: &str =
    "You are a company documentation assistant. Answer strictly from the \
     context provided in the user message; never use outside knowledge and \
     never invent facts that are not in the context.";

/// One answered question: the model's text plus the contexts that were
/// put in front of it, for citation display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub contexts: Vec<Context>,
}

pub struct Answerer {
    kb: Arc<KnowledgeBase>,
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f64,
    top_k: usize,
}

impl Answerer {
    pub fn new(
        kb: Arc<KnowledgeBase>,
        provider: Arc<dyn LlmProvider>,
        model: String,
        temperature: f64,
        top_k: usize,
    ) -> Self {
        Self {
            kb,
            provider,
            model,
            temperature,
            top_k,
        }
    }

    /// Startup credential check. A rejected key is fatal; an unreachable
    /// endpoint only logs a warning and lets the service come up.
    pub async fn verify_credentials(&self) -> Result<(), ApiError> {
        if self.provider.health_check().await? {
            tracing::info!("Hosted model endpoint reachable ({})", self.provider.name());
        } else {
            tracing::warn!(
                "Hosted model endpoint unreachable; questions will fail until it is back"
            );
        }
        Ok(())
    }

    /// Answer one question from the indexed documents.
    ///
    /// Model errors propagate unrecovered: no retry, no partial answer.
    /// An empty index is not an error: the model is told that no
    /// documents were found and answers accordingly.
    pub async fn answer(&self, question: &str) -> Result<Answer, ApiError> {
        let contexts = self.kb.retrieve(question, self.top_k).await?;
        let prompt = build_prompt(question, &contexts);

        let request = ChatRequest::new(vec![
            ChatMessage::system(SYSTEM_INSTRUCTION),
            ChatMessage::user(prompt),
        ])
        .with_temperature(self.temperature);

        let text = self.provider.chat(request, &self.model).await?;

        Ok(Answer { text, contexts })
    }
}
