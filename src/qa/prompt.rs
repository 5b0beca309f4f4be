//! Grounding prompt assembly.
//!
//! The instruction text is a fixed template: the model is told to answer
//! only from the retrieved context, to say so when the context does not
//! hold the answer, and to cite its sources. Nothing here is
//! configurable at runtime.

use crate::kb::Context;

/// Context block used when retrieval comes back empty.
pub const NO_CONTEXT_PLACEHOLDER: &str =
    "No relevant documents were found in the knowledge base.";

/// Render retrieved contexts into the prompt's context block,
/// best match first.
pub fn render_context_block(contexts: &[Context]) -> String {
    if contexts.is_empty() {
        return NO_CONTEXT_PLACEHOLDER.to_string();
    }

    contexts
        .iter()
        .map(|context| format!("Source: {}\nContent: {}", context.source, context.text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Assemble the full grounding prompt for one question.
pub fn build_prompt(question: &str, contexts: &[Context]) -> String {
    let context_block = render_context_block(contexts);

    format!(
        "Use the context below to answer the question.\n\
         \n\
         Context:\n\
         {context_block}\n\
         \n\
         Question: {question}\n\
         \n\
         Answer using only the information in the context. If the context does \
         not contain the answer, say that you are not sure instead of guessing. \
         End your answer with a short list of the sources you used."
    )
}
