// Résumé evaluation and optimization.
// Implements: prompt templates, tolerant response parsing, the two user actions.
// All LLM calls go through llm_client; nothing here talks to Gemini directly.

pub mod handlers;
pub mod interpreter;
pub mod pipeline;
pub mod prompts;
