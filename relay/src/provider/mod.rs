//! Chat provider abstraction layer.
//!
//! This module defines the `ChatProvider` trait that hides the concrete
//! generative-language backend from the relay handler.

mod gemini;

pub use gemini::GeminiProvider;

use async_trait::async_trait;
use relay_common::{Content, GenerationConfig};

use crate::error::Result;

/// Everything a provider needs to compute the next reply, besides the
/// message itself.
#[derive(Clone, Copy)]
pub struct ChatSession<'a> {
    pub api_key: &'a str,
    /// Fixed model identifier; clients cannot choose it.
    pub model: &'a str,
    /// Prior turns, oldest first.
    pub history: &'a [Content],
    pub generation_config: GenerationConfig,
}

/// Primary trait for chat providers.
///
/// Implementations send one user message in the context of a session and
/// return the plain-text reply.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Unique identifier for this provider type (e.g., "gemini").
    fn provider_type(&self) -> &'static str;

    /// Send `message` as the next user turn and wait for the full reply.
    async fn send_message(&self, session: &ChatSession<'_>, message: &str) -> Result<String>;
}
