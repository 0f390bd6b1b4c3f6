//! Chat Relay - keeps the provider API key server-side and relays browser
//! chat requests to Gemini.

pub mod api;
pub mod config;
pub mod error;
pub mod provider;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use provider::{ChatProvider, ChatSession, GeminiProvider};
pub use state::AppState;
