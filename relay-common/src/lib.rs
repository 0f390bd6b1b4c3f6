//! Chat Relay Common Types
//!
//! Shared types used by the relay service and its clients.

pub mod chat;

pub use chat::{ChatRequest, ChatResponse, Content, ErrorBody, GenerationConfig, Part};
