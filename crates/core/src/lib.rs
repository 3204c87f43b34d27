//! Core traits and types for the conversational form engine
//!
//! This crate provides foundational types used across all other crates:
//! - Oracle traits for pluggable backends (completion, embeddings)
//! - LLM request/response types
//! - Error types

pub mod error;
pub mod llm_types;
pub mod traits;

pub use error::{Error, Result};
pub use llm_types::{FinishReason, GenerateRequest, GenerateResponse, Message, Role, TokenUsage};
pub use traits::{cosine_similarity, Embedder, LanguageModel};
