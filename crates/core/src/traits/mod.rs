//! Core traits for the form engine
//!
//! External collaborators are consumed through these traits so the engine
//! stays agnostic of the concrete backends:
//!
//! ```text
//! Language Models:
//!   - LanguageModel: text completion (extraction, confirmation, prose)
//!
//! Embeddings:
//!   - Embedder: dense vectors for nearest-neighbour lookups
//! ```

mod embedding;
mod llm;

pub use embedding::{cosine_similarity, Embedder};
pub use llm::LanguageModel;
