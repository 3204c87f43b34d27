//! Centralized defaults for the form engine
//!
//! Single source of truth for the default values used by settings and by
//! the engine when a setting is absent.

/// Completion oracle defaults
pub mod llm {
    /// Default Ollama endpoint
    pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

    /// Default chat model
    pub const DEFAULT_MODEL: &str = "qwen3:4b-instruct-2507-q4_K_M";

    /// Default request timeout (ms) for a single HTTP call
    pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

    /// Retry attempts for transient failures
    pub const DEFAULT_MAX_RETRIES: u32 = 2;

    /// Initial retry backoff (ms), doubled each attempt
    pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 100;
}

/// Embedding defaults
pub mod embedding {
    pub const DEFAULT_MODEL: &str = "qwen3-embedding:0.6b";
    pub const DEFAULT_DIMENSION: usize = 1024;
}

/// Dialog defaults
pub mod form {
    /// Bounded wait around every completion-oracle call (ms)
    pub const DEFAULT_ORACLE_TIMEOUT_MS: u64 = 20_000;

    /// Nearest-neighbour score at or above which an utterance is an exit request
    pub const DEFAULT_EXIT_INTENT_THRESHOLD: f32 = 0.9;

    /// Language used when none is configured or detected
    pub const DEFAULT_LANGUAGE: &str = "English";
}
