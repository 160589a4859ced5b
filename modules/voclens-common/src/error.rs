use thiserror::Error;

/// One HTTP(S) retrieval failing. Recoverable: a failed fetch costs the
/// job one source, never the job itself.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Fetch timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error (status {status})")]
    Http { status: u16 },

    #[error("Network error: {0}")]
    Network(String),
}

/// Analysis-stage failures. Both are fatal to the job and never retried
/// automatically; everything recoverable travels as a per-source outcome
/// instead.
#[derive(Debug, Error)]
pub enum VocLensError {
    /// Model response missing or violating the required report shape.
    #[error("Analysis schema error: {0}")]
    AnalysisSchema(String),

    /// Hosted model call failed (HTTP error, timeout, malformed JSON).
    #[error("Model call error: {0}")]
    ModelCall(String),
}
