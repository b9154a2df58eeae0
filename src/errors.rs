#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("AI provider error: {0}")]
    Ai(String),

    #[error("web search error: {0}")]
    Search(String),

    #[error("document error: {0}")]
    Document(String),

    #[error("{label} quota exhausted ({limit} calls)")]
    QuotaExhausted { label: String, limit: u32 },
}

impl AppError {
    /// Whether the error is a spent quota rather than a broken dependency.
    pub fn is_quota(&self) -> bool {
        matches!(self, AppError::QuotaExhausted { .. })
    }
}
