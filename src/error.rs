/// Result alias for the render pipeline.
pub type RenderResult<T> = Result<T, RenderError>;

/// Failure of a single render call. Each variant names the stage that failed first.
///
/// `Preview` covers writing a `--preview-frame` PNG, which never reaches the encoder.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("preview error: {0}")]
    Preview(String),

    #[error("render cancelled")]
    Cancelled,
}

impl RenderError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    /// Wraps an adapter failure, keeping the whole context chain in the message.
    pub fn decode(err: anyhow::Error) -> Self {
        Self::Decode(format!("{err:#}"))
    }

    pub fn encode(err: anyhow::Error) -> Self {
        Self::Encode(format!("{err:#}"))
    }

    pub fn preview(err: anyhow::Error) -> Self {
        Self::Preview(format!("{err:#}"))
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
