pub type TilefieldResult<T> = Result<T, TilefieldError>;

#[derive(thiserror::Error, Debug)]
pub enum TilefieldError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("gpu error: {0}")]
    Gpu(String),

    #[error("render queue is full ({0} jobs pending)")]
    QueueFull(usize),

    #[error("image error: {0}")]
    Image(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TilefieldError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn gpu(msg: impl Into<String>) -> Self {
        Self::Gpu(msg.into())
    }

    pub fn image(msg: impl Into<String>) -> Self {
        Self::Image(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

/// Check a caller precondition without aborting.
///
/// A failed check is logged at `warn` with the operation name and surfaces as
/// [`TilefieldError::InvalidArgument`].
pub(crate) fn soft_assert(cond: bool, op: &str, msg: &str) -> TilefieldResult<()> {
    if cond {
        return Ok(());
    }
    tracing::warn!(op, "soft assertion failed: {msg}");
    Err(TilefieldError::invalid_argument(format!("{op}: {msg}")))
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
