use thiserror::Error;

/// Failures that can end an exchange early. Cloneable so the stream worker
/// can hand them to the UI over a channel.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ChatError {
    /// The outbound request could not be sent, or was rejected before any
    /// output was streamed.
    #[error("request failed: {0}")]
    RequestFailed(String),
    /// The response stream broke or contained something undecodable.
    #[error("stream interrupted: {0}")]
    StreamInterrupted(String),
    /// Input or a message batch did not pass validation.
    #[error("validation failed: {0}")]
    ValidationFailed(String),
}
