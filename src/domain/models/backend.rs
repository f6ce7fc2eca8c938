#[cfg(test)]
#[path = "backend_test.rs"]
mod tests;

use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;

use super::Author;
use super::ChatError;
use super::Exchange;
use super::ExchangeId;

pub struct BackendPrompt {
    pub exchange_id: ExchangeId,
    pub text: String,
    /// Settled exchanges preceding this prompt, oldest first.
    pub history: Vec<Exchange>,
}

impl BackendPrompt {
    pub fn new(exchange_id: ExchangeId, text: &str, history: Vec<Exchange>) -> BackendPrompt {
        return BackendPrompt {
            exchange_id,
            text: text.to_string(),
            history,
        };
    }

    /// Flattens history plus the new prompt into alternating turns.
    pub fn turns(&self) -> Vec<(Author, String)> {
        let mut turns = self
            .history
            .iter()
            .flat_map(|exchange| {
                return [
                    (Author::User, exchange.user_text.to_string()),
                    (Author::Model, exchange.assistant_text.to_string()),
                ];
            })
            .collect::<Vec<(Author, String)>>();

        turns.push((Author::User, self.text.to_string()));
        return turns;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponseStatus {
    Fragment(String),
    Done,
    Cancelled,
    Failed(ChatError),
}

impl ResponseStatus {
    pub fn is_terminal(&self) -> bool {
        return !matches!(self, ResponseStatus::Fragment(_));
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendResponse {
    pub exchange_id: ExchangeId,
    pub status: ResponseStatus,
}

impl BackendResponse {
    pub fn new(exchange_id: ExchangeId, status: ResponseStatus) -> BackendResponse {
        return BackendResponse {
            exchange_id,
            status,
        };
    }
}

/// Finite, non-restartable sequence of reply fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

#[async_trait]
pub trait Backend {
    /// Used at startup to verify all configurations are available to work with
    /// the backend.
    async fn health_check(&self) -> Result<()>;

    /// Called when using the `/modellist` slash commands to provide all
    /// available models for the backend.
    async fn list_models(&self) -> Result<Vec<String>>;

    /// Opens a streaming completion. Fragments are yielded in the order the
    /// remote side emits them and the stream ends when the reply is done.
    ///
    /// Failures to open the request are `ChatError::RequestFailed`, failures
    /// while reading are yielded through the stream.
    async fn stream_completion(&self, prompt: &BackendPrompt) -> Result<FragmentStream, ChatError>;
}

pub type BackendRef = Arc<dyn Backend + Send + Sync>;
