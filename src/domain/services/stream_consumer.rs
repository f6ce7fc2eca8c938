#[cfg(test)]
#[path = "stream_consumer_test.rs"]
mod tests;

use anyhow::Result;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::models::BackendPrompt;
use crate::domain::models::BackendRef;
use crate::domain::models::BackendResponse;
use crate::domain::models::ChatError;
use crate::domain::models::Event;
use crate::domain::models::ExchangeId;
use crate::domain::models::ResponseStatus;

/// Forwards responses for a single exchange. If it is dropped before a
/// terminal status went out, it sends a `StreamInterrupted` failure so the
/// exchange can never be left streaming.
struct CompletionGuard {
    exchange_id: ExchangeId,
    tx: mpsc::UnboundedSender<Event>,
    settled: bool,
}

impl CompletionGuard {
    fn new(exchange_id: ExchangeId, tx: mpsc::UnboundedSender<Event>) -> CompletionGuard {
        return CompletionGuard {
            exchange_id,
            tx,
            settled: false,
        };
    }

    fn send(&mut self, status: ResponseStatus) -> Result<()> {
        if status.is_terminal() {
            self.settled = true;
        }

        self.tx.send(Event::BackendPromptResponse(BackendResponse::new(
            self.exchange_id.clone(),
            status,
        )))?;

        return Ok(());
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        tracing::warn!(
            exchange_id = self.exchange_id.as_str(),
            "Stream worker stopped without a terminal status"
        );
        let _ = self.tx.send(Event::BackendPromptResponse(BackendResponse::new(
            self.exchange_id.clone(),
            ResponseStatus::Failed(ChatError::StreamInterrupted(
                "the reply stopped unexpectedly".to_string(),
            )),
        )));
    }
}

/// Drives one completion stream to its end, forwarding every fragment in
/// arrival order followed by exactly one terminal status. Cancellation wins
/// over any fragment that is ready at the same time.
pub async fn consume(
    backend: BackendRef,
    prompt: BackendPrompt,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<Event>,
) -> Result<()> {
    let mut guard = CompletionGuard::new(prompt.exchange_id.clone(), tx);

    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            guard.send(ResponseStatus::Cancelled)?;
            return Ok(());
        }
        res = backend.stream_completion(&prompt) => res,
    };

    let mut stream = match opened {
        Ok(stream) => stream,
        Err(err) => {
            tracing::error!(exchange_id = prompt.exchange_id.as_str(), error = ?err, "Completion request failed");
            guard.send(ResponseStatus::Failed(err))?;
            return Ok(());
        }
    };

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(exchange_id = prompt.exchange_id.as_str(), "Completion cancelled");
                guard.send(ResponseStatus::Cancelled)?;
                return Ok(());
            }
            item = stream.next() => match item {
                Some(Ok(fragment)) => {
                    if !fragment.is_empty() {
                        guard.send(ResponseStatus::Fragment(fragment))?;
                    }
                }
                Some(Err(err)) => {
                    tracing::error!(exchange_id = prompt.exchange_id.as_str(), error = ?err, "Completion stream failed");
                    guard.send(ResponseStatus::Failed(err))?;
                    return Ok(());
                }
                None => {
                    guard.send(ResponseStatus::Done)?;
                    return Ok(());
                }
            }
        }
    }
}
