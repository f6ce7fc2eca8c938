#[cfg(test)]
#[path = "exchange_test.rs"]
mod tests;

use std::fmt;

use uuid::Uuid;

use super::ChatError;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ExchangeId(String);

impl ExchangeId {
    /// Generates a short identifier from the first two groups of a v4 uuid.
    pub fn generate() -> ExchangeId {
        let id = Uuid::new_v4()
            .to_string()
            .split('-')
            .take(2)
            .collect::<Vec<&str>>()
            .join("-");

        return ExchangeId(id);
    }

    pub fn as_str(&self) -> &str {
        return &self.0;
    }
}

impl From<&str> for ExchangeId {
    fn from(id: &str) -> ExchangeId {
        return ExchangeId(id.to_string());
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{}", self.0);
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExchangeStatus {
    Streaming,
    Complete,
    Cancelled,
    Failed,
}

/// One user prompt paired with its (possibly partial) assistant reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exchange {
    pub id: ExchangeId,
    pub user_text: String,
    pub assistant_text: String,
    status: ExchangeStatus,
    error: Option<ChatError>,
}

impl Exchange {
    pub fn new(id: ExchangeId, user_text: &str) -> Exchange {
        return Exchange {
            id,
            user_text: user_text.to_string(),
            assistant_text: "".to_string(),
            status: ExchangeStatus::Streaming,
            error: None,
        };
    }

    pub fn status(&self) -> ExchangeStatus {
        return self.status;
    }

    pub fn error(&self) -> Option<&ChatError> {
        return self.error.as_ref();
    }

    pub fn is_streaming(&self) -> bool {
        return self.status == ExchangeStatus::Streaming;
    }

    /// Appends a fragment to the reply. Returns false, leaving the reply
    /// untouched, once the exchange has settled.
    pub fn fold(&mut self, fragment: &str) -> bool {
        if !self.is_streaming() {
            return false;
        }

        self.assistant_text += fragment;
        return true;
    }

    pub fn complete(&mut self) -> bool {
        return self.settle(ExchangeStatus::Complete, None);
    }

    pub fn cancel(&mut self) -> bool {
        return self.settle(ExchangeStatus::Cancelled, None);
    }

    pub fn fail(&mut self, err: ChatError) -> bool {
        return self.settle(ExchangeStatus::Failed, Some(err));
    }

    /// Whether the exchange can be replayed to the model as history.
    pub fn is_settled_history(&self) -> bool {
        return matches!(
            self.status,
            ExchangeStatus::Complete | ExchangeStatus::Cancelled
        ) && !self.assistant_text.trim().is_empty();
    }

    fn settle(&mut self, status: ExchangeStatus, error: Option<ChatError>) -> bool {
        if !self.is_streaming() {
            return false;
        }

        self.status = status;
        self.error = error;
        return true;
    }
}
