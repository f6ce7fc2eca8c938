#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::ChatError;
use super::Exchange;

/// Wire shape for transmitted chat messages. Exchanges are flattened into
/// this form when exported.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub text: String,
    pub is_user_message: bool,
}

impl Message {
    pub fn from_exchange(exchange: &Exchange) -> Vec<Message> {
        return vec![
            Message {
                id: format!("{}-user", exchange.id),
                text: exchange.user_text.to_string(),
                is_user_message: true,
            },
            Message {
                id: format!("{}-model", exchange.id),
                text: exchange.assistant_text.to_string(),
                is_user_message: false,
            },
        ];
    }

    /// Validates a JSON array of messages as a single batch. One bad entry
    /// rejects the whole batch.
    pub fn validate_batch(payload: &str) -> Result<Vec<Message>, ChatError> {
        let messages: Vec<Message> = serde_json::from_str(payload)
            .map_err(|err| return ChatError::ValidationFailed(err.to_string()))?;

        return Ok(messages);
    }

    pub fn serialize_batch(messages: &[Message]) -> Result<String, ChatError> {
        let payload = serde_json::to_string_pretty(messages)
            .map_err(|err| return ChatError::ValidationFailed(err.to_string()))?;

        // Round trip through validation so exports always satisfy the contract.
        Message::validate_batch(&payload)?;

        return Ok(payload);
    }
}
