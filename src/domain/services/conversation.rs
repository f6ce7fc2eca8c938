#[cfg(test)]
#[path = "conversation_test.rs"]
mod tests;

use crate::domain::models::ChatError;
use crate::domain::models::Exchange;
use crate::domain::models::ExchangeId;
use crate::domain::models::Message;

/// Ordered, append-only record of the session's exchanges. Updates address
/// exchanges by ID, never by position.
#[derive(Default)]
pub struct Conversation {
    exchanges: Vec<Exchange>,
}

impl Conversation {
    pub fn len(&self) -> usize {
        return self.exchanges.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.exchanges.is_empty();
    }

    pub fn exchanges(&self) -> &[Exchange] {
        return &self.exchanges;
    }

    pub fn get(&self, id: &ExchangeId) -> Option<&Exchange> {
        return self.exchanges.iter().find(|e| return &e.id == id);
    }

    pub fn last(&self) -> Option<&Exchange> {
        return self.exchanges.last();
    }

    /// The exchange currently receiving fragments, if any.
    pub fn in_progress(&self) -> Option<&Exchange> {
        return self.exchanges.iter().find(|e| return e.is_streaming());
    }

    /// Appends a new exchange with an empty reply. Only one exchange may
    /// stream at a time.
    pub fn begin(&mut self, prompt: &str) -> Result<ExchangeId, ChatError> {
        if prompt.trim().is_empty() {
            return Err(ChatError::ValidationFailed(
                "prompt must not be empty".to_string(),
            ));
        }

        if let Some(exchange) = self.in_progress() {
            return Err(ChatError::ValidationFailed(format!(
                "exchange {} is still streaming",
                exchange.id
            )));
        }

        let id = ExchangeId::generate();
        self.exchanges.push(Exchange::new(id.clone(), prompt));

        return Ok(id);
    }

    /// Returns false when the exchange is unknown or already settled.
    pub fn fold(&mut self, id: &ExchangeId, fragment: &str) -> bool {
        return match self.get_mut(id) {
            Some(exchange) => exchange.fold(fragment),
            None => false,
        };
    }

    pub fn complete(&mut self, id: &ExchangeId) -> bool {
        return match self.get_mut(id) {
            Some(exchange) => exchange.complete(),
            None => false,
        };
    }

    pub fn cancel(&mut self, id: &ExchangeId) -> bool {
        return match self.get_mut(id) {
            Some(exchange) => exchange.cancel(),
            None => false,
        };
    }

    pub fn fail(&mut self, id: &ExchangeId, err: ChatError) -> bool {
        return match self.get_mut(id) {
            Some(exchange) => exchange.fail(err),
            None => false,
        };
    }

    /// Settled exchanges before `id` that can be replayed as model context.
    pub fn history_before(&self, id: &ExchangeId) -> Vec<Exchange> {
        return self
            .exchanges
            .iter()
            .take_while(|e| return &e.id != id)
            .filter(|e| return e.is_settled_history())
            .cloned()
            .collect();
    }

    pub fn to_messages(&self) -> Vec<Message> {
        return self
            .exchanges
            .iter()
            .flat_map(Message::from_exchange)
            .collect();
    }

    fn get_mut(&mut self, id: &ExchangeId) -> Option<&mut Exchange> {
        return self.exchanges.iter_mut().find(|e| return &e.id == id);
    }
}
