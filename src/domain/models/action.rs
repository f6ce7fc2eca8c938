use super::BackendPrompt;
use super::ExchangeId;
use super::Message;

pub enum Action {
    BackendAbort(ExchangeId),
    BackendRequest(BackendPrompt),
    ExportMessages(Vec<Message>, String),
    ModelList(),
    ModelSet(String),
}
