#[cfg(test)]
#[path = "actions_test.rs"]
mod tests;

use std::collections::HashMap;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::stream_consumer;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Action;
use crate::domain::models::Author;
use crate::domain::models::BackendRef;
use crate::domain::models::Event;
use crate::domain::models::ExchangeId;
use crate::domain::models::Message;
use crate::domain::models::Notice;
use crate::domain::models::TurnType;

pub fn help_text() -> String {
    let text = r#"
COMMANDS:
- /modellist (/ml) - Lists all available Gemini models that can generate content.
- /model (/m) [MODEL_NAME,MODEL_INDEX] - Sets the specified model as the active model. You can pass either the model name, or the index from /modellist
- /export (/x) [PATH?] - Writes the conversation as a JSON message batch. Defaults to ./gemchat-export.json
- /quit /exit (/q) - Exit Gemchat.
- /help (/h) - Provides this help menu.

HOTKEYS:
- Up arrow - Scroll up
- Down arrow - Scroll down
- CTRL+U - Page up
- CTRL+D - Page down
- CTRL+C - Stop the reply currently streaming in, otherwise exit.
- CTRL+R - Resubmit your last message to the backend.
        "#;

    return text.trim().to_string();
}

fn notice(tx: &mpsc::UnboundedSender<Event>, author: Author, text: &str) -> Result<()> {
    tx.send(Event::BackendMessage(Notice::new(author, text)))?;
    return Ok(());
}

fn notice_error(tx: &mpsc::UnboundedSender<Event>, text: &str) -> Result<()> {
    tx.send(Event::BackendMessage(Notice::new_with_type(
        Author::Gemchat,
        TurnType::Error,
        text,
    )))?;
    return Ok(());
}

async fn sorted_models(backend: &BackendRef) -> Result<Vec<String>> {
    let mut models = backend.list_models().await?;
    models.sort();
    return Ok(models);
}

async fn model_list(backend: &BackendRef, tx: &mpsc::UnboundedSender<Event>) -> Result<()> {
    let models = match sorted_models(backend).await {
        Ok(models) => models,
        Err(err) => {
            tracing::error!(error = ?err, "Failed to list models");
            return notice_error(tx, &format!("Failed to list models: {err}"));
        }
    };

    let res = models
        .iter()
        .enumerate()
        .map(|(idx, model)| {
            let n = idx + 1;
            return format!("- ({n}) {model}");
        })
        .collect::<Vec<String>>();

    return notice(tx, Author::Gemchat, &res.join("\n"));
}

async fn model_set(
    backend: &BackendRef,
    tx: &mpsc::UnboundedSender<Event>,
    name: &str,
) -> Result<()> {
    let models = match sorted_models(backend).await {
        Ok(models) => models,
        Err(err) => {
            tracing::error!(error = ?err, "Failed to list models");
            return notice_error(tx, &format!("Failed to list models: {err}"));
        }
    };

    let mut model_name = name.trim_start_matches("models/").to_string();
    if let Ok(idx) = model_name.parse::<usize>() {
        if idx < 1 || idx > models.len() {
            return notice_error(
                tx,
                &format!("{idx} is not a valid index from the model list."),
            );
        }
        model_name = models[idx - 1].to_string();
    }

    if !models.contains(&model_name) {
        return notice_error(
            tx,
            &format!("No model named {model_name} found. Did you mistype it?"),
        );
    }

    Config::set(ConfigKey::Model, &model_name);
    tracing::info!(model = model_name.as_str(), "Model changed");

    return notice(
        tx,
        Author::Model,
        &format!("{model_name} has entered the chat."),
    );
}

async fn export_messages(
    messages: Vec<Message>,
    path: &str,
    tx: &mpsc::UnboundedSender<Event>,
) -> Result<()> {
    let payload = match Message::serialize_batch(&messages) {
        Ok(payload) => payload,
        Err(err) => {
            return notice_error(tx, &format!("Export failed: {err}"));
        }
    };

    if let Err(err) = tokio::fs::write(path, payload).await {
        tracing::error!(error = ?err, path = path, "Failed to write export");
        return notice_error(tx, &format!("Export failed: {err}"));
    }

    return notice(
        tx,
        Author::Gemchat,
        &format!("Exported {} messages to {path}", messages.len()),
    );
}

struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<Result<()>>,
}

pub struct ActionsService {}

impl ActionsService {
    pub async fn start(
        backend: BackendRef,
        tx: mpsc::UnboundedSender<Event>,
        rx: &mut mpsc::UnboundedReceiver<Action>,
    ) -> Result<()> {
        let mut workers: HashMap<ExchangeId, Worker> = HashMap::new();

        while let Some(action) = rx.recv().await {
            workers.retain(|_, worker| return !worker.handle.is_finished());

            match action {
                Action::BackendAbort(exchange_id) => {
                    if let Some(worker) = workers.get(&exchange_id) {
                        tracing::debug!(exchange_id = exchange_id.as_str(), "Aborting worker");
                        worker.cancel.cancel();
                    }
                }
                Action::BackendRequest(prompt) => {
                    let exchange_id = prompt.exchange_id.clone();
                    let cancel = CancellationToken::new();
                    let handle = tokio::spawn(stream_consumer::consume(
                        backend.clone(),
                        prompt,
                        cancel.clone(),
                        tx.clone(),
                    ));

                    workers.insert(exchange_id, Worker { cancel, handle });
                }
                Action::ExportMessages(messages, path) => {
                    export_messages(messages, &path, &tx).await?;
                }
                Action::ModelList() => {
                    model_list(&backend, &tx).await?;
                }
                Action::ModelSet(name) => {
                    model_set(&backend, &tx, &name).await?;
                }
            }
        }

        for worker in workers.values() {
            worker.cancel.cancel();
        }

        return Ok(());
    }
}
