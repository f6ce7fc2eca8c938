#[cfg(test)]
#[path = "app_state_test.rs"]
mod tests;

use anyhow::Result;
use ratatui::prelude::Rect;
use tokio::sync::mpsc;

use super::actions::help_text;
use super::project;
use super::BubbleList;
use super::Conversation;
use super::Scroll;
use crate::domain::models::Action;
use crate::domain::models::Author;
use crate::domain::models::BackendPrompt;
use crate::domain::models::BackendRef;
use crate::domain::models::BackendResponse;
use crate::domain::models::Loading;
use crate::domain::models::Notice;
use crate::domain::models::ResponseStatus;
use crate::domain::models::SlashCommand;
use crate::domain::models::TurnType;

pub const DEFAULT_EXPORT_PATH: &str = "gemchat-export.json";

pub struct AppState {
    pub bubble_list: BubbleList,
    pub conversation: Conversation,
    pub last_known_height: usize,
    pub last_known_width: usize,
    pub loading: Loading,
    pub notices: Vec<Notice>,
    pub scroll: Scroll,
}

impl AppState {
    pub async fn new(backend: &BackendRef, model_name: &str) -> Result<AppState> {
        let mut app_state = AppState {
            bubble_list: BubbleList::default(),
            conversation: Conversation::default(),
            last_known_height: 0,
            last_known_width: 0,
            loading: Loading::default(),
            notices: vec![],
            scroll: Scroll::default(),
        };

        app_state.add_notice(Notice::new(
            Author::Model,
            "Hey there! What can I do for you?",
        ));

        if let Err(err) = backend.health_check().await {
            app_state.add_notice(Notice::new_with_type(
                Author::Gemchat,
                TurnType::Error,
                &format!("Hey, it looks like I can't reach Gemini. Double check your API key and network before we start talking.\n\nError: {err}"),
            ));
            return Ok(app_state);
        }

        match backend.list_models().await {
            Ok(models) => {
                if !models.contains(&model_name.to_string()) {
                    app_state.add_notice(Notice::new_with_type(
                        Author::Gemchat,
                        TurnType::Error,
                        &format!("Model {model_name} doesn't exist. You can use `/modellist` to view all available models, and `/model NAME` to switch models."),
                    ));
                }
            }
            Err(err) => {
                tracing::warn!(error = ?err, "Failed to list models at startup");
            }
        }

        return Ok(app_state);
    }

    /// True while any exchange is still receiving its reply.
    pub fn is_loading(&self) -> bool {
        return self.conversation.in_progress().is_some();
    }

    pub fn add_notice(&mut self, mut notice: Notice) {
        notice.after = self.conversation.len();
        self.notices.push(notice);
        self.sync_dependants();
        self.scroll.last();
    }

    /// Runs slash commands. Returns `(should_break, should_continue)` for the
    /// UI loop. Neither is set when the input is a regular prompt.
    pub fn handle_slash_commands(
        &mut self,
        input: &str,
        tx: &mpsc::UnboundedSender<Action>,
    ) -> Result<(bool, bool)> {
        let command = match SlashCommand::parse(input) {
            Some(command) => command,
            None => return Ok((false, false)),
        };

        if command.is_quit() {
            return Ok((true, false));
        }

        self.add_notice(Notice::new(Author::User, input.trim()));

        if command.is_help() {
            self.add_notice(Notice::new(Author::Gemchat, &help_text()));
        } else if command.is_model_list() {
            tx.send(Action::ModelList())?;
        } else if command.is_model_set() {
            if let Some(name) = command.args.first() {
                tx.send(Action::ModelSet(name.to_string()))?;
            } else {
                self.add_notice(Notice::new_with_type(
                    Author::Gemchat,
                    TurnType::Error,
                    "You must specify a model name with `/model` or `/m`. Run `/help` for more details.",
                ));
            }
        } else if command.is_export() {
            let path = command
                .args
                .first()
                .map(|path| return path.to_string())
                .unwrap_or_else(|| return DEFAULT_EXPORT_PATH.to_string());
            tx.send(Action::ExportMessages(self.conversation.to_messages(), path))?;
        }

        return Ok((false, true));
    }

    /// Starts a new exchange for `input` and dispatches it to the backend.
    /// Returns false when the prompt is empty or another reply is still
    /// streaming. The conversation is left untouched and an error notice
    /// explains the rejection.
    pub fn submit_prompt(&mut self, input: &str, tx: &mpsc::UnboundedSender<Action>) -> Result<bool> {
        let exchange_id = match self.conversation.begin(input) {
            Ok(exchange_id) => exchange_id,
            Err(err) => {
                tracing::debug!(error = ?err, "Prompt rejected");
                self.add_notice(Notice::new_with_type(
                    Author::Gemchat,
                    TurnType::Error,
                    &format!("Your message wasn't sent, {err}."),
                ));
                return Ok(false);
            }
        };

        let history = self.conversation.history_before(&exchange_id);
        tx.send(Action::BackendRequest(BackendPrompt::new(
            exchange_id,
            input,
            history,
        )))?;

        self.sync_dependants();
        self.scroll.last();

        return Ok(true);
    }

    pub fn resubmit_last(&mut self, tx: &mpsc::UnboundedSender<Action>) -> Result<bool> {
        let last_prompt = match self.conversation.last() {
            Some(exchange) => exchange.user_text.to_string(),
            None => return Ok(false),
        };

        return self.submit_prompt(&last_prompt, tx);
    }

    /// Stops the streaming exchange, if any. The exchange is settled right
    /// away so late fragments are ignored. Returns false when nothing was
    /// streaming.
    pub fn abort(&mut self, tx: &mpsc::UnboundedSender<Action>) -> Result<bool> {
        let exchange_id = match self.conversation.in_progress() {
            Some(exchange) => exchange.id.clone(),
            None => return Ok(false),
        };

        tx.send(Action::BackendAbort(exchange_id.clone()))?;
        self.conversation.cancel(&exchange_id);
        self.sync_dependants();

        return Ok(true);
    }

    pub fn handle_backend_response(&mut self, res: BackendResponse) {
        let exchange_id = &res.exchange_id;
        let terminal = res.status.is_terminal();
        let changed = match res.status {
            ResponseStatus::Fragment(text) => self.conversation.fold(exchange_id, &text),
            ResponseStatus::Done => self.conversation.complete(exchange_id),
            ResponseStatus::Cancelled => self.conversation.cancel(exchange_id),
            ResponseStatus::Failed(err) => self.conversation.fail(exchange_id, err),
        };

        if !changed {
            tracing::debug!(
                exchange_id = exchange_id.as_str(),
                "Ignored response for a settled or unknown exchange"
            );
            return;
        }

        self.sync_dependants();
        if terminal {
            self.scroll.last();
        }
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.last_known_width = rect.width.into();
        self.last_known_height = rect.height.into();
        self.sync_dependants();
    }

    fn sync_dependants(&mut self) {
        let turns = project(&self.conversation, &self.notices);
        self.bubble_list.set_turns(&turns, self.last_known_width);

        self.scroll
            .set_state(self.bubble_list.len(), self.last_known_height);

        if self.is_loading() {
            self.scroll.last();
        }
    }
}
