#[cfg(test)]
#[path = "projection_test.rs"]
mod tests;

use super::Conversation;
use crate::domain::models::Author;
use crate::domain::models::Exchange;
use crate::domain::models::ExchangeStatus;
use crate::domain::models::Notice;
use crate::domain::models::Turn;
use crate::domain::models::TurnType;

fn reply_text(exchange: &Exchange) -> String {
    if !exchange.assistant_text.is_empty() {
        return exchange.assistant_text.to_string();
    }

    let placeholder = match exchange.status() {
        ExchangeStatus::Streaming => "...",
        ExchangeStatus::Complete => "(empty reply)",
        ExchangeStatus::Cancelled => "(stopped)",
        ExchangeStatus::Failed => "(no reply)",
    };

    return placeholder.to_string();
}

fn exchange_turns(exchange: &Exchange) -> Vec<Turn> {
    let id = &exchange.id;
    let mut turns = vec![Turn::new(
        &format!("{id}:user"),
        Author::User,
        TurnType::Normal,
        &exchange.user_text,
    )];

    let mut reply_type = TurnType::Normal;
    if exchange.status() == ExchangeStatus::Failed {
        reply_type = TurnType::Error;
    }
    turns.push(Turn::new(
        &format!("{id}:model"),
        Author::Model,
        reply_type,
        &reply_text(exchange),
    ));

    if let Some(err) = exchange.error() {
        turns.push(Turn::new(
            &format!("{id}:error"),
            Author::Gemchat,
            TurnType::Error,
            &format!("That reply didn't make it, {err}"),
        ));
    }

    return turns;
}

fn notice_turn(idx: usize, notice: &Notice) -> Turn {
    return Turn::new(
        &format!("notice:{idx}"),
        notice.author.clone(),
        notice.ttype,
        &notice.text,
    );
}

/// Maps the conversation, with notices interleaved at their anchors, to the
/// ordered list of bubbles to draw. Pure: equal input gives equal output.
pub fn project(conversation: &Conversation, notices: &[Notice]) -> Vec<Turn> {
    let mut turns = vec![];
    let mut notice_iter = notices.iter().enumerate().peekable();

    for (position, exchange) in conversation.exchanges().iter().enumerate() {
        while let Some((idx, notice)) = notice_iter.next_if(|(_, n)| return n.after <= position) {
            turns.push(notice_turn(idx, notice));
        }
        turns.extend(exchange_turns(exchange));
    }

    for (idx, notice) in notice_iter {
        turns.push(notice_turn(idx, notice));
    }

    return turns;
}
