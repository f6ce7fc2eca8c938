mod action;
mod author;
mod backend;
mod error;
mod event;
mod exchange;
mod generation;
mod loading;
mod message;
mod slash_commands;
mod textarea;
mod turn;

pub use action::*;
pub use author::*;
pub use backend::*;
pub use error::*;
pub use event::*;
pub use exchange::*;
pub use generation::*;
pub use loading::*;
pub use message::*;
pub use slash_commands::*;
pub use textarea::*;
pub use turn::*;
