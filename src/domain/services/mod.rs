pub mod actions;
mod app_state;
mod bubble;
mod bubble_list;
mod conversation;
pub mod events;
mod projection;
mod scroll;
#[cfg(test)]
mod scripted_backend;
pub mod stream_consumer;

pub use app_state::*;
pub use bubble::*;
pub use bubble_list::*;
pub use conversation::*;
pub use projection::*;
pub use scroll::*;
#[cfg(test)]
pub use scripted_backend::*;
