//! dropbot - Telegram front end for the mediadrop pipeline
//!
//! - `cli`: Command-line arguments
//! - `telegram`: Bot setup, command routing and the chat-bound notifier

pub mod cli;
pub mod telegram;
