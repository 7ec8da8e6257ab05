pub mod conversions;
pub mod serenity_client;
pub mod spam_handler;

pub use serenity_client::SerenityChatClient;
pub use spam_handler::{handle_message_for_spam, AntiSpamHandler};
