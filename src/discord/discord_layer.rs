// Discord layer - serenity adapters for the moderation core.

#[path = "moderation/mod.rs"]
pub mod moderation;

pub use moderation::{AntiSpamHandler, SerenityChatClient};
