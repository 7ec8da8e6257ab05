// Anti-spam moderation pipeline for Discord-style chat platforms.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic): eligibility, templates, punishments
// - `infra/` = Implementations of core traits that don't need a chat platform
// - `discord/` = serenity adapters (REST client, entity conversions, event glue)
//
// The crate doesn't own a gateway connection. A host event loop builds a
// `ModerationService` and feeds it inbound message events.

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
pub mod core;
#[path = "discord/discord_layer.rs"]
pub mod discord;
#[path = "infra/infra_layer.rs"]
pub mod infra;

pub use crate::core::moderation::{
    AntiSpamOptions, ModerationError, ModerationService, PropagateOutcome, PropagateRejection,
};
