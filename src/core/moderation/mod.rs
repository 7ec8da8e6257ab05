// Core moderation module - the anti-spam decision and action pipeline.
//
// inbound event -> normalizer -> eligibility -> [external scoring]
//   -> templates -> punishment -> cleanup

pub mod cleanup;
pub mod eligibility;
pub mod moderation_models;
pub mod moderation_options;
pub mod moderation_service;
pub mod normalizer;
pub mod permissions;
pub mod ports;
pub mod punishment;
pub mod templates;

#[cfg(test)]
pub(crate) mod test_support;

pub use cleanup::SweepReport;
pub use eligibility::PropagateRejection;
pub use moderation_models::*;
pub use moderation_options::*;
pub use moderation_service::*;
pub use permissions::PermissionSet;
pub use ports::*;
pub use punishment::{MissingAuthority, PunishmentOutcome, PunishmentRequest, PunitiveAction};
pub use templates::{RenderedMessage, RichContent, SubstitutionContext};
