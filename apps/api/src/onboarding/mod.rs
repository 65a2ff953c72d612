// Onboarding: role selection, questionnaires and the routing decision that
// ties them together.

pub mod handlers;
pub mod profile;
pub mod roles;
pub mod router;
pub mod validation;
