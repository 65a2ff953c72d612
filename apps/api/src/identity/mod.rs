// Identity: credential and OAuth sign-in, registration, explicit provider linking.
// OAuth provider exchanges happen in the adapter; this module only reconciles
// the identities it reports.

pub mod handlers;
pub mod linking;
pub mod password;
pub mod reconcile;
