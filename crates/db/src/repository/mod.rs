//! Repository functions, one per database operation.
//!
//! Every function takes a `&DbPool` and returns a `Result<T, DbError>`.
//! Pure SQL with no domain types.

pub mod automations;
pub mod connections;
pub mod steps;
pub mod webhooks;
