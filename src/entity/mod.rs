//! Typed API entities with explicit validation.
//!
//! Every entity is read from a `serde_json::Value` by a `from_value`
//! function that reports all field-level errors at once.

pub mod account_recovery;
pub mod dry_run;
pub mod gpgkey;
pub mod group;
pub mod needed_secret;
pub mod secret;
pub mod validation;

pub use validation::{EntityValidationError, FieldError, Rule};
