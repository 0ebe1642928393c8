//! Group membership updates and the re-encryption of shared secrets for
//! newly added members.

pub mod fanout;
pub mod needs;
pub mod update;

pub use fanout::{encrypt_for_targets, FanoutError};
pub use needs::compute_missing_secrets;
pub use update::{prepare_payload, GroupUpdateError, GroupUpdateOrchestrator, GroupUpdateState};
