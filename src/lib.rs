//! # rekey
//!
//! Organization recovery key validation and group re-keying for a
//! passbolt-style password manager.

pub mod api;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod entity;
pub mod group;
pub mod keys;
pub mod recovery;
pub mod ui;
