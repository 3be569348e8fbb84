//! Foundational low-level utilities shared across Zylo shell crates.
//!
//! Provides time utilities and the file-backed vault holding the single
//! persisted auth token.

pub mod time_utils;
pub mod token_vault;

pub use time_utils::current_unix_timestamp_ms;
pub use token_vault::TokenVault;
