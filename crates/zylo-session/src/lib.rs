//! Session orchestration for the Zylo mobile shell.
//!
//! The coordinator is the single writer of the session token. It wires token
//! acquisition into channel initialization, arms device registration per
//! `(auth_token, push_token)` pair, tracks app-phase transitions, and owns the
//! single error banner shown over the embedded content.

mod coordinator;

pub use coordinator::{
    AppPhase, Banner, BannerKind, SessionConfig, SessionCoordinator,
    DEFAULT_STATUS_POLL_INTERVAL_MS,
};
