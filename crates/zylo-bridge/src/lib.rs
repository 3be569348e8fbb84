//! Embedded-content bridge for the Zylo mobile shell.
//!
//! The web application runs inside an opaque embedded view; this crate owns
//! the JSON message protocol crossing that boundary, the instrumentation
//! scripts injected into the content (data, not behavior), and the token
//! bridge that surfaces the auth token stored by the content.

mod scripts;
mod shell_message;
mod token_bridge;

pub use scripts::{
    theme_change_listener_script, theme_probe_script, token_extraction_script,
    DEFAULT_CONFIG_STORAGE_KEY, DEFAULT_STORAGE_POLL_MS, DEFAULT_TOKEN_STORAGE_KEY,
};
pub use shell_message::{parse_shell_message, ShellMessage, ThemeMode};
pub use token_bridge::{EmbeddedContent, TokenBridge, TokenBridgeConfig};
