//! Inbound message protocol from the embedded content.
//!
//! Messages arrive as JSON strings posted over the generic postMessage-style
//! channel. The catalog is fixed; anything malformed is swallowed by the
//! parser because polling re-tries naturally.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported embedded-content theme modes.
pub enum ThemeMode {
    Light,
    Dark,
}

impl ThemeMode {
    /// Accepts only the two modes the content emits; everything else is noise.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
/// Discriminated union over the embedded-content message catalog.
pub enum ShellMessage {
    #[serde(rename = "token")]
    Token { value: String },
    #[serde(rename = "theme")]
    Theme {
        mode: String,
        #[serde(default)]
        error: Option<String>,
    },
    #[serde(rename = "console.log")]
    ConsoleLog {
        #[serde(default)]
        data: Value,
    },
    #[serde(rename = "console.info")]
    ConsoleInfo {
        #[serde(default)]
        data: Value,
    },
    #[serde(rename = "console.warn")]
    ConsoleWarn {
        #[serde(default)]
        data: Value,
    },
    #[serde(rename = "console.error")]
    ConsoleError {
        #[serde(default)]
        data: Value,
    },
    #[serde(rename = "login.error")]
    LoginError {
        #[serde(default)]
        data: Value,
    },
    #[serde(rename = "global.error")]
    GlobalError {
        #[serde(default)]
        data: Value,
    },
}

impl ShellMessage {
    /// Returns the parsed theme mode for theme messages with a valid mode.
    pub fn theme_mode(&self) -> Option<ThemeMode> {
        match self {
            Self::Theme { mode, .. } => ThemeMode::parse(mode),
            _ => None,
        }
    }

    /// Best-effort human-readable description of an error payload.
    pub fn error_text(&self) -> Option<String> {
        let data = match self {
            Self::LoginError { data } | Self::GlobalError { data } => data,
            _ => return None,
        };
        let text = data
            .get("error")
            .or_else(|| data.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("Unknown error");
        Some(text.to_string())
    }
}

/// Parses a raw postMessage payload; malformed input yields `None`.
pub fn parse_shell_message(raw: &str) -> Option<ShellMessage> {
    serde_json::from_str::<ShellMessage>(raw).ok()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{parse_shell_message, ShellMessage, ThemeMode};

    #[test]
    fn unit_parse_token_message() {
        let message = parse_shell_message(r#"{"type":"token","value":"tok123"}"#)
            .expect("token message parses");
        match message {
            ShellMessage::Token { value } => assert_eq!(value, "tok123"),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn unit_parse_theme_message_accepts_known_modes_only() {
        let dark = parse_shell_message(r#"{"type":"theme","mode":"dark"}"#).expect("parses");
        assert_eq!(dark.theme_mode(), Some(ThemeMode::Dark));

        let bogus = parse_shell_message(r#"{"type":"theme","mode":"sepia"}"#).expect("parses");
        assert_eq!(bogus.theme_mode(), None);
    }

    #[test]
    fn unit_parse_login_error_extracts_message_text() {
        let raw = json!({
            "type": "login.error",
            "data": { "status": 401, "error": "invalid credentials" }
        })
        .to_string();
        let message = parse_shell_message(&raw).expect("parses");
        assert_eq!(message.error_text().as_deref(), Some("invalid credentials"));
    }

    #[test]
    fn unit_parse_global_error_without_fields_falls_back() {
        let message = parse_shell_message(r#"{"type":"global.error","data":{}}"#).expect("parses");
        assert_eq!(message.error_text().as_deref(), Some("Unknown error"));
    }

    #[test]
    fn spec_malformed_payloads_are_swallowed() {
        assert!(parse_shell_message("not json").is_none());
        assert!(parse_shell_message(r#"{"type":"unknown.kind"}"#).is_none());
        assert!(parse_shell_message(r#"{"value":"missing tag"}"#).is_none());
    }
}
