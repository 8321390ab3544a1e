//! Diagnostics collected while parsing in tolerant mode.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticCategory {
    Warning,
    Error,
}

pub mod diagnostic_codes {
    pub const UNEXPECTED_TOKEN: u32 = 1001;
    pub const UNTERMINATED_STRING: u32 = 1002;
    pub const UNTERMINATED_COMMENT: u32 = 1003;
    pub const UNTERMINATED_REGEX: u32 = 1004;
    pub const INVALID_CHARACTER: u32 = 1005;
    pub const NESTING_TOO_DEEP: u32 = 1006;
    pub const INVALID_ASSIGNMENT_TARGET: u32 = 1007;
}

/// Message templates; `{0}`, `{1}` are filled by [`format_message`].
pub mod diagnostic_messages {
    pub const EXPECTED_BUT_FOUND: &str = "Expected {0} but found {1}.";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub code: u32,
    pub start: u32,
    pub length: u32,
    pub message_text: String,
}

impl Diagnostic {
    pub fn error(start: u32, length: u32, message: impl Into<String>, code: u32) -> Self {
        Self {
            category: DiagnosticCategory::Error,
            code,
            start,
            length,
            message_text: message.into(),
        }
    }
}

pub fn format_message(message: &str, args: &[&str]) -> String {
    let mut result = message.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{i}}}"), arg);
    }
    result
}
