//! Scanner state machine.
//!
//! The scanner produces one token at a time on demand. A `/` is always
//! scanned as a division operator first; the parser calls
//! [`ScannerState::re_scan_slash_token`] when it is in expression position and
//! the slash actually starts a regular expression literal.

use crate::SyntaxKind;
use hoist_common::diagnostics::diagnostic_codes;
use hoist_common::{CommentRange, Diagnostic, Span};
use serde::Serialize;

/// A scanned token with its source range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: SyntaxKind,
    pub span: Span,
}

/// Saved scanner position for speculative look-ahead.
#[derive(Clone, Copy, Debug)]
pub struct ScannerSnapshot {
    pos: usize,
    token: SyntaxKind,
    token_start: usize,
    preceding_line_break: bool,
    comment_count: usize,
    diagnostic_count: usize,
}

pub struct ScannerState<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    token: SyntaxKind,
    token_start: usize,
    preceding_line_break: bool,
    collect_comments: bool,
    comments: Vec<CommentRange>,
    diagnostics: Vec<Diagnostic>,
}

#[inline]
fn is_line_terminator(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

#[inline]
fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '$' || ch == '_' || (!ch.is_ascii() && ch.is_alphabetic())
}

#[inline]
fn is_identifier_part(ch: char) -> bool {
    is_identifier_start(ch)
        || ch.is_ascii_digit()
        || (!ch.is_ascii() && ch.is_alphanumeric())
        || ch == '\u{200c}'
        || ch == '\u{200d}'
}

impl<'a> ScannerState<'a> {
    pub fn new(text: &'a str) -> Self {
        ScannerState {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            token: SyntaxKind::Unknown,
            token_start: 0,
            preceding_line_break: false,
            collect_comments: false,
            comments: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Record comment ranges while skipping trivia.
    pub fn set_collect_comments(&mut self, collect: bool) {
        self.collect_comments = collect;
    }

    pub fn source_text(&self) -> &'a str {
        self.text
    }

    #[inline]
    pub fn token(&self) -> SyntaxKind {
        self.token
    }

    #[inline]
    pub fn token_start(&self) -> u32 {
        self.token_start as u32
    }

    #[inline]
    pub fn token_end(&self) -> u32 {
        self.pos as u32
    }

    #[inline]
    pub fn token_span(&self) -> Span {
        Span::new(self.token_start as u32, self.pos as u32)
    }

    pub fn token_text(&self) -> &'a str {
        self.text.get(self.token_start..self.pos).unwrap_or("")
    }

    /// Whether a line terminator appeared between the previous token and this one.
    #[inline]
    pub fn has_preceding_line_break(&self) -> bool {
        self.preceding_line_break
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn take_comments(&mut self) -> Vec<CommentRange> {
        std::mem::take(&mut self.comments)
    }

    pub fn snapshot(&self) -> ScannerSnapshot {
        ScannerSnapshot {
            pos: self.pos,
            token: self.token,
            token_start: self.token_start,
            preceding_line_break: self.preceding_line_break,
            comment_count: self.comments.len(),
            diagnostic_count: self.diagnostics.len(),
        }
    }

    pub fn restore(&mut self, snapshot: ScannerSnapshot) {
        self.pos = snapshot.pos;
        self.token = snapshot.token;
        self.token_start = snapshot.token_start;
        self.preceding_line_break = snapshot.preceding_line_break;
        self.comments.truncate(snapshot.comment_count);
        self.diagnostics.truncate(snapshot.diagnostic_count);
    }

    #[inline]
    fn peek_char(&self) -> Option<char> {
        self.text.get(self.pos..).and_then(|rest| rest.chars().next())
    }

    #[inline]
    fn byte_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn error(&mut self, start: usize, message: &str, code: u32) {
        let length = self.pos.saturating_sub(start).max(1) as u32;
        self.diagnostics
            .push(Diagnostic::error(start as u32, length, message, code));
    }

    fn skip_trivia(&mut self) {
        while let Some(ch) = self.peek_char() {
            if is_line_terminator(ch) {
                self.preceding_line_break = true;
                self.pos += ch.len_utf8();
            } else if ch == ' '
                || ch == '\t'
                || ch == '\u{b}'
                || ch == '\u{c}'
                || ch == '\u{a0}'
                || ch == '\u{feff}'
                || (!ch.is_ascii() && ch.is_whitespace())
            {
                self.pos += ch.len_utf8();
            } else if ch == '/' && self.byte_at(1) == Some(b'/') {
                let start = self.pos;
                self.pos += 2;
                while let Some(c) = self.peek_char() {
                    if is_line_terminator(c) {
                        break;
                    }
                    self.pos += c.len_utf8();
                }
                if self.collect_comments {
                    self.comments
                        .push(CommentRange::new(start as u32, self.pos as u32, false));
                }
            } else if ch == '/' && self.byte_at(1) == Some(b'*') {
                let start = self.pos;
                self.pos += 2;
                let mut closed = false;
                while let Some(c) = self.peek_char() {
                    if c == '*' && self.byte_at(1) == Some(b'/') {
                        self.pos += 2;
                        closed = true;
                        break;
                    }
                    if is_line_terminator(c) {
                        self.preceding_line_break = true;
                    }
                    self.pos += c.len_utf8();
                }
                if !closed {
                    self.error(
                        start,
                        "Unterminated comment.",
                        diagnostic_codes::UNTERMINATED_COMMENT,
                    );
                }
                if self.collect_comments {
                    self.comments
                        .push(CommentRange::new(start as u32, self.pos as u32, true));
                }
            } else {
                break;
            }
        }
    }

    /// Scan the next token.
    pub fn scan(&mut self) -> SyntaxKind {
        self.preceding_line_break = false;
        self.skip_trivia();
        self.token_start = self.pos;

        let Some(ch) = self.peek_char() else {
            self.token = SyntaxKind::EndOfFile;
            return self.token;
        };

        self.token = if is_identifier_start(ch) {
            self.scan_identifier()
        } else if ch.is_ascii_digit()
            || (ch == '.' && self.byte_at(1).is_some_and(|b| b.is_ascii_digit()))
        {
            self.scan_number()
        } else if ch == '"' || ch == '\'' {
            self.scan_string(ch)
        } else {
            self.scan_punctuation(ch)
        };
        self.token
    }

    fn scan_identifier(&mut self) -> SyntaxKind {
        while let Some(c) = self.peek_char() {
            if !is_identifier_part(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        SyntaxKind::from_keyword(self.token_text()).unwrap_or(SyntaxKind::Identifier)
    }

    fn scan_digits(&mut self, radix: u32) {
        while let Some(b) = self.byte_at(0) {
            if !(b as char).is_digit(radix) {
                break;
            }
            self.pos += 1;
        }
    }

    fn scan_number(&mut self) -> SyntaxKind {
        if self.byte_at(0) == Some(b'0') && matches!(self.byte_at(1), Some(b'x' | b'X')) {
            self.pos += 2;
            let digits_start = self.pos;
            self.scan_digits(16);
            if self.pos == digits_start {
                self.error(
                    self.token_start,
                    "Hexadecimal digit expected.",
                    diagnostic_codes::INVALID_CHARACTER,
                );
            }
            return SyntaxKind::NumericLiteral;
        }

        self.scan_digits(10);
        if self.byte_at(0) == Some(b'.') {
            self.pos += 1;
            self.scan_digits(10);
        }
        if matches!(self.byte_at(0), Some(b'e' | b'E')) {
            let save = self.pos;
            self.pos += 1;
            if matches!(self.byte_at(0), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            let exponent_start = self.pos;
            self.scan_digits(10);
            if self.pos == exponent_start {
                self.pos = save;
            }
        }
        if self.peek_char().is_some_and(is_identifier_start) {
            let start = self.pos;
            self.pos += self.peek_char().map_or(1, char::len_utf8);
            self.error(
                start,
                "An identifier cannot immediately follow a numeric literal.",
                diagnostic_codes::INVALID_CHARACTER,
            );
        }
        SyntaxKind::NumericLiteral
    }

    fn scan_string(&mut self, quote: char) -> SyntaxKind {
        self.pos += 1;
        loop {
            let Some(c) = self.peek_char() else {
                self.error(
                    self.token_start,
                    "Unterminated string literal.",
                    diagnostic_codes::UNTERMINATED_STRING,
                );
                break;
            };
            if c == quote {
                self.pos += 1;
                break;
            }
            if is_line_terminator(c) {
                self.error(
                    self.token_start,
                    "Unterminated string literal.",
                    diagnostic_codes::UNTERMINATED_STRING,
                );
                break;
            }
            self.pos += c.len_utf8();
            if c == '\\' {
                // Escaped character, including line continuations.
                if let Some(escaped) = self.peek_char() {
                    self.pos += escaped.len_utf8();
                    if escaped == '\r' && self.byte_at(0) == Some(b'\n') {
                        self.pos += 1;
                    }
                }
            }
        }
        SyntaxKind::StringLiteral
    }

    fn scan_punctuation(&mut self, ch: char) -> SyntaxKind {
        let next = self.byte_at(1);
        let next2 = self.byte_at(2);
        let next3 = self.byte_at(3);

        let (kind, len) = match ch {
            '{' => (SyntaxKind::OpenBraceToken, 1),
            '}' => (SyntaxKind::CloseBraceToken, 1),
            '(' => (SyntaxKind::OpenParenToken, 1),
            ')' => (SyntaxKind::CloseParenToken, 1),
            '[' => (SyntaxKind::OpenBracketToken, 1),
            ']' => (SyntaxKind::CloseBracketToken, 1),
            '.' => (SyntaxKind::DotToken, 1),
            ';' => (SyntaxKind::SemicolonToken, 1),
            ',' => (SyntaxKind::CommaToken, 1),
            '?' => (SyntaxKind::QuestionToken, 1),
            ':' => (SyntaxKind::ColonToken, 1),
            '~' => (SyntaxKind::TildeToken, 1),
            '<' => match (next, next2) {
                (Some(b'<'), Some(b'=')) => (SyntaxKind::LessThanLessThanEqualsToken, 3),
                (Some(b'<'), _) => (SyntaxKind::LessThanLessThanToken, 2),
                (Some(b'='), _) => (SyntaxKind::LessThanEqualsToken, 2),
                _ => (SyntaxKind::LessThanToken, 1),
            },
            '>' => match (next, next2, next3) {
                (Some(b'>'), Some(b'>'), Some(b'=')) => {
                    (SyntaxKind::GreaterThanGreaterThanGreaterThanEqualsToken, 4)
                }
                (Some(b'>'), Some(b'>'), _) => {
                    (SyntaxKind::GreaterThanGreaterThanGreaterThanToken, 3)
                }
                (Some(b'>'), Some(b'='), _) => (SyntaxKind::GreaterThanGreaterThanEqualsToken, 3),
                (Some(b'>'), _, _) => (SyntaxKind::GreaterThanGreaterThanToken, 2),
                (Some(b'='), _, _) => (SyntaxKind::GreaterThanEqualsToken, 2),
                _ => (SyntaxKind::GreaterThanToken, 1),
            },
            '=' => match (next, next2) {
                (Some(b'='), Some(b'=')) => (SyntaxKind::EqualsEqualsEqualsToken, 3),
                (Some(b'='), _) => (SyntaxKind::EqualsEqualsToken, 2),
                _ => (SyntaxKind::EqualsToken, 1),
            },
            '!' => match (next, next2) {
                (Some(b'='), Some(b'=')) => (SyntaxKind::ExclamationEqualsEqualsToken, 3),
                (Some(b'='), _) => (SyntaxKind::ExclamationEqualsToken, 2),
                _ => (SyntaxKind::ExclamationToken, 1),
            },
            '+' => match next {
                Some(b'+') => (SyntaxKind::PlusPlusToken, 2),
                Some(b'=') => (SyntaxKind::PlusEqualsToken, 2),
                _ => (SyntaxKind::PlusToken, 1),
            },
            '-' => match next {
                Some(b'-') => (SyntaxKind::MinusMinusToken, 2),
                Some(b'=') => (SyntaxKind::MinusEqualsToken, 2),
                _ => (SyntaxKind::MinusToken, 1),
            },
            '*' => match next {
                Some(b'=') => (SyntaxKind::AsteriskEqualsToken, 2),
                _ => (SyntaxKind::AsteriskToken, 1),
            },
            '/' => match next {
                Some(b'=') => (SyntaxKind::SlashEqualsToken, 2),
                _ => (SyntaxKind::SlashToken, 1),
            },
            '%' => match next {
                Some(b'=') => (SyntaxKind::PercentEqualsToken, 2),
                _ => (SyntaxKind::PercentToken, 1),
            },
            '&' => match next {
                Some(b'&') => (SyntaxKind::AmpersandAmpersandToken, 2),
                Some(b'=') => (SyntaxKind::AmpersandEqualsToken, 2),
                _ => (SyntaxKind::AmpersandToken, 1),
            },
            '|' => match next {
                Some(b'|') => (SyntaxKind::BarBarToken, 2),
                Some(b'=') => (SyntaxKind::BarEqualsToken, 2),
                _ => (SyntaxKind::BarToken, 1),
            },
            '^' => match next {
                Some(b'=') => (SyntaxKind::CaretEqualsToken, 2),
                _ => (SyntaxKind::CaretToken, 1),
            },
            _ => {
                self.pos += ch.len_utf8();
                self.error(
                    self.token_start,
                    "Invalid character.",
                    diagnostic_codes::INVALID_CHARACTER,
                );
                return SyntaxKind::Unknown;
            }
        };
        self.pos += len;
        kind
    }

    /// Re-scan the current `/` or `/=` token as a regular expression literal.
    pub fn re_scan_slash_token(&mut self) -> SyntaxKind {
        if !matches!(
            self.token,
            SyntaxKind::SlashToken | SyntaxKind::SlashEqualsToken
        ) {
            return self.token;
        }

        self.pos = self.token_start + 1;
        let mut in_class = false;
        loop {
            let Some(c) = self.peek_char() else {
                self.error(
                    self.token_start,
                    "Unterminated regular expression literal.",
                    diagnostic_codes::UNTERMINATED_REGEX,
                );
                break;
            };
            if is_line_terminator(c) {
                self.error(
                    self.token_start,
                    "Unterminated regular expression literal.",
                    diagnostic_codes::UNTERMINATED_REGEX,
                );
                break;
            }
            self.pos += c.len_utf8();
            match c {
                '\\' => {
                    if let Some(escaped) = self.peek_char()
                        && !is_line_terminator(escaped)
                    {
                        self.pos += escaped.len_utf8();
                    }
                }
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => break,
                _ => {}
            }
        }

        // Flags
        while let Some(c) = self.peek_char() {
            if !is_identifier_part(c) {
                break;
            }
            self.pos += c.len_utf8();
        }

        self.token = SyntaxKind::RegularExpressionLiteral;
        self.token
    }
}
