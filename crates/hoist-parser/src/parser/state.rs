//! Parser state: token handling, options, errors and the program entry point.
//!
//! Statement and expression productions live in `state_statements.rs` and
//! `state_expressions.rs`; this module owns the shared machinery they use.

use super::base::NodeIndex;
use super::node::{GenericKind, NodeArena, NodeData};
use hoist_common::diagnostics::{diagnostic_codes, diagnostic_messages, format_message};
use hoist_common::limits::MAX_NESTING_DEPTH;
use hoist_common::{CommentRange, Diagnostic, Span};
use hoist_scanner::{ScannerState, SyntaxKind, Token};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

/// A malformed-source error raised by the parser.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (at {}..{})", span.start, span.end)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    pub code: u32,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span, code: u32) -> Self {
        ParseError {
            message: message.into(),
            span,
            code,
        }
    }

    fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(
            self.span.start,
            self.span.len().max(1),
            self.message.clone(),
            self.code,
        )
    }
}

impl From<&Diagnostic> for ParseError {
    fn from(diag: &Diagnostic) -> Self {
        ParseError::new(
            diag.message_text.clone(),
            Span::new(diag.start, diag.start + diag.length),
            diag.code,
        )
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Options accepted by every parse.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Attach `[start, end)` ranges to nodes. Ranges are always produced; the
    /// flag exists so callers can state the requirement explicitly.
    pub range: bool,
    /// Return the flat token list.
    pub tokens: bool,
    /// Return comment ranges.
    pub comments: bool,
    /// Record errors as diagnostics and resynchronise at the next statement
    /// instead of failing.
    pub tolerant: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            range: true,
            tokens: false,
            comments: false,
            tolerant: false,
        }
    }
}

/// The result of a successful parse.
#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub arena: NodeArena,
    pub root: NodeIndex,
    /// Errors recovered from in tolerant mode (always empty otherwise).
    pub diagnostics: Vec<Diagnostic>,
    pub tokens: Option<Vec<Token>>,
    pub comments: Option<Vec<CommentRange>>,
}

impl ParsedSource {
    /// Top-level statements of the parsed program.
    pub fn statements(&self) -> &[NodeIndex] {
        match self.arena.get(self.root).map(|node| &node.data) {
            Some(NodeData::Program { body }) => body,
            _ => &[],
        }
    }
}

pub struct ParserState<'a> {
    pub(crate) scanner: ScannerState<'a>,
    pub(crate) arena: NodeArena,
    pub(crate) options: ParseOptions,
    pub(crate) diagnostics: Vec<Diagnostic>,
    tokens: Vec<Token>,
    /// End offset of the last consumed token.
    pub(crate) prev_token_end: u32,
    pub(crate) depth: u32,
    pub(crate) in_function: bool,
    /// Cleared while parsing a `for` initializer so `in` is not read as an operator.
    pub(crate) allow_in: bool,
}

impl<'a> ParserState<'a> {
    pub fn new(source_text: &'a str, options: ParseOptions) -> Self {
        let mut scanner = ScannerState::new(source_text);
        scanner.set_collect_comments(options.comments);
        ParserState {
            scanner,
            arena: NodeArena::with_capacity(source_text.len() / 8),
            options,
            diagnostics: Vec::new(),
            tokens: Vec::new(),
            prev_token_end: 0,
            depth: 0,
            in_function: false,
            allow_in: true,
        }
    }

    /// Parse the whole source text as a program.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn parse_program(mut self) -> ParseResult<ParsedSource> {
        self.next_token();
        let body = self.parse_statement_list(SyntaxKind::EndOfFile)?;
        let end = self.scanner.source_text().len() as u32;
        let root = self.arena.add(Span::new(0, end), NodeData::Program { body });

        let scan_errors = self.scanner.take_diagnostics();
        if !self.options.tolerant
            && let Some(first) = scan_errors.first()
        {
            return Err(ParseError::from(first));
        }
        self.diagnostics.extend(scan_errors);
        self.diagnostics.sort_by_key(|d| d.start);

        debug!(
            nodes = self.arena.len(),
            diagnostics = self.diagnostics.len(),
            "parsed program"
        );

        let comments = self
            .options
            .comments
            .then(|| self.scanner.take_comments());
        let tokens = self.options.tokens.then_some(self.tokens);
        Ok(ParsedSource {
            arena: self.arena,
            root,
            diagnostics: self.diagnostics,
            tokens,
            comments,
        })
    }

    // Token management

    #[inline]
    pub(crate) fn token(&self) -> SyntaxKind {
        self.scanner.token()
    }

    #[inline]
    pub(crate) fn token_start(&self) -> u32 {
        self.scanner.token_start()
    }

    pub(crate) fn next_token(&mut self) -> SyntaxKind {
        self.prev_token_end = self.scanner.token_end();
        let kind = self.scanner.scan();
        if self.options.tokens && kind != SyntaxKind::EndOfFile {
            self.tokens.push(Token {
                kind,
                span: self.scanner.token_span(),
            });
        }
        kind
    }

    /// Re-read the current `/` token as a regular expression literal.
    pub(crate) fn re_scan_slash_token(&mut self) -> SyntaxKind {
        let kind = self.scanner.re_scan_slash_token();
        if self.options.tokens
            && let Some(last) = self.tokens.last_mut()
        {
            *last = Token {
                kind,
                span: self.scanner.token_span(),
            };
        }
        kind
    }

    /// Kind of the token after the current one, without consuming anything.
    pub(crate) fn peek_token(&mut self) -> SyntaxKind {
        let snapshot = self.scanner.snapshot();
        let kind = self.scanner.scan();
        self.scanner.restore(snapshot);
        kind
    }

    #[inline]
    pub(crate) fn is(&self, kind: SyntaxKind) -> bool {
        self.token() == kind
    }

    /// Consume the current token if it has the given kind.
    pub(crate) fn optional(&mut self, kind: SyntaxKind) -> bool {
        if self.is(kind) {
            self.next_token();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: SyntaxKind) -> ParseResult<()> {
        if self.optional(kind) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", token_display(kind))))
        }
    }

    pub(crate) fn unexpected(&self, expected: &str) -> ParseError {
        let found = match self.token() {
            SyntaxKind::EndOfFile => "end of input".to_string(),
            _ => format!("'{}'", self.scanner.token_text()),
        };
        ParseError::new(
            format_message(diagnostic_messages::EXPECTED_BUT_FOUND, &[expected, found.as_str()]),
            self.scanner.token_span(),
            diagnostic_codes::UNEXPECTED_TOKEN,
        )
    }

    /// Automatic semicolon insertion: a `;` is optional before `}`, at end
    /// of input, and after a line break.
    pub(crate) fn parse_semicolon(&mut self) -> ParseResult<()> {
        if self.optional(SyntaxKind::SemicolonToken) {
            return Ok(());
        }
        if self.can_insert_semicolon() {
            Ok(())
        } else {
            Err(self.unexpected("';'"))
        }
    }

    pub(crate) fn can_insert_semicolon(&self) -> bool {
        matches!(
            self.token(),
            SyntaxKind::CloseBraceToken | SyntaxKind::EndOfFile
        ) || self.scanner.has_preceding_line_break()
    }

    // Node construction

    #[inline]
    pub(crate) fn finish_node(&mut self, start: u32, data: NodeData) -> NodeIndex {
        self.arena.add(Span::new(start, self.prev_token_end), data)
    }

    pub(crate) fn finish_generic(
        &mut self,
        start: u32,
        kind: GenericKind,
        children: SmallVec<[NodeIndex; 4]>,
    ) -> NodeIndex {
        self.finish_node(start, NodeData::Generic { kind, children })
    }

    pub(crate) fn enter_nesting(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(ParseError::new(
                "Maximum nesting depth exceeded.",
                self.scanner.token_span(),
                diagnostic_codes::NESTING_TOO_DEEP,
            ));
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn exit_nesting(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Run `f` with the `in` operator allowed or disallowed, restoring the
    /// previous setting afterwards.
    pub(crate) fn with_allow_in<T>(
        &mut self,
        allow: bool,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let saved = self.allow_in;
        self.allow_in = allow;
        let result = f(self);
        self.allow_in = saved;
        result
    }

    // Error recovery

    /// Record a recovered error in tolerant mode.
    pub(crate) fn record_error(&mut self, error: &ParseError) {
        debug!(error = %error, "recovering from parse error");
        self.diagnostics.push(error.to_diagnostic());
    }

    /// Skip tokens until a plausible statement boundary.
    pub(crate) fn resynchronize(&mut self, stalled_at: u32) {
        if self.token_start() == stalled_at && !self.is(SyntaxKind::EndOfFile) {
            self.next_token();
        }
        loop {
            match self.token() {
                SyntaxKind::EndOfFile | SyntaxKind::CloseBraceToken => return,
                SyntaxKind::SemicolonToken => {
                    self.next_token();
                    return;
                }
                _ if self.scanner.has_preceding_line_break() => return,
                _ => {
                    self.next_token();
                }
            }
        }
    }
}

/// Source text of punctuation and keyword tokens, for error messages.
pub(crate) fn token_display(kind: SyntaxKind) -> &'static str {
    match kind {
        SyntaxKind::OpenBraceToken => "{",
        SyntaxKind::CloseBraceToken => "}",
        SyntaxKind::OpenParenToken => "(",
        SyntaxKind::CloseParenToken => ")",
        SyntaxKind::OpenBracketToken => "[",
        SyntaxKind::CloseBracketToken => "]",
        SyntaxKind::SemicolonToken => ";",
        SyntaxKind::CommaToken => ",",
        SyntaxKind::ColonToken => ":",
        SyntaxKind::EqualsToken => "=",
        SyntaxKind::WhileKeyword => "while",
        SyntaxKind::InKeyword => "in",
        SyntaxKind::Identifier => "identifier",
        _ => "token",
    }
}
