//! The parse contract consumed by the incremental engine.

use crate::parser::state::{ParseOptions, ParseResult, ParsedSource, ParserState};

/// Turns source text into a syntax tree.
///
/// Implementations must be usable from a background worker thread, and every
/// node they produce must carry a `[start, end)` range into `text`.
pub trait SourceParser: Send + Sync + 'static {
    fn parse(&self, text: &str, options: &ParseOptions) -> ParseResult<ParsedSource>;
}

/// The built-in recursive-descent ES5 parser.
#[derive(Clone, Copy, Debug, Default)]
pub struct EsParser;

impl SourceParser for EsParser {
    fn parse(&self, text: &str, options: &ParseOptions) -> ParseResult<ParsedSource> {
        ParserState::new(text, options.clone()).parse_program()
    }
}

impl<P: SourceParser> SourceParser for std::sync::Arc<P> {
    fn parse(&self, text: &str, options: &ParseOptions) -> ParseResult<ParsedSource> {
        (**self).parse(text, options)
    }
}
