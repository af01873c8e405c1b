//! The driver's cursor helper for small recursive-descent parsers, used by
//! the type hint parser.
//!
//! A [`ParserState`] is a copyable view of the unparsed rest of the input.
//! Every step returns a new state, so backtracking means keeping the old one.

use std::fmt;

/// A parse failure, located by how much input was left when it occurred.
#[derive(Copy, Clone, Debug)]
pub(crate) struct ParseError {
    remaining: usize,
    pub(crate) cause: ParseErrorCause,
}

impl ParseError {
    /// 1-based character position of the failure within `original`.
    pub(crate) fn calculate_position(&self, original: &str) -> Option<usize> {
        let consumed = original.len().checked_sub(self.remaining)?;
        Some(original.get(..consumed)?.chars().count() + 1)
    }
}

#[derive(Copy, Clone, Debug)]
pub(crate) enum ParseErrorCause {
    Expected(&'static str),
    Other(&'static str),
}

impl fmt::Display for ParseErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorCause::Expected(token) => write!(f, "expected {:?}", token),
            ParseErrorCause::Other(msg) => f.write_str(msg),
        }
    }
}

pub(crate) type ParseResult<T> = Result<T, ParseError>;

#[derive(Clone, Copy, Debug)]
#[must_use]
pub(crate) struct ParserState<'s> {
    rest: &'s str,
}

impl<'s> ParserState<'s> {
    pub(crate) fn new(input: &'s str) -> Self {
        ParserState { rest: input }
    }

    /// Consumes `token`, which must come next.
    pub(crate) fn accept(self, token: &'static str) -> ParseResult<Self> {
        self.rest
            .strip_prefix(token)
            .map(|rest| ParserState { rest })
            .ok_or_else(|| self.error(ParseErrorCause::Expected(token)))
    }

    /// Consumes `token` if it comes next. Reports whether it did.
    pub(crate) fn try_accept(self, token: &'static str) -> (bool, Self) {
        match self.accept(token) {
            Ok(next) => (true, next),
            Err(_) => (false, self),
        }
    }

    pub(crate) fn skip_white(self) -> Self {
        self.take_while(char::is_whitespace).1
    }

    /// Splits off the longest prefix whose characters all satisfy `pred`.
    pub(crate) fn take_while(self, mut pred: impl FnMut(char) -> bool) -> (&'s str, Self) {
        let end = self
            .rest
            .char_indices()
            .find(|&(_, c)| !pred(c))
            .map_or(self.rest.len(), |(i, _)| i);
        let (taken, rest) = self.rest.split_at(end);
        (taken, ParserState { rest })
    }

    pub(crate) fn is_at_eof(self) -> bool {
        self.rest.is_empty()
    }

    pub(crate) fn error(self, cause: ParseErrorCause) -> ParseError {
        ParseError {
            remaining: self.rest.len(),
            cause,
        }
    }
}
