use std::cell::RefCell;

use super::tokenizer::{Token, TokenType};
use crate::error::Error;

/// Deepest nesting of blocks and expressions a program may use.
pub const MAX_NESTING: usize = 64;

#[derive(Debug)]
pub enum ParseResult<'a, Output> {
    Ok((Output, ParserInput<'a>)),
    Err,
}

/// Failure bookkeeping shared by every alternative of one parse.
///
/// Alternatives fail silently and backtrack; the state keeps the failure at
/// the furthest token so the final error points at the real culprit. A fatal
/// error (a malformed literal) wins over any backtracking failure.
#[derive(Debug, Default)]
pub struct Failures {
    furthest: RefCell<Option<Error>>,
    fatal: RefCell<Option<Error>>,
}

impl Failures {
    pub fn new() -> Self {
        Self::default()
    }
    pub(super) fn is_fatal(&self) -> bool {
        self.fatal.borrow().is_some()
    }
    pub(super) fn into_error(self, fallback: Error) -> Error {
        self.fatal
            .into_inner()
            .or(self.furthest.into_inner())
            .unwrap_or(fallback)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParserState<'a> {
    failures: &'a Failures,
    end: usize,
    depth: usize,
}

impl<'a> ParserState<'a> {
    pub fn new(failures: &'a Failures, end: usize) -> Self {
        Self {
            failures,
            end,
            depth: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParserInput<'a>(&'a [Token], ParserState<'a>);

impl<'a> ParserInput<'a> {
    pub fn new(input: &'a [Token], state: ParserState<'a>) -> Self {
        Self(input, state)
    }
    pub(super) fn first(&self) -> Option<&'a Token> {
        self.0.first()
    }
    pub(super) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    /// Offset of the next token, or just past the last one at end of input.
    pub(super) fn offset(&self) -> usize {
        self.0.first().map_or(self.1.end, |t| t.span.start)
    }
    pub(super) fn advance(&self) -> Self {
        Self(&self.0[1..], self.1)
    }
    pub(super) fn report_error(&self, msg: &str) {
        let offset = self.offset();
        let mut furthest = self.1.failures.furthest.borrow_mut();
        if furthest.as_ref().and_then(Error::offset).map_or(true, |o| o <= offset) {
            *furthest = Some(Error::parse(offset, msg));
        }
    }
    pub(super) fn abort(&self, error: Error) {
        self.1.failures.fatal.borrow_mut().get_or_insert(error);
    }
    fn with_depth(&self, depth: usize) -> Self {
        Self(self.0, ParserState { depth, ..self.1 })
    }
}

impl<'a, T> ParseResult<'a, T> {
    pub(super) fn or_else<O>(self, op: O) -> Self
    where
        O: FnOnce() -> Self,
    {
        match self {
            Self::Ok(inner) => Self::Ok(inner),
            Self::Err => op(),
        }
    }
    pub(super) fn map<U, F>(self, op: F) -> ParseResult<'a, U>
    where
        F: FnOnce((T, ParserInput<'a>)) -> (U, ParserInput<'a>),
    {
        match self {
            Self::Ok(inner) => ParseResult::Ok(op(inner)),
            Self::Err => ParseResult::Err,
        }
    }
    pub(super) fn and_then<U, F>(self, op: F) -> ParseResult<'a, U>
    where
        F: FnOnce((T, ParserInput<'a>)) -> ParseResult<'a, U>,
    {
        match self {
            Self::Ok(inner) => op(inner),
            Self::Err => ParseResult::Err,
        }
    }
}

pub(super) trait Parser<'a, Output> {
    fn parse(&self, input: ParserInput<'a>) -> ParseResult<'a, Output>;
    fn map<F, MappedOutput>(self, map_fn: F) -> BoxedParser<'a, MappedOutput>
    where
        Self: Sized + 'a,
        Output: 'a,
        MappedOutput: 'a,
        F: Fn(Output) -> MappedOutput + 'a,
    {
        BoxedParser::new(map(self, map_fn))
    }
    fn or(self, parser: impl Parser<'a, Output> + 'a) -> BoxedParser<'a, Output>
    where
        Self: Sized + 'a,
        Output: 'a,
    {
        let alternative = move |input| self.parse(input).or_else(|| parser.parse(input));
        BoxedParser::new(alternative)
    }
}

impl<'a, F, Output> Parser<'a, Output> for F
where
    F: Fn(ParserInput<'a>) -> ParseResult<'a, Output>,
{
    fn parse(&self, input: ParserInput<'a>) -> ParseResult<'a, Output> {
        self(input)
    }
}

pub(super) struct BoxedParser<'a, Output> {
    parser: Box<dyn Parser<'a, Output> + 'a>,
}

impl<'a, Output> BoxedParser<'a, Output> {
    fn new(parser: impl Parser<'a, Output> + 'a) -> Self {
        Self {
            parser: Box::new(parser),
        }
    }
}

impl<'a, Output> Parser<'a, Output> for BoxedParser<'a, Output> {
    fn parse(&self, input: ParserInput<'a>) -> ParseResult<'a, Output> {
        self.parser.parse(input)
    }
}

pub(super) fn pair<'a, R1, R2>(
    parser1: impl Parser<'a, R1>,
    parser2: impl Parser<'a, R2>,
) -> impl Parser<'a, (R1, R2)> {
    move |input| {
        parser1.parse(input).and_then(|(result1, next_input)| {
            parser2
                .parse(next_input)
                .map(|(result2, rest)| ((result1, result2), rest))
        })
    }
}

pub(super) fn map<'a, F, A, B>(
    parser: impl Parser<'a, A>,
    map_fn: F,
) -> impl Fn(ParserInput<'a>) -> ParseResult<'a, B>
where
    F: Fn(A) -> B,
{
    move |input| {
        parser
            .parse(input)
            .map(|(result, rest)| (map_fn(result), rest))
    }
}

pub(super) fn left<'a, A, B>(
    left_parser: impl Parser<'a, A>,
    right_parser: impl Parser<'a, B>,
) -> impl Parser<'a, A> {
    map(pair(left_parser, right_parser), |(left, _right)| left)
}

pub(super) fn right<'a, A, B>(
    left_parser: impl Parser<'a, A>,
    right_parser: impl Parser<'a, B>,
) -> impl Parser<'a, B> {
    map(pair(left_parser, right_parser), |(_left, right)| right)
}

pub(super) fn zero_or_more<'a, R>(parser: impl Parser<'a, R>) -> impl Parser<'a, Vec<R>> {
    move |input| {
        let mut result = Vec::new();
        let mut tmp_input = input;
        while let ParseResult::Ok((next, rest)) = parser.parse(tmp_input) {
            tmp_input = rest;
            result.push(next);
        }
        ParseResult::Ok((result, tmp_input))
    }
}

pub(super) fn maybe<'a, R>(parser: impl Parser<'a, R>) -> impl Parser<'a, Option<R>> {
    move |input| match parser.parse(input) {
        ParseResult::Ok((value, rest)) => ParseResult::Ok((Some(value), rest)),
        ParseResult::Err => ParseResult::Ok((None, input)),
    }
}

/// Runs `parser` one nesting level deeper. Beyond [`MAX_NESTING`] levels the
/// parse aborts instead of recursing further.
pub(super) fn nested<'a, R>(parser: impl Parser<'a, R>) -> impl Parser<'a, R> {
    move |input: ParserInput<'a>| {
        let depth = input.1.depth;
        if depth >= MAX_NESTING {
            input.abort(Error::parse(
                input.offset(),
                &format!("nesting deeper than {MAX_NESTING} levels"),
            ));
            return ParseResult::Err;
        }
        parser
            .parse(input.with_depth(depth + 1))
            .map(|(result, rest)| (result, rest.with_depth(depth)))
    }
}

/// Any token of the given type.
pub(super) fn tok<'a>(expected_type: TokenType) -> impl Fn(ParserInput<'a>) -> ParseResult<'a, &'a Token> {
    move |input| match input.first() {
        Some(token) if token.typ == expected_type => ParseResult::Ok((token, input.advance())),
        _ => {
            input.report_error(&format!("expected {expected_type:?}"));
            ParseResult::Err
        }
    }
}

/// A token with exactly the given text, whatever its type.
pub(super) fn token<'a>(
    expected_lexeme: &'static str,
) -> impl Fn(ParserInput<'a>) -> ParseResult<'a, &'a Token> {
    move |input| match input.first() {
        Some(token) if token.lexeme == expected_lexeme => ParseResult::Ok((token, input.advance())),
        _ => {
            input.report_error(&format!("expected '{expected_lexeme}'"));
            ParseResult::Err
        }
    }
}

/// An OPERATOR token spelled as one of `symbols`.
pub(super) fn one_of<'a>(
    symbols: &'static [&'static str],
) -> impl Fn(ParserInput<'a>) -> ParseResult<'a, &'a Token> {
    move |input| match input.first() {
        Some(token)
            if token.typ == TokenType::OPERATOR && symbols.contains(&token.lexeme.as_str()) =>
        {
            ParseResult::Ok((token, input.advance()))
        }
        _ => {
            input.report_error(&format!("expected one of {}", symbols.join(" ")));
            ParseResult::Err
        }
    }
}

/// One or more `parser` separated by `sep` tokens.
pub(super) fn sep_by<'a, R>(parser: impl Parser<'a, R>, sep: &'static str) -> impl Parser<'a, Vec<R>> {
    move |input| {
        if let ParseResult::Ok((first, rest)) = parser.parse(input) {
            let mut result = Vec::new();
            let mut tmp_input = rest;
            result.push(first);
            while let ParseResult::Ok((next, rest)) =
                token(sep).parse(tmp_input).and_then(|(_, s)| parser.parse(s))
            {
                tmp_input = rest;
                result.push(next)
            }
            return ParseResult::Ok((result, tmp_input));
        }
        ParseResult::Err
    }
}

/// Succeeds only when every token has been consumed.
pub(super) fn end_of_input(input: ParserInput) -> ParseResult<()> {
    if input.is_empty() {
        ParseResult::Ok(((), input))
    } else {
        input.report_error("expected end of input");
        ParseResult::Err
    }
}

/// Always fails, recording what was expected at this position.
pub(super) fn expected<'a, R>(what: &'static str) -> impl Fn(ParserInput<'a>) -> ParseResult<'a, R> {
    move |input| {
        input.report_error(&format!("expected {what}"));
        ParseResult::Err
    }
}
