use crate::parser::{Location, Span};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Lex,
    Parse,
    Name,
    Type,
    Runtime,
    DivideByZero,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Lex => "LexError",
            Self::Parse => "ParseError",
            Self::Name => "NameError",
            Self::Type => "TypeError",
            Self::Runtime => "RuntimeError",
            Self::DivideByZero => "DivideByZero",
        };
        f.write_str(name)
    }
}

/// A fatal error raised by one of the pipeline phases.
///
/// Every phase stops at its first error, so a single value describes the
/// whole failure. The span is absent only for errors that have no source
/// position, such as a missing `main` function.
#[derive(Clone, Debug, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    span: Option<Span>,
    message: String,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new(kind: ErrorKind, span: Option<Span>, msg: &str) -> Self {
        Self {
            kind,
            span,
            message: msg.to_string(),
        }
    }
    pub fn lex(offset: usize, msg: &str) -> Self {
        Self::new(ErrorKind::Lex, Some(Span::new(offset, offset + 1)), msg)
    }
    pub fn parse(offset: usize, msg: &str) -> Self {
        Self::new(ErrorKind::Parse, Some(Span::new(offset, offset)), msg)
    }
    pub fn name(span: Span, msg: &str) -> Self {
        Self::new(ErrorKind::Name, Some(span), msg)
    }
    pub fn type_(span: Span, msg: &str) -> Self {
        Self::new(ErrorKind::Type, Some(span), msg)
    }
    pub fn runtime(span: Span, msg: &str) -> Self {
        Self::new(ErrorKind::Runtime, Some(span), msg)
    }
    pub fn divide_by_zero(span: Span) -> Self {
        Self::new(ErrorKind::DivideByZero, Some(span), "division by zero")
    }

    /// Attaches a span to an error raised without one, keeping any existing span.
    pub(crate) fn or_at(mut self, span: Span) -> Self {
        self.span.get_or_insert(span);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
    pub fn span(&self) -> Option<Span> {
        self.span
    }
    pub fn offset(&self) -> Option<usize> {
        self.span.map(|s| s.start)
    }
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Renders the error with a line/column position resolved against `source`.
    pub fn display_in(&self, source: &str) -> String {
        match self.offset() {
            Some(offset) => format!(
                "{}: {} ({})",
                self.kind,
                self.message,
                Location::from_offset(source, offset)
            ),
            None => format!("{}: {}", self.kind, self.message),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.offset() {
            Some(offset) => write!(f, "{}: {} at {}", self.kind, self.message, offset),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for Error {}
