use super::ast::*;
use super::tokenizer::Token;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    /// Translates a character offset into a 1-based line and column.
    /// Offsets past the end of `source` land just after its last character.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let mut location = Location { line: 1, column: 1 };
        for chr in source.chars().take(offset) {
            if chr == '\n' {
                location.line += 1;
                location.column = 1;
            } else {
                location.column += 1;
            }
        }
        location
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

pub trait Locatable {
    fn span(&self) -> Span;
}

/// Half-open range of character offsets into the source text.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn till<R: Locatable>(&self, other: &R) -> Self {
        Self {
            start: self.start,
            end: other.span().end.max(self.end),
        }
    }

    pub(super) fn till_block<R: Locatable>(&self, block: &[R]) -> Self {
        match block.last() {
            Some(last) => self.till(last),
            None => *self,
        }
    }
}

impl Locatable for Span {
    fn span(&self) -> Span {
        *self
    }
}

impl Locatable for Token {
    fn span(&self) -> Span {
        self.span
    }
}

impl<R> Locatable for Box<R>
where
    R: Locatable,
{
    fn span(&self) -> Span {
        (**self).span()
    }
}

impl Locatable for Expression {
    fn span(&self) -> Span {
        self.span
    }
}

impl Locatable for Statement {
    fn span(&self) -> Span {
        match self {
            Self::Expression(expr) => expr.span(),
            Self::Declaration(decl) => decl.span,
            Self::Assignment { span, .. } => *span,
            Self::If { span, .. } => *span,
            Self::Switch { span, .. } => *span,
            Self::While { span, .. } => *span,
            Self::Return { span, .. } => *span,
        }
    }
}

impl Locatable for Case {
    fn span(&self) -> Span {
        self.span
    }
}

impl Locatable for Global {
    fn span(&self) -> Span {
        self.span
    }
}

impl Locatable for Function {
    fn span(&self) -> Span {
        self.span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_map_to_lines_and_columns() {
        let source = "FUN main() DO\n  RETURN 1;\nEND";
        assert_eq!(Location::from_offset(source, 0), Location { line: 1, column: 1 });
        assert_eq!(Location::from_offset(source, 16), Location { line: 2, column: 3 });
        assert_eq!(Location::from_offset(source, 1000), Location { line: 3, column: 4 });
    }

    #[test]
    fn spans_extend_over_blocks() {
        let head = Span::new(3, 5);
        assert_eq!(head.till_block(&[Span::new(6, 8), Span::new(10, 12)]), Span::new(3, 12));
        assert_eq!(head.till_block::<Span>(&[]), head);
    }
}
