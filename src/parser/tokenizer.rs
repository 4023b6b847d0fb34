use super::locations::Span;
use crate::error::{Error, Result};
use const_format::concatcp;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub(crate) typ: TokenType,
    pub(crate) lexeme: String,
    pub(crate) span: Span,
}

impl Token {
    pub fn typ(&self) -> TokenType {
        self.typ
    }
    pub fn lexeme(&self) -> &str {
        &self.lexeme
    }
    pub fn offset(&self) -> usize {
        self.span.start
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}('{}')@{}", self.typ, self.lexeme, self.span.start)
    }
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenType {
    IDENTIFIER,
    INTEGER,
    DECIMAL,
    CHARACTER,
    STRING,
    OPERATOR,
}

const TWO_CHARACTER_OPERATORS: [(char, char); 4] = [('!', '='), ('=', '='), ('&', '&'), ('|', '|')];

macro_rules! class {
    ($t:expr) => {
        concatcp!(r"^[", $t, r"]$")
    };
}

const S_LETTER: &str = "A-Za-z";
const S_DIGIT: &str = "0-9";
const S_IDENT_HEAD: &str = class!(concatcp!(S_LETTER, "@_"));
const S_IDENT_TAIL: &str = class!(concatcp!(S_LETTER, S_DIGIT, r"_\-"));
const S_DIGIT_CLASS: &str = class!(S_DIGIT);
const S_NONZERO: &str = class!("1-9");
const S_ESCAPE: &str = class!(r#"bnrt'"\\"#);
const S_CHARACTER_BODY: &str = r"^[^\\\n\r]$";
const S_STRING_BODY: &str = r#"^[^\\"\n\r]$"#;
const S_WHITESPACE: &str = r"^\s$";

static IDENT_HEAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(S_IDENT_HEAD).expect("Error compiling regex."));
static IDENT_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(S_IDENT_TAIL).expect("Error compiling regex."));
static DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(S_DIGIT_CLASS).expect("Error compiling regex."));
static NONZERO: Lazy<Regex> = Lazy::new(|| Regex::new(S_NONZERO).expect("Error compiling regex."));
static ESCAPE: Lazy<Regex> = Lazy::new(|| Regex::new(S_ESCAPE).expect("Error compiling regex."));
static CHARACTER_BODY: Lazy<Regex> =
    Lazy::new(|| Regex::new(S_CHARACTER_BODY).expect("Error compiling regex."));
static STRING_BODY: Lazy<Regex> =
    Lazy::new(|| Regex::new(S_STRING_BODY).expect("Error compiling regex."));
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(S_WHITESPACE).expect("Error compiling regex."));

/// A single-character test used by the lookahead helpers.
pub(super) trait CharPattern {
    fn matches(&self, chr: char) -> bool;
}

impl CharPattern for char {
    fn matches(&self, chr: char) -> bool {
        *self == chr
    }
}

impl CharPattern for Lazy<Regex> {
    fn matches(&self, chr: char) -> bool {
        let mut buf = [0u8; 4];
        self.is_match(chr.encode_utf8(&mut buf))
    }
}

pub struct Tokenizer {
    chars: Vec<char>,
    index: usize,
    length: usize,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            index: 0,
            length: 0,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = vec![];
        while self.has(0) {
            if self.peek(&[&WHITESPACE]) {
                self.advance();
                self.skip();
            } else {
                tokens.push(self.lex_token()?);
            }
        }
        trace!(count = tokens.len(), "tokenized input");
        Ok(tokens)
    }

    fn lex_token(&mut self) -> Result<Token> {
        if self.peek(&[&IDENT_HEAD]) {
            Ok(self.lex_identifier())
        } else if self.peek(&[&DIGIT]) || self.peek(&[&'-', &DIGIT]) {
            Ok(self.lex_number())
        } else if self.peek(&[&'\'']) {
            self.lex_character()
        } else if self.peek(&[&'"']) {
            self.lex_string()
        } else {
            Ok(self.lex_operator())
        }
    }

    fn lex_identifier(&mut self) -> Token {
        self.advance();
        while self.match_(&[&IDENT_TAIL]) {}
        self.emit(TokenType::IDENTIFIER)
    }

    fn lex_number(&mut self) -> Token {
        self.match_(&[&'-']);
        if !self.match_(&[&'0']) {
            self.match_(&[&NONZERO]);
            while self.match_(&[&DIGIT]) {}
        }
        if self.match_(&[&'.', &DIGIT]) {
            while self.match_(&[&DIGIT]) {}
            return self.emit(TokenType::DECIMAL);
        }
        self.emit(TokenType::INTEGER)
    }

    fn lex_character(&mut self) -> Result<Token> {
        self.advance();
        if self.peek(&[&'\\']) {
            self.lex_escape()?;
        } else if !self.match_(&[&CHARACTER_BODY]) {
            return Err(Error::lex(self.index, "invalid character literal"));
        }
        if !self.match_(&[&'\'']) {
            return Err(Error::lex(self.index, "unterminated character literal"));
        }
        Ok(self.emit(TokenType::CHARACTER))
    }

    fn lex_string(&mut self) -> Result<Token> {
        self.advance();
        loop {
            if self.match_(&[&'"']) {
                return Ok(self.emit(TokenType::STRING));
            } else if self.peek(&[&'\\']) {
                self.lex_escape()?;
            } else if !self.match_(&[&STRING_BODY]) {
                return Err(Error::lex(self.index, "unterminated string literal"));
            }
        }
    }

    fn lex_escape(&mut self) -> Result<()> {
        if self.match_(&[&'\\', &ESCAPE]) {
            Ok(())
        } else {
            Err(Error::lex(self.index, "invalid escape sequence"))
        }
    }

    fn lex_operator(&mut self) -> Token {
        for (first, second) in TWO_CHARACTER_OPERATORS {
            if self.match_(&[&first, &second]) {
                return self.emit(TokenType::OPERATOR);
            }
        }
        self.advance();
        self.emit(TokenType::OPERATOR)
    }

    /// Checks the upcoming characters against one pattern per position
    /// without consuming anything.
    pub(super) fn peek(&self, patterns: &[&dyn CharPattern]) -> bool {
        patterns
            .iter()
            .enumerate()
            .all(|(offset, pattern)| self.has(offset) && pattern.matches(self.get(offset)))
    }

    /// Like [`Tokenizer::peek`], but advances past the matched characters on success.
    pub(super) fn match_(&mut self, patterns: &[&dyn CharPattern]) -> bool {
        let matched = self.peek(patterns);
        if matched {
            for _ in 0..patterns.len() {
                self.advance();
            }
        }
        matched
    }

    fn has(&self, offset: usize) -> bool {
        self.index + offset < self.chars.len()
    }

    fn get(&self, offset: usize) -> char {
        self.chars[self.index + offset]
    }

    fn advance(&mut self) {
        self.index += 1;
        self.length += 1;
    }

    fn skip(&mut self) {
        self.length = 0;
    }

    fn emit(&mut self, typ: TokenType) -> Token {
        let start = self.index - self.length;
        self.skip();
        Token {
            typ,
            lexeme: self.chars[start..self.index].iter().collect(),
            span: Span::new(start, self.index),
        }
    }
}

pub fn tokenize_string(input: &str) -> Result<Vec<Token>> {
    Tokenizer::new(input).tokenize()
}
