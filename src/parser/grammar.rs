// # ========================= START OF THE GRAMMAR =========================
//
// # General grammatical elements and rules:
// #
// # * Strings with single quotes (') denote OPERATOR tokens or reserved words
// # * Upper case names (INTEGER) denote token types
// # * ( e )? optionally matches e, e* matches zero or more occurrences of e
// # * All binary tiers are left-associative
// #
// # Alternatives are tried in order and backtrack on failure. The error
// # reported for an unparsable program is the failure at the furthest token.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use tracing::debug;

use super::ast::*;
use super::combinators::*;
use super::tokenizer::{Token, TokenType as TT};
use crate::error::{Error, Result};

const RESERVED: [&str; 17] = [
    "LIST", "VAR", "VAL", "FUN", "DO", "END", "LET", "IF", "ELSE", "SWITCH", "CASE", "DEFAULT",
    "WHILE", "RETURN", "NIL", "TRUE", "FALSE",
];

pub fn parse(tokens: &[Token]) -> Result<Source> {
    let end = tokens.last().map_or(0, |t| t.span.end);
    let failures = Failures::new();
    let input = ParserInput::new(tokens, ParserState::new(&failures, end));
    let parsed = match left(source, end_of_input).parse(input) {
        ParseResult::Ok((source, _)) => Some(source),
        ParseResult::Err => None,
    };
    match parsed {
        Some(source) if !failures.is_fatal() => {
            debug!(
                globals = source.globals.len(),
                functions = source.functions.len(),
                "parsed source"
            );
            Ok(source)
        }
        _ => Err(failures.into_error(Error::parse(end, "invalid program"))),
    }
}

// # STARTING RULES
// # ==============

// source: global* function*
fn source(input: ParserInput) -> ParseResult<Source> {
    pair(zero_or_more(global), zero_or_more(function))
        .map(|(globals, functions)| Source { globals, functions })
        .parse(input)
}

// global:
//     | ('LIST' | 'VAR' | 'VAL') identifier [':' identifier]
//       ['=' expression | '=' '[' expression (',' expression)* ']'] ';'
fn global(input: ParserInput) -> ParseResult<Global> {
    pair(
        pair(token("LIST").or(token("VAR")).or(token("VAL")), identifier),
        pair(
            pair(
                maybe(type_annotation),
                maybe(right(token("="), expression.or(list_literal))),
            ),
            token(";"),
        ),
    )
    .map(|((keyword, name), ((type_name, value), semi))| {
        Global::new(
            name.lexeme.clone(),
            keyword.lexeme != "VAL",
            keyword.lexeme == "LIST",
            type_name,
            value,
            keyword.span.till(semi),
        )
    })
    .parse(input)
}

// list_literal: '[' expression (',' expression)* ']'
fn list_literal(input: ParserInput) -> ParseResult<Expression> {
    pair(pair(token("["), sep_by(expression, ",")), token("]"))
        .map(|((open, values), close)| {
            Expression::new(ExpressionKind::List(values), open.span.till(close))
        })
        .parse(input)
}

// # FUNCTIONS
// # =========

// function:
//     | 'FUN' identifier '(' [parameter (',' parameter)*] ')' [':' identifier]
//       'DO' block 'END'
fn function(input: ParserInput) -> ParseResult<Function> {
    pair(
        pair(token("FUN"), identifier),
        pair(
            right(token("("), left(maybe(sep_by(parameter, ",")), token(")"))),
            pair(
                maybe(type_annotation),
                pair(right(token("DO"), block), token("END")),
            ),
        ),
    )
    .map(|((fun, name), (parameters, (returns, (body, end))))| {
        Function::new(
            name.lexeme.clone(),
            parameters.unwrap_or_default(),
            returns,
            body,
            fun.span.till(end),
        )
    })
    .parse(input)
}

// parameter: identifier [':' identifier]
fn parameter(input: ParserInput) -> ParseResult<Parameter> {
    pair(identifier, maybe(type_annotation))
        .map(|(name, type_name)| Parameter {
            name: name.lexeme.clone(),
            type_name,
        })
        .parse(input)
}

// type_annotation: ':' identifier
fn type_annotation(input: ParserInput) -> ParseResult<String> {
    right(token(":"), identifier)
        .map(|name| name.lexeme.clone())
        .parse(input)
}

// identifier: IDENTIFIER that is not a reserved word
fn identifier(input: ParserInput) -> ParseResult<&Token> {
    match input.first() {
        Some(token) if token.typ == TT::IDENTIFIER && !RESERVED.contains(&token.lexeme.as_str()) => {
            ParseResult::Ok((token, input.advance()))
        }
        _ => {
            input.report_error("expected identifier");
            ParseResult::Err
        }
    }
}

// # STATEMENTS
// # ==========

// block: statement*
fn block(input: ParserInput) -> ParseResult<Vec<Statement>> {
    nested(zero_or_more(statement)).parse(input)
}

// statement:
//     | declaration_stmt
//     | if_stmt
//     | switch_stmt
//     | while_stmt
//     | return_stmt
//     | expression_stmt
fn statement(input: ParserInput) -> ParseResult<Statement> {
    declaration_stmt
        .or(if_stmt)
        .or(switch_stmt)
        .or(while_stmt)
        .or(return_stmt)
        .or(expression_stmt)
        .parse(input)
}

// declaration_stmt: 'LET' identifier [':' identifier] ['=' expression] ';'
fn declaration_stmt(input: ParserInput) -> ParseResult<Statement> {
    pair(
        pair(token("LET"), identifier),
        pair(
            pair(maybe(type_annotation), maybe(right(token("="), expression))),
            token(";"),
        ),
    )
    .map(|((let_, name), ((type_name, value), semi))| {
        Statement::Declaration(Declaration::new(
            name.lexeme.clone(),
            type_name,
            value,
            let_.span.till(semi),
        ))
    })
    .parse(input)
}

// if_stmt: 'IF' expression 'DO' block ['ELSE' block] 'END'
fn if_stmt(input: ParserInput) -> ParseResult<Statement> {
    pair(
        pair(token("IF"), left(expression, token("DO"))),
        pair(
            pair(block, maybe(right(token("ELSE"), block))),
            token("END"),
        ),
    )
    .map(|((if_, condition), ((then_block, else_block), end))| Statement::If {
        condition,
        then_block,
        else_block: else_block.unwrap_or_default(),
        span: if_.span.till(end),
    })
    .parse(input)
}

// switch_stmt: 'SWITCH' expression case_block* default_block 'END'
fn switch_stmt(input: ParserInput) -> ParseResult<Statement> {
    pair(
        pair(token("SWITCH"), expression),
        pair(pair(zero_or_more(case_block), default_block), token("END")),
    )
    .map(|((switch, condition), ((mut cases, default), end))| {
        cases.push(default);
        Statement::Switch {
            condition,
            cases,
            span: switch.span.till(end),
        }
    })
    .parse(input)
}

// case_block: 'CASE' expression ':' block
fn case_block(input: ParserInput) -> ParseResult<Case> {
    pair(pair(token("CASE"), left(expression, token(":"))), block)
        .map(|((case, value), block)| Case {
            span: case.span.till(&value).till_block(&block),
            value: Some(value),
            block,
        })
        .parse(input)
}

// default_block: 'DEFAULT' block
fn default_block(input: ParserInput) -> ParseResult<Case> {
    pair(token("DEFAULT"), block)
        .map(|(default, block)| Case {
            span: default.span.till_block(&block),
            value: None,
            block,
        })
        .parse(input)
}

// while_stmt: 'WHILE' expression 'DO' block 'END'
fn while_stmt(input: ParserInput) -> ParseResult<Statement> {
    pair(
        pair(token("WHILE"), left(expression, token("DO"))),
        pair(block, token("END")),
    )
    .map(|((while_, condition), (block, end))| Statement::While {
        condition,
        block,
        span: while_.span.till(end),
    })
    .parse(input)
}

// return_stmt: 'RETURN' expression ';'
fn return_stmt(input: ParserInput) -> ParseResult<Statement> {
    pair(pair(token("RETURN"), expression), token(";"))
        .map(|((ret, value), semi)| Statement::Return {
            value,
            span: ret.span.till(semi),
        })
        .parse(input)
}

// expression_stmt: expression ['=' expression] ';'
fn expression_stmt(input: ParserInput) -> ParseResult<Statement> {
    pair(
        pair(expression, maybe(right(token("="), expression))),
        token(";"),
    )
    .map(|((receiver, value), semi)| match value {
        Some(value) => Statement::Assignment {
            span: receiver.span.till(semi),
            receiver,
            value,
        },
        None => Statement::Expression(receiver),
    })
    .parse(input)
}

// # EXPRESSIONS
// # ===========

fn fold_binary(first: Expression, rest: Vec<(&Token, Expression)>) -> Expression {
    rest.into_iter().fold(first, |left, (operator, right)| {
        let span = left.span.till(&right);
        Expression::new(
            ExpressionKind::Binary(Operator::from(operator), Box::new((left, right))),
            span,
        )
    })
}

// expression: logical
fn expression(input: ParserInput) -> ParseResult<Expression> {
    nested(logical).parse(input)
}

// logical: comparison (('&&' | '||') comparison)*
fn logical(input: ParserInput) -> ParseResult<Expression> {
    pair(comparison, zero_or_more(pair(one_of(&["&&", "||"]), comparison)))
        .map(|(first, rest)| fold_binary(first, rest))
        .parse(input)
}

// comparison: additive (('<' | '>' | '==' | '!=') additive)*
fn comparison(input: ParserInput) -> ParseResult<Expression> {
    pair(
        additive,
        zero_or_more(pair(one_of(&["<", ">", "==", "!="]), additive)),
    )
    .map(|(first, rest)| fold_binary(first, rest))
    .parse(input)
}

// additive: multiplicative (('+' | '-') multiplicative)*
fn additive(input: ParserInput) -> ParseResult<Expression> {
    pair(
        multiplicative,
        zero_or_more(pair(one_of(&["+", "-"]), multiplicative)),
    )
    .map(|(first, rest)| fold_binary(first, rest))
    .parse(input)
}

// multiplicative: primary (('*' | '/' | '%' | '^') primary)*
fn multiplicative(input: ParserInput) -> ParseResult<Expression> {
    pair(
        primary,
        zero_or_more(pair(one_of(&["*", "/", "%", "^"]), primary)),
    )
    .map(|(first, rest)| fold_binary(first, rest))
    .parse(input)
}

// primary:
//     | 'NIL' | 'TRUE' | 'FALSE'
//     | INTEGER | DECIMAL | CHARACTER | STRING
//     | '(' expression ')'
//     | identifier '(' [expression (',' expression)*] ')'
//     | identifier ['[' expression ']']
fn primary(input: ParserInput) -> ParseResult<Expression> {
    keyword_literal
        .or(integer)
        .or(decimal)
        .or(character)
        .or(string)
        .or(group)
        .or(call)
        .or(access)
        .or(expected("expression"))
        .parse(input)
}

fn literal(value: Literal, token: &Token) -> Expression {
    Expression::new(ExpressionKind::Literal(value), token.span)
}

fn keyword_literal(input: ParserInput) -> ParseResult<Expression> {
    token("NIL")
        .map(|t| literal(Literal::Nil, t))
        .or(token("TRUE").map(|t| literal(Literal::Boolean(true), t)))
        .or(token("FALSE").map(|t| literal(Literal::Boolean(false), t)))
        .parse(input)
}

/// A literal token whose text still has to be converted. Conversion failures
/// are fatal: no other alternative could accept the token.
fn converted<'a>(
    typ: TT,
    convert: fn(&str) -> std::result::Result<Literal, String>,
) -> impl Fn(ParserInput<'a>) -> ParseResult<'a, Expression> {
    move |input| {
        tok(typ)
            .parse(input)
            .and_then(|(token, rest)| match convert(&token.lexeme) {
                Ok(value) => ParseResult::Ok((literal(value, token), rest)),
                Err(msg) => {
                    input.abort(Error::parse(token.offset(), &msg));
                    ParseResult::Err
                }
            })
    }
}

fn integer(input: ParserInput) -> ParseResult<Expression> {
    converted(TT::INTEGER, |lexeme| {
        BigInt::from_str(lexeme)
            .map(Literal::Integer)
            .map_err(|e| e.to_string())
    })
    .parse(input)
}

fn decimal(input: ParserInput) -> ParseResult<Expression> {
    converted(TT::DECIMAL, |lexeme| {
        BigDecimal::from_str(lexeme)
            .map(Literal::Decimal)
            .map_err(|e| e.to_string())
    })
    .parse(input)
}

fn character(input: ParserInput) -> ParseResult<Expression> {
    converted(TT::CHARACTER, |lexeme| {
        let value = unescape(strip_quotes(lexeme))?;
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(chr), None) => Ok(Literal::Character(chr)),
            _ => Err(format!("invalid character literal {lexeme}")),
        }
    })
    .parse(input)
}

fn string(input: ParserInput) -> ParseResult<Expression> {
    converted(TT::STRING, |lexeme| {
        unescape(strip_quotes(lexeme)).map(Literal::String)
    })
    .parse(input)
}

fn strip_quotes(lexeme: &str) -> &str {
    &lexeme[1..lexeme.len() - 1]
}

fn unescape(body: &str) -> std::result::Result<String, String> {
    let mut result = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(chr) = chars.next() {
        if chr != '\\' {
            result.push(chr);
            continue;
        }
        result.push(match chars.next() {
            Some('b') => '\u{8}',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some(c @ ('\'' | '"' | '\\')) => c,
            Some(c) => return Err(format!("invalid escape sequence '\\{c}'")),
            None => return Err("unterminated escape sequence".to_string()),
        });
    }
    Ok(result)
}

// group: '(' expression ')'
fn group(input: ParserInput) -> ParseResult<Expression> {
    pair(pair(token("("), expression), token(")"))
        .map(|((open, inner), close)| {
            Expression::new(ExpressionKind::Group(Box::new(inner)), open.span.till(close))
        })
        .parse(input)
}

// call: identifier '(' [expression (',' expression)*] ')'
fn call(input: ParserInput) -> ParseResult<Expression> {
    pair(
        pair(identifier, right(token("("), maybe(sep_by(expression, ",")))),
        token(")"),
    )
    .map(|((name, arguments), close)| {
        Expression::new(
            ExpressionKind::Call(Call::new(name.lexeme.clone(), arguments.unwrap_or_default())),
            name.span.till(close),
        )
    })
    .parse(input)
}

// access: identifier ['[' expression ']']
fn access(input: ParserInput) -> ParseResult<Expression> {
    pair(
        identifier,
        maybe(pair(right(token("["), expression), token("]"))),
    )
    .map(|(name, offset)| {
        let span = match &offset {
            Some((_, close)) => name.span.till(*close),
            None => name.span,
        };
        Expression::new(
            ExpressionKind::Access(Access::new(
                name.lexeme.clone(),
                offset.map(|(expr, _)| Box::new(expr)),
            )),
            span,
        )
    })
    .parse(input)
}
