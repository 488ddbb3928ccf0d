//! Tokenizer: source text to a flat token sequence.
//!
//! - `//` starts a comment running to the end of the line (outside strings)
//! - `(`, `)`, `[`, `]` and `*` are always tokens of their own
//! - single- or double-quoted strings stay one token, quotes and escapes
//!   included; they are decoded when the literal is evaluated
//! - everything else is split on whitespace

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_till},
    character::complete::{multispace1, one_of, satisfy},
    combinator::{not, recognize, value},
    error::ErrorKind,
    multi::{many0, many0_count, many1_count},
    sequence::{pair, preceded, terminated},
};

use crate::{Error, ParseError, ParseErrorKind};

pub type Token = String;

/// Characters that always form a token by themselves
const SPECIAL_CHARS: &str = "()[]*";

fn is_boundary(c: char) -> bool {
    c.is_whitespace() || SPECIAL_CHARS.contains(c)
}

fn line_comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(tag("//"), take_till(|c| c == '\n'))).parse(input)
}

fn trivia(input: &str) -> IResult<&str, ()> {
    value((), many0_count(alt((multispace1, line_comment)))).parse(input)
}

fn special(input: &str) -> IResult<&str, &str> {
    recognize(one_of(SPECIAL_CHARS)).parse(input)
}

/// Quoted string, returned raw. Unterminated input is a `Failure` tagged
/// `Eof` so the caller can report it as incomplete; bad escapes fail with `Char`.
fn quoted(input: &str) -> IResult<&str, &str> {
    let quote = match input.chars().next() {
        Some(q @ ('"' | '\'')) => q,
        _ => return Err(nom::Err::Error(nom::error::Error::new(input, ErrorKind::Char))),
    };

    let mut chars = input.char_indices().skip(1);
    while let Some((i, ch)) = chars.next() {
        if ch == quote {
            let end = i + ch.len_utf8();
            return Ok((&input[end..], &input[..end]));
        }
        if ch == '\\' {
            match chars.next() {
                Some((_, 'n' | 't' | 'r' | '\\' | '"' | '\'')) => {}
                Some(_) => {
                    return Err(nom::Err::Failure(nom::error::Error::new(
                        &input[i..],
                        ErrorKind::Char,
                    )));
                }
                None => break,
            }
        }
    }

    Err(nom::Err::Failure(nom::error::Error::new(input, ErrorKind::Eof)))
}

/// Bare word: runs until whitespace, a special character or a comment
fn atom(input: &str) -> IResult<&str, &str> {
    recognize(many1_count(preceded(not(tag("//")), satisfy(|c| !is_boundary(c))))).parse(input)
}

fn token(input: &str) -> IResult<&str, &str> {
    alt((special, quoted, atom)).parse(input)
}

fn char_offset(text: &str, rest: &str) -> usize {
    let byte_offset = text.len().saturating_sub(rest.len());
    text[..byte_offset].chars().count()
}

fn lex_error(text: &str, error: nom::Err<nom::error::Error<&str>>) -> Error {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let offset = char_offset(text, e.input);
            let parse_error = match e.code {
                ErrorKind::Eof => ParseError::with_context(
                    ParseErrorKind::Incomplete,
                    "unterminated string literal",
                    text,
                    offset,
                ),
                ErrorKind::Char => {
                    let mut err = ParseError::with_context(
                        ParseErrorKind::InvalidSyntax,
                        "unknown escape sequence in string literal",
                        text,
                        offset,
                    );
                    err.found = Some(e.input.chars().take(2).collect());
                    err
                }
                _ => ParseError::with_context(
                    ParseErrorKind::InvalidSyntax,
                    format!("unexpected input at position {offset}"),
                    text,
                    offset,
                ),
            };
            parse_error.into()
        }
        nom::Err::Incomplete(_) => {
            ParseError::from_message(ParseErrorKind::Incomplete, "incomplete input").into()
        }
    }
}

/// Split source text into tokens.
///
/// Fails only on string literals: unterminated ones yield an
/// [`ParseErrorKind::Incomplete`] error, unknown escapes an
/// [`ParseErrorKind::InvalidSyntax`] one.
pub fn tokenize(text: &str) -> Result<Vec<Token>, Error> {
    let (rest, tokens) = terminated(many0(preceded(trivia, token)), trivia)
        .parse(text)
        .map_err(|e| lex_error(text, e))?;

    if !rest.is_empty() {
        let offset = char_offset(text, rest);
        return Err(ParseError::with_context(
            ParseErrorKind::InvalidSyntax,
            format!("unexpected input at position {offset}"),
            text,
            offset,
        )
        .into());
    }

    Ok(tokens.into_iter().map(str::to_owned).collect())
}
