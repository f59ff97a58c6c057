//! Tokenizer for CUBE source text (spec.md §4.1).
//!
//! A single left-to-right scan built on `logos` for the regex-driven token
//! classes (numeric literals, identifiers, string bodies), with hand-written
//! post-processing for the pieces that aren't expressible as independent
//! regex alternatives: the dotted-identifier suffix, keyword recognition
//! (done *after* the identifier regex matches, per spec), and the
//! `#include` directive. This mirrors how the teacher's `Lexer` wraps a
//! `logos`-generated enum and converts it to the public `Token` type
//! (`raya_parser::lexer::Lexer`), with string literals handled as a special
//! case the same way the teacher special-cases template literals.

use crate::token::{Span, Token};
use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
enum Raw {
    #[regex(r"[ \t\r\n]+", logos::skip)]
    Whitespace,

    #[regex(r"--[^\n]*", logos::skip)]
    LineComment,

    #[regex(r"#include[ \t]+[A-Za-z_][A-Za-z0-9_]*", lex_include)]
    Include(String),

    #[token("/\\")]
    Conj,
    #[token("\\/")]
    Disj,
    #[token("->")]
    Arrow,
    #[token("<-")]
    LArrow,

    #[token("+")]
    Plus,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("=")]
    Equal,

    #[regex(r"-?(0[xX][0-9a-fA-F]*|[0-9]+)", parse_number)]
    IntLit(i64),

    #[token("\"")]
    Quote,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?", |lex| lex.slice().to_string())]
    IdentLike(String),
}

fn lex_include(lex: &mut logos::Lexer<Raw>) -> String {
    lex.slice()
        .trim_start_matches("#include")
        .trim()
        .to_string()
}

fn parse_number(lex: &mut logos::Lexer<Raw>) -> Option<i64> {
    let s = lex.slice();
    let (neg, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let value = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        if hex.is_empty() {
            return None;
        }
        i64::from_str_radix(hex, 16).ok()?
    } else {
        body.parse::<i64>().ok()?
    };
    Some(if neg { -value } else { value })
}

/// A collected lex error; never aborts the scan (spec.md §4.1, §7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    UnexpectedCharacter { ch: char, span: Span },
    UnterminatedString { span: Span },
    InvalidNumber { text: String, span: Span },
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexError::UnexpectedCharacter { ch, span } => {
                write!(f, "unexpected character '{ch}' at {}:{}", span.line, span.col)
            }
            LexError::UnterminatedString { span } => {
                write!(f, "unterminated string starting at {}:{}", span.line, span.col)
            }
            LexError::InvalidNumber { text, span } => {
                write!(f, "invalid numeral '{text}' at {}:{}", span.line, span.col)
            }
        }
    }
}

impl std::error::Error for LexError {}

/// Tokenize `source` into a stream ending in `Eof`. Lexical errors never
/// abort the scan; they accumulate in the returned `Vec` alongside the
/// (possibly incomplete) token stream, and the caller decides whether to
/// proceed to parsing.
pub fn tokenize(source: &str) -> (Vec<(Token, Span)>, Vec<LexError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    let mut raw_lexer = Raw::lexer(source);
    let mut line = 1u32;
    let mut col = 1u32;
    let mut cursor = 0usize;

    let advance_position = |line: &mut u32, col: &mut u32, text: &str| {
        for c in text.chars() {
            if c == '\n' {
                *line += 1;
                *col = 1;
            } else {
                *col += 1;
            }
        }
    };

    while let Some(result) = raw_lexer.next() {
        let range = raw_lexer.span();
        advance_position(&mut line, &mut col, &source[cursor..range.start]);
        let start_line = line;
        let start_col = col;

        match result {
            Ok(Raw::Quote) => {
                match scan_string(source, range.end, start_line, start_col) {
                    Ok((text, end_byte, end_line, end_col)) => {
                        tokens.push((
                            Token::StringLit(text),
                            Span::new(range.start, end_byte, start_line, start_col),
                        ));
                        cursor = end_byte;
                        line = end_line;
                        col = end_col;
                        continue;
                    }
                    Err(()) => {
                        errors.push(LexError::UnterminatedString {
                            span: Span::new(range.start, source.len(), start_line, start_col),
                        });
                        cursor = source.len();
                        break;
                    }
                }
            }
            Ok(raw_tok) => {
                let token = convert(raw_tok);
                tokens.push((token, Span::new(range.start, range.end, start_line, start_col)));
            }
            Err(()) => {
                let text = &source[range.start..range.end];
                let looks_numeric = text.starts_with(|c: char| c.is_ascii_digit())
                    || text.trim_start_matches('-').starts_with("0x")
                    || text.trim_start_matches('-').starts_with("0X");
                if looks_numeric {
                    errors.push(LexError::InvalidNumber {
                        text: text.to_string(),
                        span: Span::new(range.start, range.end, start_line, start_col),
                    });
                } else {
                    let ch = text.chars().next().unwrap_or('\0');
                    errors.push(LexError::UnexpectedCharacter {
                        ch,
                        span: Span::new(range.start, range.end, start_line, start_col),
                    });
                }
            }
        }

        advance_position(&mut line, &mut col, &source[range.start..range.end]);
        cursor = range.end;
    }

    let eof_span = Span::new(source.len(), source.len(), line, col);
    tokens.push((Token::Eof, eof_span));

    (tokens, errors)
}

/// Hand-scan a double-quoted string body starting right after the opening
/// quote, honoring `\\ \" \n \r \t` and passing any other escaped character
/// through literally (spec.md §4.1).
fn scan_string(
    source: &str,
    start: usize,
    mut line: u32,
    mut col: u32,
) -> Result<(String, usize, u32, u32), ()> {
    let mut out = String::new();
    let mut chars = source[start..].char_indices();

    while let Some((i, c)) = chars.next() {
        let abs = start + i;
        match c {
            '"' => return Ok((out, abs + 1, line, col + 1)),
            '\\' => {
                col += 1;
                match chars.next() {
                    Some((_, 'n')) => {
                        out.push('\n');
                        col += 1;
                    }
                    Some((_, 'r')) => {
                        out.push('\r');
                        col += 1;
                    }
                    Some((_, 't')) => {
                        out.push('\t');
                        col += 1;
                    }
                    Some((_, '\\')) => {
                        out.push('\\');
                        col += 1;
                    }
                    Some((_, '"')) => {
                        out.push('"');
                        col += 1;
                    }
                    Some((_, other)) => {
                        out.push(other);
                        col += 1;
                    }
                    None => return Err(()),
                }
            }
            '\n' => {
                out.push('\n');
                line += 1;
                col = 1;
            }
            _ => {
                out.push(c);
                col += 1;
            }
        }
    }
    Err(())
}

fn convert(raw: Raw) -> Token {
    match raw {
        Raw::Include(name) => Token::Include(name),
        Raw::Conj => Token::Conj,
        Raw::Disj => Token::Disj,
        Raw::Arrow => Token::Arrow,
        Raw::LArrow => Token::LArrow,
        Raw::Plus => Token::Plus,
        Raw::LBrace => Token::LBrace,
        Raw::RBrace => Token::RBrace,
        Raw::LParen => Token::LParen,
        Raw::RParen => Token::RParen,
        Raw::Comma => Token::Comma,
        Raw::Colon => Token::Colon,
        Raw::Dot => Token::Dot,
        Raw::Equal => Token::Equal,
        Raw::IntLit(n) => Token::IntLit(n),
        Raw::IdentLike(text) => classify_ident(text),
        Raw::Whitespace | Raw::LineComment => unreachable!("skipped by logos"),
        Raw::Quote => unreachable!("handled specially in tokenize()"),
    }
}

/// Keyword recognition happens *after* the identifier regex matches
/// (spec.md §4.1): `lambda`/`Lambda`/`node` win over the generic
/// `Ident`/`TypeIdent` classification even though `Lambda` would otherwise
/// also satisfy the uppercase-start `TypeIdent` rule.
fn classify_ident(text: String) -> Token {
    match text.as_str() {
        "lambda" => return Token::Lambda,
        "Lambda" => return Token::LambdaUpper,
        "node" => return Token::Node,
        _ => {}
    }
    let starts_upper = text.chars().next().is_some_and(|c| c.is_ascii_uppercase());
    let has_dot = text.contains('.');
    if starts_upper && !has_dot {
        Token::TypeIdent(text)
    } else {
        Token::Ident(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(src: &str) -> Vec<Token> {
        tokenize(src).0.into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn two_char_operators_win_over_components() {
        assert_eq!(toks("/\\"), vec![Token::Conj, Token::Eof]);
        assert_eq!(toks("\\/"), vec![Token::Disj, Token::Eof]);
        assert_eq!(toks("->"), vec![Token::Arrow, Token::Eof]);
        assert_eq!(toks("<-"), vec![Token::LArrow, Token::Eof]);
    }

    #[test]
    fn dotted_identifier_is_one_token() {
        assert_eq!(
            toks("f18a.dup"),
            vec![Token::Ident("f18a.dup".to_string()), Token::Eof]
        );
        assert_eq!(
            toks("rom.multiply"),
            vec![Token::Ident("rom.multiply".to_string()), Token::Eof]
        );
    }

    #[test]
    fn type_ident_requires_uppercase_and_no_dot() {
        assert_eq!(toks("Foo"), vec![Token::TypeIdent("Foo".to_string()), Token::Eof]);
        assert_eq!(toks("foo"), vec![Token::Ident("foo".to_string()), Token::Eof]);
    }

    #[test]
    fn keywords_beat_generic_classification() {
        assert_eq!(toks("lambda"), vec![Token::Lambda, Token::Eof]);
        assert_eq!(toks("Lambda"), vec![Token::LambdaUpper, Token::Eof]);
        assert_eq!(toks("node"), vec![Token::Node, Token::Eof]);
    }

    #[test]
    fn hex_and_decimal_and_negative_literals() {
        assert_eq!(toks("0x10"), vec![Token::IntLit(16), Token::Eof]);
        assert_eq!(toks("0X1F"), vec![Token::IntLit(31), Token::Eof]);
        assert_eq!(toks("42"), vec![Token::IntLit(42), Token::Eof]);
        assert_eq!(toks("-7"), vec![Token::IntLit(-7), Token::Eof]);
    }

    #[test]
    fn invalid_hex_numeral_is_recovered() {
        let (_, errors) = tokenize("0x");
        assert!(!errors.is_empty());
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            toks(r#""a\nb\"c\\d""#),
            vec![Token::StringLit("a\nb\"c\\d".to_string()), Token::Eof]
        );
    }

    #[test]
    fn unterminated_string_is_diagnosed_not_panicked() {
        let (tokens, errors) = tokenize("\"abc");
        assert!(errors.iter().any(|e| matches!(e, LexError::UnterminatedString { .. })));
        assert_eq!(tokens.last().unwrap().0, Token::Eof);
    }

    #[test]
    fn unknown_character_recovers_and_continues() {
        let (tokens, errors) = tokenize("@ node");
        assert!(!errors.is_empty());
        assert!(tokens.iter().any(|(t, _)| matches!(t, Token::Node)));
    }

    #[test]
    fn include_directive_is_one_token() {
        assert_eq!(
            toks("#include stdlib"),
            vec![Token::Include("stdlib".to_string()), Token::Eof]
        );
    }

    #[test]
    fn line_comment_to_end_of_line() {
        assert_eq!(toks("node -- this is a comment\n112"), vec![
            Token::Node,
            Token::IntLit(112),
            Token::Eof
        ]);
    }
}
