//! Lexer: pest tokenization plus context-sensitive fixups
//!
//! pest produces a flat token stream. Two decisions need context the grammar
//! does not have:
//!
//! - a line-initial `-` followed by whitespace starts a new command at bracket
//!   depth zero (or in column zero), and a nested sequence item inside
//!   brackets; anywhere else it is an operator
//! - a `-` glued to a number is a sign unless it follows a value it is glued to

use pest::Parser;
use pest_derive::Parser;
use tracing::warn;

use super::token::{Token, TokenKind};
use crate::position::SourcePos;

/* ===================== PEST Lexer ===================== */

#[derive(Parser)]
#[grammar = "parser/scl.pest"]
pub(crate) struct SclLexer;

/// Tokenize a whole document
pub fn lex(text: &str) -> Vec<Token> {
    lex_at(text, SourcePos::START)
}

/// Tokenize `text` as if it started at `origin` in the document, so every
/// token carries document-absolute positions. The result always ends with an
/// [`TokenKind::EndOfInput`] token.
pub fn lex_at(text: &str, origin: SourcePos) -> Vec<Token> {
    let raw = raw_tokens(text, origin);
    let mut tokens = classify(raw);
    let end = tokens.last().map(|t| t.stop).unwrap_or(origin);
    tokens.push(Token::new(TokenKind::EndOfInput, "", end));
    tokens
}

/// Only the tokens the grammar sees
pub fn significant(tokens: &[Token]) -> impl Iterator<Item = &Token> {
    tokens.iter().filter(|t| !t.is_hidden())
}

/// The name typed so far when `text` ends inside a variable reference,
/// e.g. `Some("na")` for `Print <na`
pub fn partial_variable(text: &str) -> Option<&str> {
    let tail = &text[text.rfind('<')?..];
    SclLexer::parse(Rule::partial_variable, tail).ok()?;
    Some(&tail[1..])
}

fn raw_tokens(text: &str, origin: SourcePos) -> Vec<Token> {
    let pairs = match SclLexer::parse(Rule::tokens, text) {
        Ok(mut pairs) => match pairs.next() {
            Some(document) => document.into_inner(),
            None => return Vec::new(),
        },
        Err(e) => {
            // `error_char` matches any character, so this is unreachable in
            // practice; degrade to a single error token.
            warn!(error = %e, "lexer rejected input");
            return vec![Token::new(TokenKind::Error, text, origin)];
        }
    };

    let mut pos = origin;
    let mut tokens = Vec::new();
    for pair in pairs {
        let Some(kind) = kind_of(pair.as_rule()) else {
            continue;
        };
        let token = Token::new(kind, pair.as_str(), pos);
        pos = token.stop;
        tokens.push(token);
    }
    tokens
}

fn kind_of(rule: Rule) -> Option<TokenKind> {
    let kind = match rule {
        Rule::newline => TokenKind::Newline,
        Rule::whitespace => TokenKind::Whitespace,
        Rule::line_comment => TokenKind::LineComment,
        Rule::block_comment => TokenKind::BlockComment,
        Rule::multiline_string => TokenKind::MultilineString,
        Rule::interpolated_string => TokenKind::InterpolatedString,
        Rule::double_quoted_string => TokenKind::DoubleQuotedString,
        Rule::single_quoted_string => TokenKind::SingleQuotedString,
        Rule::unterminated_string => TokenKind::UnterminatedString,
        Rule::date_time => TokenKind::DateTime,
        Rule::number => TokenKind::Number,
        Rule::variable => TokenKind::Variable,
        Rule::unclosed_variable => TokenKind::UnclosedVariable,
        Rule::arrow => TokenKind::Arrow,
        // Dashes start as operators; `classify` decides what they really are
        Rule::operator | Rule::dash => TokenKind::Operator,
        Rule::open_paren => TokenKind::OpenParen,
        Rule::close_paren => TokenKind::CloseParen,
        Rule::open_bracket => TokenKind::OpenBracket,
        Rule::close_bracket => TokenKind::CloseBracket,
        Rule::comma => TokenKind::Comma,
        Rule::colon => TokenKind::Colon,
        Rule::equals => TokenKind::Equals,
        Rule::pipe => TokenKind::Pipe,
        Rule::enum_value => TokenKind::EnumValue,
        Rule::true_literal => TokenKind::True,
        Rule::false_literal => TokenKind::False,
        Rule::name => TokenKind::Name,
        Rule::error_char => TokenKind::Error,
        _ => return None,
    };
    Some(kind)
}

fn classify(raw: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(raw.len());
    let mut at_line_start = true;
    let mut depth: usize = 0;
    let mut previous: Option<usize> = None;

    let mut i = 0;
    while i < raw.len() {
        let mut token = raw[i].clone();
        match token.kind {
            TokenKind::Newline => {
                at_line_start = true;
                out.push(token);
                i += 1;
                continue;
            }
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment => {
                if token.kind != TokenKind::Whitespace {
                    at_line_start = false;
                }
                out.push(token);
                i += 1;
                continue;
            }
            TokenKind::OpenParen | TokenKind::OpenBracket => depth += 1,
            TokenKind::CloseParen | TokenKind::CloseBracket => depth = depth.saturating_sub(1),
            TokenKind::Operator if token.text == "-" => {
                let next = raw.get(i + 1);
                let followed_by_space = next.map_or(true, |n| {
                    matches!(n.kind, TokenKind::Whitespace | TokenKind::Newline)
                });

                if at_line_start && followed_by_space {
                    if token.start.column == 0 {
                        depth = 0;
                    }
                    token.kind = if depth == 0 {
                        TokenKind::NewCommand
                    } else {
                        TokenKind::SequenceDash
                    };
                } else if let Some(number) = next.filter(|n| {
                    n.kind == TokenKind::Number && token.is_adjacent_to(n)
                }) {
                    let glued_to_value = previous.map(|p| &out[p]).is_some_and(|p| {
                        p.kind.ends_value() && p.is_adjacent_to(&token)
                    });
                    if !glued_to_value {
                        token = Token::new(
                            TokenKind::Number,
                            format!("-{}", number.text),
                            token.start,
                        );
                        i += 1;
                    }
                }
            }
            _ => {}
        }

        at_line_start = false;
        previous = Some(out.len());
        out.push(token);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        significant(&lex(text)).map(|t| t.kind).collect()
    }

    #[test]
    fn test_dash_classification() {
        use TokenKind::*;
        assert_eq!(
            kinds("- Print 1\n- Print 2"),
            vec![NewCommand, Name, Number, NewCommand, Name, Number, EndOfInput]
        );
        assert_eq!(
            kinds("(\n  - Print 1\n)"),
            vec![OpenParen, SequenceDash, Name, Number, CloseParen, EndOfInput]
        );
        assert_eq!(kinds("3 - 1"), vec![Number, Operator, Number, EndOfInput]);
    }

    #[test]
    fn test_column_zero_dash_always_starts_a_command() {
        use TokenKind::*;
        assert_eq!(
            kinds("- Foo (1\n- Print 2"),
            vec![NewCommand, Name, OpenParen, Number, NewCommand, Name, Number, EndOfInput]
        );
    }

    #[test]
    fn test_negative_numbers() {
        let tokens: Vec<Token> = significant(&lex("Print -1")).cloned().collect();
        assert_eq!(tokens[1].kind, TokenKind::Number);
        assert_eq!(tokens[1].text, "-1");

        use TokenKind::*;
        assert_eq!(kinds("3-1"), vec![Number, Operator, Number, EndOfInput]);
    }

    #[test]
    fn test_positions_are_offset_by_origin() {
        let origin = SourcePos::new(3, 0, 20);
        let tokens = lex_at("- Print", origin);
        let name = tokens.iter().find(|t| t.kind == TokenKind::Name).unwrap();
        assert_eq!(name.start, SourcePos::new(3, 2, 22));
        assert_eq!(name.stop, SourcePos::new(3, 7, 27));
    }

    #[test]
    fn test_literal_tokens() {
        use TokenKind::*;
        assert_eq!(
            kinds(r#"2020-01-02T10:00:00 "a\"b" 'it''s' $"x {1}" true FALSE TextCase.Upper"#),
            vec![
                DateTime,
                DoubleQuotedString,
                SingleQuotedString,
                InterpolatedString,
                True,
                False,
                EnumValue,
                EndOfInput
            ]
        );
        assert_eq!(kinds("<x> <y"), vec![Variable, UnclosedVariable, EndOfInput]);
        assert_eq!(kinds("\"abc"), vec![UnterminatedString, EndOfInput]);
    }

    #[test]
    fn test_partial_variable() {
        assert_eq!(partial_variable("Print <na"), Some("na"));
        assert_eq!(partial_variable("Print <"), Some(""));
        assert_eq!(partial_variable("Print <name> "), None);
        assert_eq!(partial_variable("Print 1"), None);
    }

    #[test]
    fn test_comments_are_hidden() {
        let tokens = lex("Print 1 # note\n/* block */");
        let comments: Vec<&Token> = tokens.iter().filter(|t| t.kind.is_comment()).collect();
        assert_eq!(comments.len(), 2);
        assert!(comments.iter().all(|t| t.is_hidden()));
    }
}
