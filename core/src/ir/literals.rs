//! Decoding of literal tokens

use chrono::{NaiveDate, NaiveDateTime};

use super::ConstantValue;
use crate::errors::{ErrorKind, ErrorList, SingleError};
use crate::parser::{Token, TokenKind};
use crate::position::{SourcePos, TextLocation};

/// Piece of an interpolated string
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    /// Source of an embedded step and where it starts in the document
    Expression { text: String, start: SourcePos },
}

/// Decode a literal token that is not an interpolated string
pub fn decode_constant(token: &Token) -> Result<ConstantValue, ErrorList> {
    let location = token.location();
    match token.kind {
        TokenKind::True => Ok(ConstantValue::Bool(true)),
        TokenKind::False => Ok(ConstantValue::Bool(false)),
        TokenKind::Number => decode_number(&token.text, &location),
        TokenKind::DateTime => decode_date(&token.text, &location),
        TokenKind::EnumValue => {
            let (enum_type, member) = token.text.split_once('.').unwrap_or((&token.text, ""));
            Ok(ConstantValue::Enum {
                enum_type: enum_type.to_string(),
                member: member.to_string(),
            })
        }
        TokenKind::DoubleQuotedString => {
            decode_escapes(strip(&token.text, 1, 1), &location).map(ConstantValue::String)
        }
        TokenKind::SingleQuotedString => Ok(ConstantValue::String(
            strip(&token.text, 1, 1).replace("''", "'"),
        )),
        TokenKind::MultilineString => Ok(ConstantValue::String(decode_multiline(&token.text))),
        other => panic!("{:?} is not a constant literal", other),
    }
}

fn strip(text: &str, prefix: usize, suffix: usize) -> &str {
    text.get(prefix..text.len().saturating_sub(suffix)).unwrap_or("")
}

pub fn decode_number(text: &str, location: &TextLocation) -> Result<ConstantValue, ErrorList> {
    let invalid = || ErrorList::at(ErrorKind::InvalidNumber(text.to_string()), location);
    if text.contains('.') {
        text.parse::<f64>()
            .map(ConstantValue::Double)
            .map_err(|_| invalid())
    } else {
        text.parse::<i64>()
            .map(ConstantValue::Integer)
            .map_err(|_| invalid())
    }
}

pub fn decode_date(text: &str, location: &TextLocation) -> Result<ConstantValue, ErrorList> {
    const FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

    let parsed = FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        });
    parsed
        .map(ConstantValue::Date)
        .ok_or_else(|| ErrorList::at(ErrorKind::InvalidDate(text.to_string()), location))
}

/// Resolve backslash escapes in double-quoted text
pub fn decode_escapes(text: &str, location: &TextLocation) -> Result<String, ErrorList> {
    let mut out = String::with_capacity(text.len());
    let mut errors = ErrorList::empty();
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some(other) => errors.push(SingleError::at(
                ErrorKind::InvalidEscape(format!("\\{}", other)),
                location,
            )),
            None => errors.push(SingleError::at(
                ErrorKind::InvalidEscape("\\".to_string()),
                location,
            )),
        }
    }
    errors.into_result(out)
}

/// Strip the triple delimiters and a leading line break
pub fn decode_multiline(text: &str) -> String {
    let inner = strip(text, 3, 3);
    let inner = inner
        .strip_prefix("\r\n")
        .or_else(|| inner.strip_prefix('\n'))
        .unwrap_or(inner);
    inner.to_string()
}

/// Split an interpolated string token (`$"..."`) into text and embedded steps
pub fn split_interpolated(token: &Token) -> Result<Vec<Segment>, ErrorList> {
    let location = token.location();
    let text = token.text.as_str();
    let body_start = 2;
    let body_end = text.len().saturating_sub(1);
    let body = text.get(body_start..body_end).unwrap_or("");

    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut errors = ErrorList::empty();

    let flush_literal = |literal: &mut String, segments: &mut Vec<Segment>| -> Result<(), ErrorList> {
        if !literal.is_empty() {
            let decoded = decode_escapes(literal, &location)?;
            segments.push(Segment::Text(decoded));
            literal.clear();
        }
        Ok(())
    };

    let bytes = body.as_bytes();
    let mut i = 0;
    while i < body.len() {
        let rest = &body[i..];
        if rest.starts_with("{{") {
            literal.push('{');
            i += 2;
        } else if rest.starts_with("}}") {
            literal.push('}');
            i += 2;
        } else if bytes[i] == b'{' {
            if let Err(e) = flush_literal(&mut literal, &mut segments) {
                errors.extend(e);
            }
            let Some(close) = matching_brace(rest) else {
                errors.push(SingleError::at(
                    ErrorKind::Syntax("interpolated step is missing its closing '}'".to_string()),
                    &location,
                ));
                break;
            };
            let expression_offset = body_start + i + 1;
            let start = token.start.advance(&text[..expression_offset]);
            segments.push(Segment::Expression {
                text: rest[1..close].to_string(),
                start,
            });
            i += close + 1;
        } else if bytes[i] == b'\\' && i + 1 < body.len() {
            // Keep escapes together so `\{` is not read as an opening brace
            let width = rest.chars().nth(1).map_or(1, |c| c.len_utf8());
            literal.push_str(&rest[..1 + width]);
            i += 1 + width;
        } else {
            let ch = rest.chars().next().unwrap_or_default();
            literal.push(ch);
            i += ch.len_utf8();
        }
    }
    if let Err(e) = flush_literal(&mut literal, &mut segments) {
        errors.extend(e);
    }
    errors.into_result(segments)
}

/// Byte offset of the `}` closing the `{` at the start of `text`
fn matching_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, ch) in text.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Double-quote `text`, escaping what `decode_escapes` understands
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Escape literal text for use inside `$"..."`
pub fn quote_interpolated_text(text: &str) -> String {
    let quoted = quote(text);
    strip(&quoted, 1, 1).replace('{', "{{").replace('}', "}}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lex;

    fn token(text: &str) -> Token {
        lex(text).into_iter().find(|t| !t.is_hidden()).unwrap()
    }

    #[test]
    fn test_double_quoted_escapes() {
        let value = decode_constant(&token(r#""a\tb\n\"c\"""#)).unwrap();
        assert_eq!(value, ConstantValue::String("a\tb\n\"c\"".to_string()));
    }

    #[test]
    fn test_unknown_escape_is_an_error() {
        let errors = decode_constant(&token(r#""a\qb""#)).unwrap_err();
        assert_eq!(errors.kinds(), vec![&ErrorKind::InvalidEscape("\\q".to_string())]);
    }

    #[test]
    fn test_single_quoted_doubling() {
        let value = decode_constant(&token("'it''s'")).unwrap();
        assert_eq!(value, ConstantValue::String("it's".to_string()));
    }

    #[test]
    fn test_multiline_strips_leading_newline() {
        let value = decode_constant(&token("\"\"\"\nline 1\nline 2\"\"\"")).unwrap();
        assert_eq!(value, ConstantValue::String("line 1\nline 2".to_string()));
    }

    #[test]
    fn test_numbers_and_dates() {
        assert_eq!(decode_constant(&token("42")).unwrap(), ConstantValue::Integer(42));
        assert_eq!(decode_constant(&token("1.5")).unwrap(), ConstantValue::Double(1.5));
        let date = decode_constant(&token("2020-01-02")).unwrap();
        assert_eq!(date.serialize(), "2020-01-02T00:00:00");
        let date = decode_constant(&token("2020-01-02T10:30:15")).unwrap();
        assert_eq!(date.serialize(), "2020-01-02T10:30:15");
    }

    #[test]
    fn test_interpolation_segments() {
        let segments = split_interpolated(&token(r#"$"a {{b}} {1 + 2}!""#)).unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], Segment::Text("a {b} ".to_string()));
        match &segments[1] {
            Segment::Expression { text, start } => {
                assert_eq!(text, "1 + 2");
                assert_eq!(start.column, 11);
            }
            other => panic!("expected an expression, got {:?}", other),
        }
        assert_eq!(segments[2], Segment::Text("!".to_string()));
    }

    #[test]
    fn test_quote_round_trips_through_escapes() {
        let original = "say \"hi\"\n\\";
        let quoted = quote(original);
        let decoded = decode_constant(&token(&quoted)).unwrap();
        assert_eq!(decoded, ConstantValue::String(original.to_string()));
    }
}
