//! Tokens produced by the lexer

use std::fmt;

use crate::position::{SourcePos, TextLocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Newline,
    Whitespace,
    LineComment,
    BlockComment,
    MultilineString,
    InterpolatedString,
    DoubleQuotedString,
    SingleQuotedString,
    UnterminatedString,
    DateTime,
    Number,
    Variable,
    UnclosedVariable,
    Arrow,
    Operator,
    /// A line-initial `-` outside any brackets
    NewCommand,
    /// A line-initial `-` inside brackets
    SequenceDash,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    Comma,
    Colon,
    Equals,
    Pipe,
    EnumValue,
    True,
    False,
    Name,
    Error,
    /// Zero-width token closing every token stream
    EndOfInput,
}

/// Which channel a token travels on. Hidden tokens never reach the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Default,
    Hidden,
}

impl TokenKind {
    pub fn channel(self) -> Channel {
        match self {
            TokenKind::Newline
            | TokenKind::Whitespace
            | TokenKind::LineComment
            | TokenKind::BlockComment => Channel::Hidden,
            _ => Channel::Default,
        }
    }

    pub fn is_comment(self) -> bool {
        matches!(self, TokenKind::LineComment | TokenKind::BlockComment)
    }

    pub fn is_string(self) -> bool {
        matches!(
            self,
            TokenKind::MultilineString
                | TokenKind::InterpolatedString
                | TokenKind::DoubleQuotedString
                | TokenKind::SingleQuotedString
        )
    }

    /// Tokens that form a literal value on their own
    pub fn is_literal(self) -> bool {
        self.is_string()
            || matches!(
                self,
                TokenKind::Number
                    | TokenKind::DateTime
                    | TokenKind::True
                    | TokenKind::False
                    | TokenKind::EnumValue
            )
    }

    /// Tokens after which a `-` is a binary operator rather than a sign
    pub fn ends_value(self) -> bool {
        self.is_literal()
            || matches!(
                self,
                TokenKind::Name
                    | TokenKind::Variable
                    | TokenKind::CloseParen
                    | TokenKind::CloseBracket
            )
    }

    /// Tokens that can begin a term
    pub fn starts_term(self) -> bool {
        self.is_literal()
            || matches!(
                self,
                TokenKind::Name
                    | TokenKind::Variable
                    | TokenKind::UnclosedVariable
                    | TokenKind::UnterminatedString
                    | TokenKind::OpenParen
                    | TokenKind::OpenBracket
            )
    }

    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Newline => "newline",
            TokenKind::Whitespace => "whitespace",
            TokenKind::LineComment | TokenKind::BlockComment => "comment",
            TokenKind::MultilineString
            | TokenKind::InterpolatedString
            | TokenKind::DoubleQuotedString
            | TokenKind::SingleQuotedString => "string",
            TokenKind::UnterminatedString => "unterminated string",
            TokenKind::DateTime => "date",
            TokenKind::Number => "number",
            TokenKind::Variable => "variable",
            TokenKind::UnclosedVariable => "unclosed variable",
            TokenKind::Arrow => "'=>'",
            TokenKind::Operator => "operator",
            TokenKind::NewCommand | TokenKind::SequenceDash => "'-'",
            TokenKind::OpenParen => "'('",
            TokenKind::CloseParen => "')'",
            TokenKind::OpenBracket => "'['",
            TokenKind::CloseBracket => "']'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::Equals => "'='",
            TokenKind::Pipe => "'|'",
            TokenKind::EnumValue => "enum value",
            TokenKind::True | TokenKind::False => "boolean",
            TokenKind::Name => "name",
            TokenKind::Error => "unexpected character",
            TokenKind::EndOfInput => "end of input",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: SourcePos,
    pub stop: SourcePos,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, start: SourcePos) -> Self {
        let text = text.into();
        let stop = start.advance(&text);
        Self {
            kind,
            text,
            start,
            stop,
        }
    }

    pub fn channel(&self) -> Channel {
        self.kind.channel()
    }

    pub fn is_hidden(&self) -> bool {
        self.channel() == Channel::Hidden
    }

    pub fn location(&self) -> TextLocation {
        TextLocation::new(self.text.clone(), self.start, self.stop)
    }

    /// Whether `next` starts exactly where this token stops
    pub fn is_adjacent_to(&self, next: &Token) -> bool {
        self.stop.index == next.start.index
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::EndOfInput => write!(f, "end of input"),
            _ => write!(f, "'{}'", self.text),
        }
    }
}
