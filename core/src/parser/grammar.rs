//! Recursive-descent grammar over the significant tokens
//!
//! ```text
//! document  := sequence | step? EOF
//! sequence  := (NewCommand step)+       nested: (SequenceDash step)+
//! step      := Variable '=' step | pipe
//! pipe      := infix ('|' function)*
//! infix     := term (Operator term)*
//! term      := literal | Variable accessor* | array accessor* | '(' ... ')' accessor* | function
//! function  := Name argterm* (Name ':' argterm)*  |  Name'(' args ')'
//! ```
//!
//! A rule that fails returns the partial node it built so far. Each enclosing
//! rule wraps the partial child into its own partial node, so the tree handed
//! back after an error still covers everything that parsed. The innermost
//! partial node is kept as the error's context for the error matchers.

use tracing::trace;

use super::cst::{EntityProperty, FunctionCall, NamedArgument, Node, NodeKind, SequenceItem};
use super::token::{Token, TokenKind};
use crate::position::{SourcePos, TextLocation};

/// A syntax error as the grammar saw it
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxErrorRecord {
    pub message: String,
    /// The token the grammar could not accept
    pub offending: Token,
    /// The innermost rule that was being built when the error occurred
    pub context: Node,
}

/// Whether a bare `Name` is a step with arguments or a zero-argument step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Statement,
    Argument,
}

struct Failure {
    message: String,
    offending: Token,
    partial: Option<Node>,
    context: Option<Node>,
}

type Parsed = Result<Node, Box<Failure>>;

pub(crate) struct Grammar<'t> {
    source: &'t str,
    origin: SourcePos,
    tokens: Vec<&'t Token>,
    cursor: usize,
    errors: Vec<SyntaxErrorRecord>,
}

impl<'t> Grammar<'t> {
    /// `tokens` must end with an `EndOfInput` token, as `lex_at` guarantees
    pub(crate) fn new(source: &'t str, origin: SourcePos, tokens: &'t [Token]) -> Self {
        let tokens: Vec<&Token> = tokens.iter().filter(|t| !t.is_hidden()).collect();
        debug_assert!(
            tokens.last().is_some_and(|t| t.kind == TokenKind::EndOfInput),
            "token stream must be closed by EndOfInput"
        );
        Self {
            source,
            origin,
            tokens,
            cursor: 0,
            errors: Vec::new(),
        }
    }

    /* ===================== Token cursor ===================== */

    fn peek(&self) -> &'t Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &'t Token {
        let last = self.tokens.len().saturating_sub(1);
        self.tokens[(self.cursor + offset).min(last)]
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::EndOfInput {
            self.cursor += 1;
        }
        token
    }

    fn previous(&self) -> Option<&'t Token> {
        self.cursor.checked_sub(1).map(|i| self.tokens[i])
    }

    /* ===================== Node construction ===================== */

    fn slice(&self, from: SourcePos, to: SourcePos) -> &'t str {
        let begin = from.index.saturating_sub(self.origin.index);
        let end = to.index.saturating_sub(self.origin.index);
        self.source.get(begin..end).unwrap_or("")
    }

    /// Span from `start` to the last consumed token
    fn span_from(&self, start: &Token) -> TextLocation {
        let stop = self
            .previous()
            .filter(|p| p.stop >= start.start)
            .map_or(start.stop, |p| p.stop);
        TextLocation::new(self.slice(start.start, stop), start.start, stop)
    }

    fn node(&self, kind: NodeKind, start: &Token) -> Node {
        Node {
            kind,
            location: self.span_from(start),
            start: start.clone(),
            stop: self.previous().cloned(),
        }
    }

    fn partial(&self, kind: NodeKind, start: &Token) -> Node {
        Node {
            kind,
            location: self.span_from(start),
            start: start.clone(),
            stop: None,
        }
    }

    /// Fail without a node of our own; the caller provides the context
    fn fail(&self, message: impl Into<String>) -> Box<Failure> {
        Box::new(Failure {
            message: message.into(),
            offending: self.peek().clone(),
            partial: None,
            context: None,
        })
    }

    /// Fail inside `partial`, which becomes the error context
    fn fail_in(&self, partial: Node, message: impl Into<String>) -> Box<Failure> {
        Box::new(Failure {
            message: message.into(),
            offending: self.peek().clone(),
            context: Some(partial.clone()),
            partial: Some(partial),
        })
    }

    /// Wrap a child failure into this rule's partial node
    fn wrap(
        &self,
        mut failure: Box<Failure>,
        start: &Token,
        build: impl FnOnce(Option<Node>) -> NodeKind,
    ) -> Box<Failure> {
        let partial = self.partial(build(failure.partial.take()), start);
        if failure.context.is_none() {
            failure.context = Some(partial.clone());
        }
        failure.partial = Some(partial);
        failure
    }

    fn unexpected(&self, expected: &str) -> String {
        format!("unexpected {}, expected {}", self.peek(), expected)
    }

    /* ===================== Recovery ===================== */

    fn record(&mut self, failure: Failure) {
        let context = failure
            .context
            .or(failure.partial)
            .unwrap_or_else(|| Node {
                kind: NodeKind::Error(vec![failure.offending.clone()]),
                location: failure.offending.location(),
                start: failure.offending.clone(),
                stop: None,
            });
        trace!(message = %failure.message, offending = %failure.offending, "syntax error");
        self.errors.push(SyntaxErrorRecord {
            message: failure.message,
            offending: failure.offending,
            context,
        });
    }

    /// Skip tokens up to the next command boundary
    fn skip_to_boundary(&mut self, stop_at_command: bool) -> Option<Node> {
        let start = self.peek().clone();
        let mut skipped = Vec::new();
        while !self.at(TokenKind::EndOfInput) && !(stop_at_command && self.at(TokenKind::NewCommand))
        {
            skipped.push(self.advance());
        }
        if skipped.is_empty() {
            None
        } else {
            Some(self.node(NodeKind::Error(skipped), &start))
        }
    }

    /* ===================== Document ===================== */

    pub(crate) fn document(mut self) -> (Node, Vec<SyntaxErrorRecord>) {
        let start = self.peek().clone();
        let mut items = Vec::new();

        if self.at(TokenKind::NewCommand) {
            items.push(self.top_sequence());
        } else if !self.at(TokenKind::EndOfInput) {
            match self.step() {
                Ok(step) => {
                    if !self.at(TokenKind::EndOfInput) {
                        let message = self.unexpected("end of input");
                        let failure = self.fail_in(step.clone(), message);
                        self.record(*failure);
                        items.push(step);
                        items.extend(self.skip_to_boundary(false));
                    } else {
                        items.push(step);
                    }
                }
                Err(failure) => {
                    let partial = failure.partial.clone();
                    self.record(*failure);
                    items.extend(partial);
                    items.extend(self.skip_to_boundary(false));
                }
            }
        }

        let end = self.peek().clone();
        let text = self.slice(self.origin, end.stop);
        let root = Node {
            kind: NodeKind::Document(items),
            location: TextLocation::new(text, self.origin, end.stop),
            start,
            stop: Some(end),
        };
        (root, self.errors)
    }

    fn top_sequence(&mut self) -> Node {
        let start = self.peek().clone();
        let mut items = Vec::new();
        while self.at(TokenKind::NewCommand) {
            let dash = self.advance();
            let item = match self.step() {
                Ok(step) => {
                    let at_boundary =
                        self.at(TokenKind::NewCommand) || self.at(TokenKind::EndOfInput);
                    if at_boundary {
                        SequenceItem {
                            dash,
                            step: Some(step),
                            recovered: None,
                        }
                    } else {
                        let message = self.unexpected("a new command");
                        let failure = self.fail_in(step.clone(), message);
                        self.record(*failure);
                        SequenceItem {
                            dash,
                            step: Some(step),
                            recovered: self.skip_to_boundary(true),
                        }
                    }
                }
                Err(failure) => {
                    let partial = failure.partial.clone();
                    self.record(*failure);
                    SequenceItem {
                        dash,
                        step: partial,
                        recovered: self.skip_to_boundary(true),
                    }
                }
            };
            items.push(item);
        }
        self.node(NodeKind::Sequence(items), &start)
    }

    /* ===================== Steps ===================== */

    fn step(&mut self) -> Parsed {
        if self.at(TokenKind::SequenceDash) {
            return self.dash_sequence();
        }
        if self.at(TokenKind::Variable) && self.peek_at(1).kind == TokenKind::Equals {
            let start = self.advance();
            self.advance();
            let variable = start.clone();
            return match self.step() {
                Ok(value) => Ok(self.node(
                    NodeKind::SetVariable {
                        variable,
                        value: Some(Box::new(value)),
                    },
                    &start,
                )),
                Err(f) => Err(self.wrap(f, &start, move |value| NodeKind::SetVariable {
                    variable,
                    value: value.map(Box::new),
                })),
            };
        }
        self.pipe()
    }

    fn pipe(&mut self) -> Parsed {
        let first = self.infix()?;
        if !self.at(TokenKind::Pipe) {
            return Ok(first);
        }

        let start = first.start.clone();
        let mut stages = vec![first];
        while self.at(TokenKind::Pipe) {
            self.advance();
            if !self.at(TokenKind::Name) {
                let message = self.unexpected("a step name after '|'");
                let partial = self.partial(NodeKind::Pipe(stages), &start);
                return Err(self.fail_in(partial, message));
            }
            match self.function(Position::Statement) {
                Ok(stage) => stages.push(stage),
                Err(f) => {
                    return Err(self.wrap(f, &start, move |child| {
                        stages.extend(child);
                        NodeKind::Pipe(stages)
                    }))
                }
            }
        }
        Ok(self.node(NodeKind::Pipe(stages), &start))
    }

    fn infix(&mut self) -> Parsed {
        let first = self.term(Position::Statement)?;
        if !self.at(TokenKind::Operator) {
            return Ok(first);
        }

        let start = first.start.clone();
        let mut operands = vec![first];
        let mut operators = Vec::new();
        while self.at(TokenKind::Operator) {
            operators.push(self.advance());
            match self.term(Position::Statement) {
                Ok(operand) => operands.push(operand),
                Err(f) => {
                    return Err(self.wrap(f, &start, move |child| {
                        operands.extend(child);
                        NodeKind::Infix {
                            operands,
                            operators,
                        }
                    }))
                }
            }
        }
        Ok(self.node(
            NodeKind::Infix {
                operands,
                operators,
            },
            &start,
        ))
    }

    fn term(&mut self, position: Position) -> Parsed {
        let token = self.peek();
        match token.kind {
            kind if kind.is_literal() => {
                let token = self.advance();
                Ok(self.node(NodeKind::Literal(token.clone()), &token))
            }
            TokenKind::Variable => {
                let token = self.advance();
                let node = self.node(NodeKind::Variable(token.clone()), &token);
                self.accessors(node)
            }
            TokenKind::OpenBracket => {
                let node = self.array()?;
                self.accessors(node)
            }
            TokenKind::OpenParen => {
                let node = self.paren()?;
                self.accessors(node)
            }
            TokenKind::Name => self.function(position),
            TokenKind::UnclosedVariable => Err(self.fail(format!(
                "variable {} is missing its closing '>'",
                token
            ))),
            TokenKind::UnterminatedString => Err(self.fail(format!("unterminated string {}", token))),
            _ => Err(self.fail(self.unexpected("a value or a step"))),
        }
    }

    fn accessors(&mut self, target: Node) -> Parsed {
        let mut node = target;
        while self.at(TokenKind::OpenBracket)
            && self.previous().is_some_and(|p| p.is_adjacent_to(self.peek()))
        {
            let start = node.start.clone();
            self.advance();
            let target = Box::new(node);
            match self.step() {
                Ok(index) => {
                    let index = Some(Box::new(index));
                    if !self.at(TokenKind::CloseBracket) {
                        let message = self.unexpected("']'");
                        let partial = self.partial(NodeKind::Accessor { target, index }, &start);
                        return Err(self.fail_in(partial, message));
                    }
                    self.advance();
                    node = self.node(NodeKind::Accessor { target, index }, &start);
                }
                Err(f) => {
                    return Err(self.wrap(f, &start, move |index| NodeKind::Accessor {
                        target,
                        index: index.map(Box::new),
                    }))
                }
            }
        }
        Ok(node)
    }

    fn array(&mut self) -> Parsed {
        let start = self.advance();
        let mut elements: Vec<Node> = Vec::new();
        loop {
            if self.at(TokenKind::CloseBracket) {
                self.advance();
                break;
            }
            if !elements.is_empty() {
                if self.at(TokenKind::Comma) {
                    self.advance();
                } else {
                    let message = self.unexpected("',' or ']'");
                    let partial = self.partial(NodeKind::Array(elements), &start);
                    return Err(self.fail_in(partial, message));
                }
            }
            match self.step() {
                Ok(element) => elements.push(element),
                Err(f) => {
                    return Err(self.wrap(f, &start, move |child| {
                        elements.extend(child);
                        NodeKind::Array(elements)
                    }))
                }
            }
        }
        Ok(self.node(NodeKind::Array(elements), &start))
    }

    /* ===================== Parentheses ===================== */

    fn paren(&mut self) -> Parsed {
        let start = self.advance();
        match (self.peek().kind, self.peek_at(1).kind) {
            (TokenKind::CloseParen, _) => {
                self.advance();
                Ok(self.node(NodeKind::Entity(Vec::new()), &start))
            }
            (
                TokenKind::Name | TokenKind::DoubleQuotedString | TokenKind::SingleQuotedString,
                TokenKind::Colon,
            ) => self.entity(start),
            (TokenKind::Arrow, _) | (TokenKind::Variable, TokenKind::Arrow) => self.lambda(start),
            _ => self.bracketed(start),
        }
    }

    fn entity(&mut self, start: Token) -> Parsed {
        let mut properties: Vec<EntityProperty> = Vec::new();
        loop {
            if self.at(TokenKind::CloseParen) {
                self.advance();
                break;
            }
            if !properties.is_empty() && self.at(TokenKind::Comma) {
                self.advance();
            }
            let is_key = matches!(
                self.peek().kind,
                TokenKind::Name | TokenKind::DoubleQuotedString | TokenKind::SingleQuotedString
            ) && self.peek_at(1).kind == TokenKind::Colon;
            if !is_key {
                let message = self.unexpected("a property name or ')'");
                let partial = self.partial(NodeKind::Entity(properties), &start);
                return Err(self.fail_in(partial, message));
            }
            let key = self.advance();
            self.advance();
            match self.step() {
                Ok(value) => properties.push(EntityProperty {
                    key,
                    value: Some(value),
                }),
                Err(f) => {
                    return Err(self.wrap(f, &start, move |value| {
                        properties.push(EntityProperty { key, value });
                        NodeKind::Entity(properties)
                    }))
                }
            }
        }
        Ok(self.node(NodeKind::Entity(properties), &start))
    }

    fn lambda(&mut self, start: Token) -> Parsed {
        let variable = if self.at(TokenKind::Variable) {
            Some(self.advance())
        } else {
            None
        };
        self.advance();
        match self.step() {
            Ok(body) => {
                let body = Some(Box::new(body));
                if !self.at(TokenKind::CloseParen) {
                    let message = self.unexpected("')'");
                    let partial = self.partial(NodeKind::Lambda { variable, body }, &start);
                    return Err(self.fail_in(partial, message));
                }
                self.advance();
                Ok(self.node(NodeKind::Lambda { variable, body }, &start))
            }
            Err(f) => Err(self.wrap(f, &start, move |body| NodeKind::Lambda {
                variable,
                body: body.map(Box::new),
            })),
        }
    }

    /// `- step` items inside parentheses or a lambda body
    fn dash_sequence(&mut self) -> Parsed {
        let start = self.peek().clone();
        let mut items: Vec<SequenceItem> = Vec::new();
        while self.at(TokenKind::SequenceDash) {
            let dash = self.advance();
            match self.step() {
                Ok(step) => items.push(SequenceItem {
                    dash,
                    step: Some(step),
                    recovered: None,
                }),
                Err(f) => {
                    return Err(self.wrap(f, &start, move |step| {
                        items.push(SequenceItem {
                            dash,
                            step,
                            recovered: None,
                        });
                        NodeKind::Sequence(items)
                    }))
                }
            }
        }
        Ok(self.node(NodeKind::Sequence(items), &start))
    }

    fn bracketed(&mut self, start: Token) -> Parsed {
        match self.step() {
            Ok(inner) => {
                let inner = Some(Box::new(inner));
                if !self.at(TokenKind::CloseParen) {
                    let message = self.unexpected("')'");
                    let partial = self.partial(NodeKind::Bracketed(inner), &start);
                    return Err(self.fail_in(partial, message));
                }
                self.advance();
                Ok(self.node(NodeKind::Bracketed(inner), &start))
            }
            Err(f) => Err(self.wrap(f, &start, |inner| {
                NodeKind::Bracketed(inner.map(Box::new))
            })),
        }
    }

    /* ===================== Functions ===================== */

    fn function(&mut self, position: Position) -> Parsed {
        let name = self.advance();
        if self.at(TokenKind::OpenParen) && name.is_adjacent_to(self.peek()) {
            return self.call_form(name);
        }

        let start = name.clone();
        let mut ordered: Vec<Node> = Vec::new();
        let mut named: Vec<NamedArgument> = Vec::new();

        if position == Position::Statement {
            loop {
                let next = self.peek();
                if next.kind == TokenKind::Name && self.peek_at(1).kind == TokenKind::Colon {
                    let argument = self.advance();
                    self.advance();
                    match self.term(Position::Argument) {
                        Ok(value) => named.push(NamedArgument {
                            name: argument,
                            value: Some(value),
                        }),
                        Err(f) => {
                            return Err(self.wrap(f, &start, move |value| {
                                named.push(NamedArgument {
                                    name: argument,
                                    value,
                                });
                                NodeKind::Function(FunctionCall {
                                    name,
                                    ordered,
                                    named,
                                    open: None,
                                })
                            }))
                        }
                    }
                } else if next.kind.starts_term() && !named.is_empty() {
                    let message = self.unexpected("a named argument");
                    let partial = self.partial(
                        NodeKind::Function(FunctionCall {
                            name,
                            ordered,
                            named,
                            open: None,
                        }),
                        &start,
                    );
                    return Err(self.fail_in(partial, message));
                } else if next.kind.starts_term() {
                    match self.term(Position::Argument) {
                        Ok(value) => ordered.push(value),
                        Err(f) => {
                            return Err(self.wrap(f, &start, move |value| {
                                ordered.extend(value);
                                NodeKind::Function(FunctionCall {
                                    name,
                                    ordered,
                                    named,
                                    open: None,
                                })
                            }))
                        }
                    }
                } else {
                    break;
                }
            }
        }

        Ok(self.node(
            NodeKind::Function(FunctionCall {
                name,
                ordered,
                named,
                open: None,
            }),
            &start,
        ))
    }

    fn call_form(&mut self, name: Token) -> Parsed {
        let start = name.clone();
        let open = Some(self.advance());
        let mut ordered: Vec<Node> = Vec::new();
        let mut named: Vec<NamedArgument> = Vec::new();

        loop {
            if self.at(TokenKind::CloseParen) {
                self.advance();
                break;
            }
            if !ordered.is_empty() || !named.is_empty() {
                if self.at(TokenKind::Comma) {
                    self.advance();
                } else {
                    let message = self.unexpected("',' or ')'");
                    let call = FunctionCall {
                        name,
                        ordered,
                        named,
                        open,
                    };
                    let partial = self.partial(NodeKind::Function(call), &start);
                    return Err(self.fail_in(partial, message));
                }
            }

            if self.at(TokenKind::Name) && self.peek_at(1).kind == TokenKind::Colon {
                let argument = self.advance();
                self.advance();
                match self.step() {
                    Ok(value) => named.push(NamedArgument {
                        name: argument,
                        value: Some(value),
                    }),
                    Err(f) => {
                        return Err(self.wrap(f, &start, move |value| {
                            named.push(NamedArgument {
                                name: argument,
                                value,
                            });
                            NodeKind::Function(FunctionCall {
                                name,
                                ordered,
                                named,
                                open,
                            })
                        }))
                    }
                }
            } else if !named.is_empty() {
                let message = self.unexpected("a named argument");
                let call = FunctionCall {
                    name,
                    ordered,
                    named,
                    open,
                };
                let partial = self.partial(NodeKind::Function(call), &start);
                return Err(self.fail_in(partial, message));
            } else {
                match self.step() {
                    Ok(value) => ordered.push(value),
                    Err(f) => {
                        return Err(self.wrap(f, &start, move |value| {
                            ordered.extend(value);
                            NodeKind::Function(FunctionCall {
                                name,
                                ordered,
                                named,
                                open,
                            })
                        }))
                    }
                }
            }
        }

        Ok(self.node(
            NodeKind::Function(FunctionCall {
                name,
                ordered,
                named,
                open,
            }),
            &start,
        ))
    }
}
