//! Concrete syntax tree
//!
//! Nodes keep their start token and, once the rule that built them finished,
//! their stop token. A node whose `stop` is `None` is a partial node left
//! behind by a syntax error; the tree around it is still usable for editor
//! queries.

use super::token::{Token, TokenKind};
use crate::position::TextLocation;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub location: TextLocation,
    pub start: Token,
    /// `None` when the rule failed before finishing
    pub stop: Option<Token>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Root of a parse; items are steps, sequence items and error nodes
    Document(Vec<Node>),
    /// `- step` lines, top level or nested in parentheses
    Sequence(Vec<SequenceItem>),
    SetVariable {
        variable: Token,
        value: Option<Box<Node>>,
    },
    Pipe(Vec<Node>),
    Infix {
        operands: Vec<Node>,
        operators: Vec<Token>,
    },
    Function(FunctionCall),
    /// `( step )`
    Bracketed(Option<Box<Node>>),
    Array(Vec<Node>),
    Entity(Vec<EntityProperty>),
    Lambda {
        variable: Option<Token>,
        body: Option<Box<Node>>,
    },
    Variable(Token),
    Accessor {
        target: Box<Node>,
        index: Option<Box<Node>>,
    },
    Literal(Token),
    /// Tokens skipped while recovering from a syntax error
    Error(Vec<Token>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceItem {
    pub dash: Token,
    pub step: Option<Node>,
    /// Tokens skipped after the step failed
    pub recovered: Option<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: Token,
    pub ordered: Vec<Node>,
    pub named: Vec<NamedArgument>,
    /// The `(` of the `Name(args)` form
    pub open: Option<Token>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedArgument {
    pub name: Token,
    pub value: Option<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityProperty {
    pub key: Token,
    pub value: Option<Node>,
}

impl Node {
    pub fn is_partial(&self) -> bool {
        self.stop.is_none()
    }

    pub fn is_call_form(&self) -> bool {
        matches!(&self.kind, NodeKind::Function(call) if call.open.is_some())
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, NodeKind::Error(_))
    }

    pub fn starts_with(&self, kind: TokenKind) -> bool {
        self.start.kind == kind
    }

    /// Child nodes in source order
    pub fn children(&self) -> Vec<&Node> {
        match &self.kind {
            NodeKind::Document(items) | NodeKind::Pipe(items) | NodeKind::Array(items) => {
                items.iter().collect()
            }
            NodeKind::Sequence(items) => items
                .iter()
                .flat_map(|item| item.step.iter().chain(item.recovered.iter()))
                .collect(),
            NodeKind::SetVariable { value, .. } => value.iter().map(|v| v.as_ref()).collect(),
            NodeKind::Infix { operands, .. } => operands.iter().collect(),
            NodeKind::Function(call) => {
                let mut children: Vec<&Node> = call.ordered.iter().collect();
                children.extend(call.named.iter().filter_map(|n| n.value.as_ref()));
                children
            }
            NodeKind::Bracketed(inner) => inner.iter().map(|v| v.as_ref()).collect(),
            NodeKind::Entity(properties) => {
                properties.iter().filter_map(|p| p.value.as_ref()).collect()
            }
            NodeKind::Lambda { body, .. } => body.iter().map(|v| v.as_ref()).collect(),
            NodeKind::Accessor { target, index } => {
                let mut children = vec![target.as_ref()];
                children.extend(index.iter().map(|v| v.as_ref()));
                children
            }
            NodeKind::Variable(_) | NodeKind::Literal(_) | NodeKind::Error(_) => Vec::new(),
        }
    }
}
