//! Editor queries
//!
//! Every query is a pure function of the document text, an optional cursor
//! position and the step store. Cursor queries only parse the command under
//! the cursor; the commands before it are frozen lazily to type variables.
//!
//! The shared traversal ([`descend`]) walks from the root towards the cursor:
//! into the child whose span contains it, otherwise into the last child that
//! starts at or before it (or the last child), so queries made at the end of
//! unfinished input still land in the node being typed.

pub mod completion;
pub mod diagnostics;
pub mod format;
pub mod hover;
pub mod signature;

#[cfg(test)]
mod tests;

use serde::Serialize;

use crate::freeze::{freeze_property, LazyTypeResolver};
use crate::ir::visit_lenient;
use crate::parser::cst::{FunctionCall, Node, NodeKind};
use crate::parser::{parse_command, split_commands, Command, ParseOutput, Token, TokenKind};
use crate::position::{LinePosition, TextRange};
use crate::steps::{ParameterDescriptor, StepFactory, StepFactoryStore};
use crate::types::TypeReference;

pub use completion::get_completions;
pub use diagnostics::get_diagnostics;
pub use format::{format_document, FormattingOptions, LineEnding};
pub use hover::get_hover;
pub use signature::get_signature_help;

// ============================================================================
// Response types
// ============================================================================

/// Replace `range` with `new_text`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    pub new_text: String,
    pub range: TextRange,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    pub is_incomplete: bool,
    pub items: Vec<CompletionItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionItem {
    pub label: String,
    pub detail: String,
    pub documentation: String,
    pub preselect: bool,
    pub edit: TextEdit,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickInfoResponse {
    pub markdown_lines: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureHelpResponse {
    pub active_signature: usize,
    pub active_parameter: usize,
    pub signatures: Vec<SignatureHelpItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureHelpItem {
    pub label: String,
    pub documentation: String,
    pub parameters: Vec<SignatureParameter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureParameter {
    pub label: String,
    pub documentation: String,
}

/// Diagnostics are always errors
pub const SEVERITY_ERROR: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub start: LinePosition,
    pub end: LinePosition,
    pub message: String,
    pub severity_code: u8,
}

// ============================================================================
// Command under the cursor
// ============================================================================

/// Index of the command a cursor query should look at: the last command
/// starting at or before `position`, or the first command
pub fn command_at(commands: &[Command], position: LinePosition) -> Option<usize> {
    if commands.is_empty() {
        return None;
    }
    Some(
        commands
            .iter()
            .rposition(|c| c.start_position <= position)
            .unwrap_or(0),
    )
}

/// Everything a cursor query needs about the command under the cursor
pub(crate) struct CursorQuery<'a> {
    pub position: LinePosition,
    pub command: &'a Command,
    pub output: ParseOutput,
    pub resolver: LazyTypeResolver<'a>,
    pub store: &'a StepFactoryStore,
}

impl<'a> CursorQuery<'a> {
    pub fn new(
        commands: &'a [Command],
        position: LinePosition,
        store: &'a StepFactoryStore,
    ) -> Option<Self> {
        let index = command_at(commands, position)?;
        let command = &commands[index];
        Some(Self {
            position,
            command,
            output: parse_command(command),
            resolver: LazyTypeResolver::new(&commands[..=index], store),
            store,
        })
    }

    /// Nodes from the root to the node under the cursor
    pub fn path(&self) -> Vec<&Node> {
        descend(&self.output.root, self.position)
    }

    /// The significant token under the cursor, if any. A cursor just past a
    /// token still counts as on it.
    pub fn token(&self) -> Option<&Token> {
        self.output
            .tokens
            .iter()
            .filter(|t| !t.is_hidden() && t.kind != TokenKind::EndOfInput)
            .filter(|t| t.location().contains(self.position))
            .last()
    }

    /// Type of the value a node produces, frozen against the variables
    /// known at this command
    pub fn type_of(&self, node: &Node) -> Option<TypeReference> {
        let property = visit_lenient(node)?;
        let mut resolver = self.resolver.get().clone();
        freeze_property(&property, self.store, &mut resolver)
            .ok()
            .map(|step| step.output_type)
    }
}

/// Split the document and prepare a cursor query
pub(crate) fn with_cursor<T: Default>(
    text: &str,
    position: LinePosition,
    store: &StepFactoryStore,
    query: impl FnOnce(&CursorQuery<'_>) -> T,
) -> T {
    let commands = split_commands(text);
    match CursorQuery::new(&commands, position, store) {
        Some(cursor) => query(&cursor),
        None => T::default(),
    }
}

// ============================================================================
// Traversal
// ============================================================================

/// Path of nodes from `root` towards `position`
pub fn descend(root: &Node, position: LinePosition) -> Vec<&Node> {
    let mut path = vec![root];
    let mut current = root;
    loop {
        let children = current.children();
        let next = children
            .iter()
            .find(|c| c.location.contains(position))
            .or_else(|| {
                children
                    .iter()
                    .rev()
                    .find(|c| c.location.starts_at_or_before(position))
            })
            .or_else(|| children.last());
        match next {
            Some(child) => {
                path.push(child);
                current = child;
            }
            None => return path,
        }
    }
}

/// Cut a path at the first node closed by `)` or `]` before the cursor; the
/// cursor is no longer inside that node or anything below it.
pub fn open_path<'n>(path: &[&'n Node], position: LinePosition) -> Vec<&'n Node> {
    path.iter()
        .copied()
        .take_while(|node| {
            let delimited = match &node.kind {
                NodeKind::Function(call) => call.open.is_some(),
                NodeKind::Array(_)
                | NodeKind::Entity(_)
                | NodeKind::Lambda { .. }
                | NodeKind::Bracketed(_)
                | NodeKind::Accessor { .. } => true,
                _ => false,
            };
            let closed = node.stop.as_ref().is_some_and(|stop| {
                matches!(stop.kind, TokenKind::CloseParen | TokenKind::CloseBracket)
                    && stop.location().ends_before(position)
            });
            !(delimited && closed)
        })
        .collect()
}

/// The last significant token ending at or before the cursor
pub(crate) fn previous_token(tokens: &[Token], position: LinePosition) -> Option<&Token> {
    tokens
        .iter()
        .filter(|t| !t.is_hidden() && t.kind != TokenKind::EndOfInput)
        .filter(|t| t.stop.to_line_position() <= position)
        .last()
}

/// Function on the path whose name is `token`
pub(crate) fn call_named<'n>(
    path: &[&'n Node],
    token: &Token,
) -> Option<(usize, &'n Node, &'n FunctionCall)> {
    path.iter().enumerate().rev().find_map(|(i, node)| match &node.kind {
        NodeKind::Function(call) if call.name == *token => Some((i, *node, call)),
        _ => None,
    })
}

/// Function on the path with a named argument spelled by `token`
pub(crate) fn call_with_argument<'n>(
    path: &[&'n Node],
    token: &Token,
) -> Option<&'n FunctionCall> {
    path.iter().rev().find_map(|node| match &node.kind {
        NodeKind::Function(call) if call.named.iter().any(|n| n.name == *token) => Some(call),
        _ => None,
    })
}

/// Parameters of `factory` not yet supplied in `call`. The first
/// `positional` ordered arguments count as supplied; the named argument
/// spelled by `skip` does not.
pub(crate) fn unused_parameters<'f>(
    factory: &'f dyn StepFactory,
    call: &FunctionCall,
    positional: usize,
    skip: Option<&Token>,
) -> Vec<&'f ParameterDescriptor> {
    factory
        .parameters()
        .iter()
        .filter(|p| p.order.map_or(true, |order| order > positional))
        .filter(|p| {
            !call
                .named
                .iter()
                .filter(|n| skip != Some(&n.name))
                .any(|n| p.matches_name(&n.name.text))
        })
        .collect()
}

/// Innermost function call on a path
pub fn innermost_call<'n>(path: &[&'n Node]) -> Option<(&'n Node, &'n FunctionCall)> {
    path.iter().rev().find_map(|node| match &node.kind {
        NodeKind::Function(call) => Some((*node, call)),
        _ => None,
    })
}

// ============================================================================
// Documentation
// ============================================================================

/// Markdown documentation for a step, shared by every query
pub fn step_documentation(factory: &dyn StepFactory) -> String {
    let mut doc = format!("## {}", factory.type_name());
    let aliases: Vec<&str> = factory.names().into_iter().skip(1).collect();
    if !aliases.is_empty() {
        doc.push_str(&format!("\n\n*Aliases:* {}", aliases.join(", ")));
    }
    doc.push_str(&format!(
        "\n\n{}\n\n**Returns:** `{}`",
        factory.summary(),
        factory.declared_output_type()
    ));

    let parameters = factory.parameters();
    if !parameters.is_empty() {
        doc.push_str("\n\n|Parameter|Type|Required|Summary|\n|:--|:--|:--:|:--|");
        for parameter in parameters {
            let name = match parameter.order {
                Some(order) => format!("{} ({})", parameter.name, order),
                None => parameter.name.clone(),
            };
            doc.push_str(&format!(
                "\n|{}|`{}`|{}|{}|",
                name,
                parameter.display_type(),
                if parameter.required { "✔" } else { "" },
                parameter.summary
            ));
        }
    }
    doc
}
