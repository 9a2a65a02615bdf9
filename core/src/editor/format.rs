//! Formatter
//!
//! The document is compiled and the bound step graph printed back in a
//! canonical layout. A document that does not compile is left alone.
//!
//! Layout rules:
//!
//! - a top-level sequence prints one `- step` per line; nested sequences
//!   print inside `(` `)` one level deeper
//! - a step with one argument prints inline, `Name value` when the argument
//!   is the first positional one and `Name Param: value` otherwise
//! - a step with more arguments prints each `Param: value` on its own line
//! - steps that came from operators, arrays, entities, accessors and
//!   interpolated strings print back in that form
//! - steps nested in an argument are wrapped in parentheses when needed to
//!   read back the same way
//!
//! Comments are not part of the graph. They are replayed on their own line
//! after the step they were written in or after, at the innermost sequence
//! or argument list that encloses them. Each comment is printed once.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::TextEdit;
use crate::compiler::compile;
use crate::freeze::{BoundArgument, BoundArguments, BoundStep, BoundStepKind};
use crate::ir::literals::{quote, quote_interpolated_text};
use crate::ir::{ConstantValue, VariableName};
use crate::parser::{lex, Token};
use crate::position::{SourcePos, TextRange};
use crate::steps::{SerializationForm, StepFactory, StepFactoryStore};

// ============================================================================
// Options
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// Follow the document: `\r\n` if it already uses it
    #[default]
    Auto,
    Lf,
    CrLf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormattingOptions {
    pub indent_width: usize,
    pub line_ending: LineEnding,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            indent_width: 4,
            line_ending: LineEnding::Auto,
        }
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// One edit replacing the whole document, or none if it does not compile
pub fn format_document(
    text: &str,
    store: &StepFactoryStore,
    options: FormattingOptions,
) -> Vec<TextEdit> {
    let root = match compile(text, store) {
        Ok(root) => root,
        Err(errors) => {
            debug!(errors = errors.len(), "document not formatted");
            return Vec::new();
        }
    };

    let pending = RefCell::new(comments(text));
    let printer = Printer::new(options.indent_width, &pending);
    let mut lines = Vec::new();
    match top_level_steps(&root) {
        Some(steps) => {
            for (i, step) in steps.iter().enumerate() {
                if i == 0 {
                    lines.extend(printer.comments_before(step.location.start, 0));
                }
                lines.push(format!("- {}", printer.write(step, Slot::Statement, 0)));
                if let Some(next) = steps.get(i + 1) {
                    lines.extend(printer.comments_before(next.location.start, 0));
                }
            }
        }
        None => {
            lines.extend(printer.comments_before(root.location.start, 0));
            lines.push(printer.write(&root, Slot::Statement, 0));
        }
    }
    lines.extend(pending.borrow_mut().drain(..).map(|c| comment_text(&c)));

    let mut formatted = lines.join("\n");
    if !formatted.is_empty() && text.ends_with('\n') {
        formatted.push('\n');
    }
    let crlf = match options.line_ending {
        LineEnding::Auto => text.contains("\r\n"),
        LineEnding::Lf => false,
        LineEnding::CrLf => true,
    };
    if crlf {
        formatted = formatted.replace('\n', "\r\n");
    }

    vec![TextEdit {
        new_text: formatted,
        range: TextRange::whole_document(text),
    }]
}

/// Steps of a root sequence, printed as dash lines
fn top_level_steps(root: &BoundStep) -> Option<&[BoundStep]> {
    let factory = root.factory()?;
    if factory.serialization_form() != SerializationForm::Sequence || root.metadata.bracketed {
        return None;
    }
    step_list(root, "Steps")
}

/// Comment tokens in order, each one once
fn comments(text: &str) -> VecDeque<Token> {
    let mut seen = HashSet::new();
    lex(text)
        .into_iter()
        .filter(|t| t.kind.is_comment())
        .filter(|t| seen.insert((t.kind, t.channel(), t.start.line, t.start.column)))
        .collect()
}

fn comment_text(comment: &Token) -> String {
    comment.text.replace("\r\n", "\n").trim_end().to_string()
}

// ============================================================================
// Printer
// ============================================================================

/// Where a step is written, which decides whether it needs parentheses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// A whole statement: a sequence item, a variable value, a lambda body
    Statement,
    /// Array element, entity value or accessor index
    Element,
    /// Argument of a step written `Name value`
    Argument,
    /// Operand of an operator chain
    Operand,
    /// Value an accessor is applied to
    Target,
}

enum Shape {
    /// Needs parentheses only when it was written with them
    Bare,
    NeedsParens,
    /// Already brings its own brackets
    Delimited,
}

#[derive(Debug, Clone)]
struct Printer<'c> {
    indent: String,
    /// Inside an interpolated string, where the text cannot span lines
    inline: bool,
    /// Comments not yet printed, in source order
    comments: &'c RefCell<VecDeque<Token>>,
}

impl<'c> Printer<'c> {
    fn new(indent_width: usize, comments: &'c RefCell<VecDeque<Token>>) -> Self {
        Self {
            indent: " ".repeat(indent_width),
            inline: false,
            comments,
        }
    }

    fn pad(&self, depth: usize) -> String {
        self.indent.repeat(depth)
    }

    /// Take the pending comments that start before `bound`, one line each
    fn comments_before(&self, bound: SourcePos, depth: usize) -> Vec<String> {
        if self.inline {
            return Vec::new();
        }
        let mut pending = self.comments.borrow_mut();
        let mut lines = Vec::new();
        while let Some(comment) = pending.pop_front() {
            if comment.start >= bound {
                pending.push_front(comment);
                break;
            }
            lines.push(format!("{}{}", self.pad(depth), comment_text(&comment)));
        }
        lines
    }

    fn write(&self, step: &BoundStep, slot: Slot, depth: usize) -> String {
        let (text, shape) = match &step.kind {
            BoundStepKind::Constant(value) => self.constant(value, slot),
            BoundStepKind::Compound { factory, arguments } => {
                self.compound(step, factory.as_ref(), arguments, slot, depth)
            }
        };
        let wrap = match shape {
            Shape::NeedsParens => true,
            Shape::Delimited => false,
            Shape::Bare => step.metadata.bracketed && slot != Slot::Statement,
        };
        if wrap {
            format!("({})", text)
        } else {
            text
        }
    }

    fn constant(&self, value: &ConstantValue, slot: Slot) -> (String, Shape) {
        let text = match value {
            ConstantValue::String(s) if self.inline => format!("'{}'", s.replace('\'', "''")),
            other => other.serialize(),
        };
        // `Name -1` would read as a subtraction
        let shape = if slot == Slot::Target || (slot == Slot::Argument && text.starts_with('-')) {
            Shape::NeedsParens
        } else {
            Shape::Bare
        };
        (text, shape)
    }

    fn compound(
        &self,
        step: &BoundStep,
        factory: &dyn StepFactory,
        arguments: &BoundArguments,
        slot: Slot,
        depth: usize,
    ) -> (String, Shape) {
        let statement_like = matches!(slot, Slot::Statement | Slot::Element);
        let special = match factory.serialization_form() {
            SerializationForm::Sequence if !self.inline => step_list(step, "Steps")
                .filter(|steps| !steps.is_empty())
                .map(|steps| {
                    let text = self.nested_sequence(steps, step.location.stop, depth);
                    (text, Shape::Delimited)
                }),
            SerializationForm::SetVariable => {
                match (variable(step, "Variable"), argument_step(step, "Value")) {
                    (Some(name), Some(value)) => {
                        let text = format!("{} = {}", name, self.write(value, Slot::Statement, depth));
                        Some((text, if statement_like { Shape::Bare } else { Shape::NeedsParens }))
                    }
                    _ => None,
                }
            }
            SerializationForm::GetVariable => {
                variable(step, "Variable").map(|name| (name.to_string(), Shape::Bare))
            }
            SerializationForm::Array => step_list(step, "Elements")
                .map(|elements| (self.array(elements, depth), Shape::Bare)),
            SerializationForm::Entity => Some((self.entity(arguments, depth), Shape::Bare)),
            SerializationForm::ElementAtIndex => {
                match (argument_step(step, "Array"), argument_step(step, "Index")) {
                    (Some(array), Some(index))
                        if matches!(index.constant(), Some(ConstantValue::Integer(_))) =>
                    {
                        let text = format!(
                            "{}[{}]",
                            self.write(array, Slot::Target, depth),
                            self.write(index, Slot::Element, depth)
                        );
                        Some((text, Shape::Bare))
                    }
                    _ => None,
                }
            }
            SerializationForm::EntityGetValue => {
                match (argument_step(step, "Entity"), argument_step(step, "Property")) {
                    (Some(entity), Some(property))
                        if !matches!(property.constant(), Some(ConstantValue::Integer(_))) =>
                    {
                        let text = format!(
                            "{}[{}]",
                            self.write(entity, Slot::Target, depth),
                            self.write(property, Slot::Element, depth)
                        );
                        Some((text, Shape::Bare))
                    }
                    _ => None,
                }
            }
            SerializationForm::Interpolation => step_list(step, "Strings").map(|parts| {
                let shape = if slot == Slot::Target { Shape::NeedsParens } else { Shape::Bare };
                (self.interpolation(step, parts), shape)
            }),
            SerializationForm::Infix(symbol) if step.metadata.infix => argument_step(step, "Terms")
                .and_then(|terms| step_list(terms, "Elements"))
                .filter(|terms| terms.len() > 1)
                .map(|terms| {
                    let text = terms
                        .iter()
                        .map(|t| self.write(t, Slot::Operand, depth))
                        .collect::<Vec<_>>()
                        .join(&format!(" {} ", symbol));
                    (text, if statement_like { Shape::Bare } else { Shape::NeedsParens })
                }),
            _ => None,
        };
        special.unwrap_or_else(|| self.function(factory, arguments, slot, depth))
    }

    /// `Name`, `Name value`, `Name Param: value` or one argument per line
    fn function(
        &self,
        factory: &dyn StepFactory,
        arguments: &BoundArguments,
        slot: Slot,
        depth: usize,
    ) -> (String, Shape) {
        let name = factory.type_name();
        let ordered = ordered_arguments(factory, arguments);
        let text = match ordered.as_slice() {
            [] => {
                let shape = if slot == Slot::Target { Shape::NeedsParens } else { Shape::Bare };
                return (name.to_string(), shape);
            }
            [(_, Some(1), argument)] => format!("{} {}", name, self.argument(argument, depth)),
            [(parameter, _, argument)] => {
                format!("{} {}: {}", name, parameter, self.argument(argument, depth))
            }
            many if self.inline => {
                let parts: Vec<String> = many
                    .iter()
                    .map(|(parameter, _, argument)| {
                        format!("{}: {}", parameter, self.argument(argument, depth))
                    })
                    .collect();
                format!("{} {}", name, parts.join(" "))
            }
            many => {
                let mut text = name.to_string();
                for (parameter, _, argument) in many {
                    if let Some(location) = argument.location() {
                        for comment in self.comments_before(location.start, depth + 1) {
                            text.push('\n');
                            text.push_str(&comment);
                        }
                    }
                    text.push('\n');
                    text.push_str(&self.pad(depth + 1));
                    text.push_str(&format!(
                        "{}: {}",
                        parameter,
                        self.argument(argument, depth + 1)
                    ));
                }
                text
            }
        };
        let shape = if slot == Slot::Statement { Shape::Bare } else { Shape::NeedsParens };
        (text, shape)
    }

    fn argument(&self, argument: &BoundArgument, depth: usize) -> String {
        match argument {
            BoundArgument::Step(step) => self.write(step, Slot::Argument, depth),
            BoundArgument::StepList(steps) => self.array(steps, depth),
            BoundArgument::Lambda {
                implicit: true,
                body,
                ..
            } => self.write(body, Slot::Argument, depth),
            BoundArgument::Lambda {
                variable,
                body,
                location,
                ..
            } => self.lambda(variable, body, location.stop, depth),
            BoundArgument::Variable { name, .. } => name.to_string(),
        }
    }

    fn lambda(
        &self,
        variable: &VariableName,
        body: &BoundStep,
        end: SourcePos,
        depth: usize,
    ) -> String {
        let sequence = body
            .factory()
            .filter(|f| f.serialization_form() == SerializationForm::Sequence)
            .and_then(|_| step_list(body, "Steps"))
            .filter(|steps| !steps.is_empty() && !self.inline);
        match sequence {
            Some(steps) => format!(
                "({} =>\n{}\n{})",
                variable,
                self.sequence_items(steps, end, depth + 1),
                self.pad(depth)
            ),
            None => format!("({} => {})", variable, self.write(body, Slot::Statement, depth)),
        }
    }

    /// Dash lines with the comments written between them; `end` bounds the
    /// comments that may follow the last step
    fn sequence_items(&self, steps: &[BoundStep], end: SourcePos, depth: usize) -> String {
        let mut lines = Vec::new();
        for (i, step) in steps.iter().enumerate() {
            if i == 0 {
                lines.extend(self.comments_before(step.location.start, depth));
            }
            lines.push(format!(
                "{}- {}",
                self.pad(depth),
                self.write(step, Slot::Statement, depth)
            ));
            let bound = steps.get(i + 1).map_or(end, |next| next.location.start);
            lines.extend(self.comments_before(bound, depth));
        }
        lines.join("\n")
    }

    fn nested_sequence(&self, steps: &[BoundStep], end: SourcePos, depth: usize) -> String {
        format!("(\n{}\n{})", self.sequence_items(steps, end, depth + 1), self.pad(depth))
    }

    fn array(&self, elements: &[BoundStep], depth: usize) -> String {
        let elements: Vec<String> = elements
            .iter()
            .map(|e| self.write(e, Slot::Element, depth))
            .collect();
        format!("[{}]", elements.join(", "))
    }

    fn entity(&self, arguments: &BoundArguments, depth: usize) -> String {
        let properties: Vec<String> = arguments
            .iter()
            .filter_map(|(key, argument)| {
                let value = argument.as_step()?;
                Some(format!(
                    "{}: {}",
                    entity_key(key),
                    self.write(value, Slot::Element, depth)
                ))
            })
            .collect();
        format!("({})", properties.join(", "))
    }

    /// `$"text {step} text"`; text pieces share the location of the string
    fn interpolation(&self, step: &BoundStep, parts: &[BoundStep]) -> String {
        let inline = Printer {
            inline: true,
            ..self.clone()
        };
        let mut text = String::from("$\"");
        for part in parts {
            match part.constant() {
                Some(ConstantValue::String(s)) if part.location == step.location => {
                    text.push_str(&quote_interpolated_text(s));
                }
                _ => {
                    text.push('{');
                    text.push_str(&inline.write(part, Slot::Statement, 0));
                    text.push('}');
                }
            }
        }
        text.push('"');
        text
    }
}

// ============================================================================
// Argument access
// ============================================================================

fn step_list<'b>(step: &'b BoundStep, name: &str) -> Option<&'b [BoundStep]> {
    match step.argument(name)? {
        BoundArgument::StepList(steps) => Some(steps),
        _ => None,
    }
}

fn argument_step<'b>(step: &'b BoundStep, name: &str) -> Option<&'b BoundStep> {
    step.argument(name)?.as_step()
}

fn variable<'b>(step: &'b BoundStep, name: &str) -> Option<&'b VariableName> {
    match step.argument(name)? {
        BoundArgument::Variable { name, .. } => Some(name),
        _ => None,
    }
}

/// Arguments in declaration order, then any extra named ones
fn ordered_arguments<'b>(
    factory: &'b dyn StepFactory,
    arguments: &'b BoundArguments,
) -> Vec<(&'b str, Option<usize>, &'b BoundArgument)> {
    let parameters = factory.parameters();
    let mut ordered: Vec<_> = parameters
        .iter()
        .filter_map(|p| arguments.get(&p.name).map(|a| (p.name.as_str(), p.order, a)))
        .collect();
    ordered.extend(
        arguments
            .iter()
            .filter(|(key, _)| parameters.iter().all(|p| &p.name != *key))
            .map(|(key, argument)| (key.as_str(), None, argument)),
    );
    ordered
}

fn entity_key(key: &str) -> String {
    let mut chars = key.chars();
    let identifier = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    let keyword = key.eq_ignore_ascii_case("true") || key.eq_ignore_ascii_case("false");
    if identifier && !keyword {
        key.to_string()
    } else {
        quote(key)
    }
}
