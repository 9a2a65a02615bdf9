//! Syntax tree to IR
//!
//! Sibling nodes are visited independently and their errors combined. A
//! node short-circuits only when a child is structurally required (the value
//! of a set-variable, the source of a pipe, the body of a lambda).
//!
//! In lenient mode missing children and error nodes are skipped instead of
//! failing, which gives a best-effort IR for partial trees.

use std::collections::BTreeMap;

use super::literals::{decode_constant, split_interpolated, Segment};
use super::{FreezableStep, FreezableStepProperty, ParameterRef, VariableName};
use crate::errors::{collect_all, ErrorKind, ErrorList, SingleError};
use crate::parser::cst::{EntityProperty, FunctionCall, SequenceItem};
use crate::parser::{parse_at, Node, NodeKind, Token, TokenKind};
use crate::position::TextLocation;

/// Visit an error-free tree
pub fn visit(node: &Node) -> Result<FreezableStepProperty, ErrorList> {
    Visitor { lenient: false }.visit(node)
}

/// Best-effort IR for a tree that may contain partial and error nodes
pub fn visit_lenient(node: &Node) -> Option<FreezableStepProperty> {
    Visitor { lenient: true }.visit(node).ok()
}

/// Step implementing an infix operator
pub fn operator_step_name(operator: &str) -> Option<&'static str> {
    let name = match operator {
        "+" => "Sum",
        "-" => "Subtract",
        "*" => "Product",
        "/" => "Divide",
        "%" => "Modulo",
        "^" => "Power",
        "&&" => "And",
        "||" => "Or",
        "==" => "Equals",
        "!=" => "NotEquals",
        "<" => "LessThan",
        "<=" => "LessThanOrEqual",
        ">" => "GreaterThan",
        ">=" => "GreaterThanOrEqual",
        _ => return None,
    };
    Some(name)
}

fn named(name: &str) -> ParameterRef {
    ParameterRef::Named(name.to_string())
}

fn syntax(message: impl Into<String>, location: &TextLocation) -> ErrorList {
    ErrorList::at(ErrorKind::Syntax(message.into()), location)
}

/// Span from the start of `outer` to `stop`, with the matching slice of text
fn prefix_location(outer: &TextLocation, stop: &TextLocation) -> TextLocation {
    let length = stop.stop.index.saturating_sub(outer.start.index);
    let text = outer.text.get(..length).unwrap_or(&outer.text);
    TextLocation::new(text, outer.start, stop.stop)
}

struct Visitor {
    lenient: bool,
}

impl Visitor {
    fn visit(&self, node: &Node) -> Result<FreezableStepProperty, ErrorList> {
        match &node.kind {
            NodeKind::Document(items) => self.document(node, items),
            NodeKind::Sequence(items) => self.sequence(node, items),
            NodeKind::SetVariable { variable, value } => {
                self.set_variable(node, variable, value.as_deref())
            }
            NodeKind::Pipe(stages) => self.pipe(node, stages),
            NodeKind::Infix {
                operands,
                operators,
            } => self.infix(node, operands, operators),
            NodeKind::Function(call) => self.function(node, call).map(FreezableStepProperty::Step),
            NodeKind::Bracketed(inner) => self.bracketed(node, inner.as_deref()),
            NodeKind::Array(elements) => Ok(FreezableStepProperty::StepList {
                steps: self.steps(elements.iter())?,
                location: node.location.clone(),
            }),
            NodeKind::Entity(properties) => self.entity(node, properties),
            NodeKind::Lambda { variable, body } => {
                self.lambda(node, variable.as_ref(), body.as_deref())
            }
            NodeKind::Variable(token) => Ok(FreezableStepProperty::Variable {
                name: VariableName::from_token_text(&token.text),
                location: node.location.clone(),
            }),
            NodeKind::Accessor { target, index } => self.accessor(node, target, index.as_deref()),
            NodeKind::Literal(token) => self.literal(node, token),
            NodeKind::Error(_) => Err(syntax(
                format!("unexpected input '{}'", node.location.text),
                &node.location,
            )),
        }
    }

    /// Keep an error in strict mode, drop it in lenient mode
    fn keep(&self, errors: &mut ErrorList, error: ErrorList) {
        if !self.lenient {
            errors.extend(error);
        }
    }

    fn step(&self, node: &Node) -> Result<FreezableStep, ErrorList> {
        self.visit(node)?.into_step().map_err(|lambda| {
            ErrorList::at(ErrorKind::UnboundLambda, lambda.location())
        })
    }

    fn steps<'n>(
        &self,
        nodes: impl Iterator<Item = &'n Node>,
    ) -> Result<Vec<FreezableStep>, ErrorList> {
        let results = nodes.map(|n| self.step(n));
        if self.lenient {
            Ok(results.filter_map(Result::ok).collect())
        } else {
            collect_all(results)
        }
    }

    fn document(&self, node: &Node, items: &[Node]) -> Result<FreezableStepProperty, ErrorList> {
        let mut errors = ErrorList::empty();
        for error in items.iter().filter(|n| n.is_error()) {
            self.keep(
                &mut errors,
                syntax(format!("unexpected input '{}'", error.location.text), &error.location),
            );
        }
        errors.into_result(())?;

        match items.iter().find(|n| !n.is_error()) {
            Some(first) => self.visit(first),
            None => Ok(FreezableStepProperty::Step(FreezableStep::compound(
                "Sequence",
                BTreeMap::from([(
                    named("Steps"),
                    FreezableStepProperty::StepList {
                        steps: Vec::new(),
                        location: node.location.clone(),
                    },
                )]),
                node.location.clone(),
            ))),
        }
    }

    fn sequence(
        &self,
        node: &Node,
        items: &[SequenceItem],
    ) -> Result<FreezableStepProperty, ErrorList> {
        let mut errors = ErrorList::empty();
        for item in items {
            if item.step.is_none() {
                self.keep(&mut errors, syntax("missing step after '-'", &item.dash.location()));
            }
            if let Some(recovered) = &item.recovered {
                self.keep(
                    &mut errors,
                    syntax(
                        format!("unexpected input '{}'", recovered.location.text),
                        &recovered.location,
                    ),
                );
            }
        }

        let steps = match self.steps(items.iter().filter_map(|i| i.step.as_ref())) {
            Ok(steps) => steps,
            Err(e) => {
                errors.extend(e);
                Vec::new()
            }
        };
        errors.into_result(())?;

        Ok(FreezableStepProperty::Step(FreezableStep::compound(
            "Sequence",
            BTreeMap::from([(
                named("Steps"),
                FreezableStepProperty::StepList {
                    steps,
                    location: node.location.clone(),
                },
            )]),
            node.location.clone(),
        )))
    }

    fn set_variable(
        &self,
        node: &Node,
        variable: &Token,
        value: Option<&Node>,
    ) -> Result<FreezableStepProperty, ErrorList> {
        let mut arguments = BTreeMap::from([(
            named("Variable"),
            FreezableStepProperty::Variable {
                name: VariableName::from_token_text(&variable.text),
                location: variable.location(),
            },
        )]);

        match value {
            Some(value) => {
                let value = self.step(value)?;
                arguments.insert(named("Value"), FreezableStepProperty::Step(value));
            }
            None if self.lenient => {}
            None => return Err(syntax("missing value after '='", &node.location)),
        }

        Ok(FreezableStepProperty::Step(FreezableStep::compound(
            "SetVariable",
            arguments,
            node.location.clone(),
        )))
    }

    fn pipe(&self, node: &Node, stages: &[Node]) -> Result<FreezableStepProperty, ErrorList> {
        let Some((source, rest)) = stages.split_first() else {
            return Err(syntax("empty pipe", &node.location));
        };
        let mut current = self.step(source)?;

        for stage in rest {
            let NodeKind::Function(call) = &stage.kind else {
                return Err(ErrorList::at(
                    ErrorKind::InvalidPipe(stage.location.text.clone()),
                    &stage.location,
                ));
            };
            let FreezableStep::Compound {
                name,
                arguments,
                metadata,
                ..
            } = self.function(stage, call)?
            else {
                unreachable!("function nodes always visit to compound steps");
            };

            let mut shifted = BTreeMap::new();
            shifted.insert(ParameterRef::Index(1), FreezableStepProperty::Step(current));
            for (key, value) in arguments {
                let key = match key {
                    ParameterRef::Index(n) => ParameterRef::Index(n + 1),
                    other => other,
                };
                shifted.insert(key, value);
            }

            current = FreezableStep::Compound {
                name,
                arguments: shifted,
                location: prefix_location(&node.location, &stage.location),
                metadata,
            };
        }
        Ok(FreezableStepProperty::Step(current))
    }

    fn infix(
        &self,
        node: &Node,
        operands: &[Node],
        operators: &[Token],
    ) -> Result<FreezableStepProperty, ErrorList> {
        let Some(first) = operators.first() else {
            return match operands.first() {
                Some(operand) => self.visit(operand),
                None => Err(syntax("missing operand", &node.location)),
            };
        };

        let mut errors = ErrorList::empty();
        if let Some(other) = operators.iter().find(|o| o.text != first.text) {
            errors.push(SingleError::at(
                ErrorKind::MixedOperators {
                    first: first.text.clone(),
                    second: other.text.clone(),
                },
                &node.location,
            ));
        }
        let name = operator_step_name(&first.text);
        if name.is_none() {
            errors.push(SingleError::at(
                ErrorKind::Syntax(format!("unknown operator '{}'", first.text)),
                &first.location(),
            ));
        }
        let terms = match self.steps(operands.iter()) {
            Ok(terms) => terms,
            Err(e) => {
                errors.extend(e);
                Vec::new()
            }
        };
        errors.into_result(())?;

        let mut step = FreezableStep::compound(
            name.unwrap_or_default(),
            BTreeMap::from([(
                named("Terms"),
                FreezableStepProperty::StepList {
                    steps: terms,
                    location: node.location.clone(),
                },
            )]),
            node.location.clone(),
        );
        step.metadata_mut().infix = true;
        Ok(FreezableStepProperty::Step(step))
    }

    fn function(&self, node: &Node, call: &FunctionCall) -> Result<FreezableStep, ErrorList> {
        let step_name = call.name.text.as_str();
        let mut arguments = BTreeMap::new();
        let mut errors = ErrorList::empty();

        for (i, value) in call.ordered.iter().enumerate() {
            match self.visit(value) {
                Ok(property) => {
                    arguments.insert(ParameterRef::Index(i + 1), property);
                }
                Err(e) => self.keep(&mut errors, e),
            }
        }

        let mut seen: Vec<String> = Vec::new();
        let mut reported: Vec<String> = Vec::new();
        for argument in &call.named {
            let key = argument.name.text.clone();
            let folded = key.to_lowercase();
            if seen.contains(&folded) {
                if !reported.contains(&folded) {
                    self.keep(
                        &mut errors,
                        ErrorList::at(
                            ErrorKind::DuplicateParameter {
                                step: step_name.to_string(),
                                parameter: key.clone(),
                            },
                            &argument.name.location(),
                        ),
                    );
                    reported.push(folded);
                }
                continue;
            }
            seen.push(folded);

            match &argument.value {
                Some(value) => match self.visit(value) {
                    Ok(property) => {
                        arguments.insert(ParameterRef::Named(key), property);
                    }
                    Err(e) => self.keep(&mut errors, e),
                },
                None => self.keep(
                    &mut errors,
                    syntax(format!("missing value for '{}'", key), &argument.name.location()),
                ),
            }
        }

        errors.into_result(FreezableStep::compound(
            step_name,
            arguments,
            node.location.clone(),
        ))
    }

    fn bracketed(&self, node: &Node, inner: Option<&Node>) -> Result<FreezableStepProperty, ErrorList> {
        let Some(inner) = inner else {
            return Err(syntax("missing step inside '('", &node.location));
        };
        match self.visit(inner)? {
            FreezableStepProperty::Step(mut step) => {
                step.metadata_mut().bracketed = true;
                Ok(FreezableStepProperty::Step(step))
            }
            other => Ok(other),
        }
    }

    fn entity(
        &self,
        node: &Node,
        properties: &[EntityProperty],
    ) -> Result<FreezableStepProperty, ErrorList> {
        let mut arguments = BTreeMap::new();
        let mut errors = ErrorList::empty();
        let mut reported: Vec<String> = Vec::new();

        for property in properties {
            let key = if property.key.kind == TokenKind::Name {
                property.key.text.clone()
            } else {
                match decode_constant(&property.key) {
                    Ok(super::ConstantValue::String(key)) => key,
                    Ok(_) => property.key.text.clone(),
                    Err(e) => {
                        self.keep(&mut errors, e);
                        continue;
                    }
                }
            };

            let reference = ParameterRef::Named(key.clone());
            if arguments.contains_key(&reference) {
                if !reported.contains(&key) {
                    self.keep(
                        &mut errors,
                        ErrorList::at(
                            ErrorKind::DuplicateParameter {
                                step: "CreateEntity".to_string(),
                                parameter: key.clone(),
                            },
                            &property.key.location(),
                        ),
                    );
                    reported.push(key);
                }
                continue;
            }

            match &property.value {
                Some(value) => match self.visit(value) {
                    Ok(value) => {
                        arguments.insert(reference, value);
                    }
                    Err(e) => self.keep(&mut errors, e),
                },
                None => self.keep(
                    &mut errors,
                    syntax(format!("missing value for '{}'", key), &property.key.location()),
                ),
            }
        }

        errors.into_result(FreezableStepProperty::Step(FreezableStep::compound(
            "CreateEntity",
            arguments,
            node.location.clone(),
        )))
    }

    fn lambda(
        &self,
        node: &Node,
        variable: Option<&Token>,
        body: Option<&Node>,
    ) -> Result<FreezableStepProperty, ErrorList> {
        let Some(body) = body else {
            return Err(syntax("missing lambda body after '=>'", &node.location));
        };
        let body = self.step(body)?;
        Ok(FreezableStepProperty::Lambda {
            variable: variable.map(|t| VariableName::from_token_text(&t.text)),
            body: Box::new(body),
            location: node.location.clone(),
        })
    }

    fn accessor(
        &self,
        node: &Node,
        target: &Node,
        index: Option<&Node>,
    ) -> Result<FreezableStepProperty, ErrorList> {
        let Some(index) = index else {
            return Err(syntax("missing index inside '['", &node.location));
        };

        let target_result = self.visit(target);
        let index_result = self.visit(index);
        let (target, index_value) = match (target_result, index_result) {
            (Ok(t), Ok(i)) => (t, i),
            (t, i) => {
                let mut errors = ErrorList::empty();
                errors.extend(t.err().unwrap_or_default());
                errors.extend(i.err().unwrap_or_default());
                return Err(errors);
            }
        };

        let integer_index = matches!(
            &index.kind,
            NodeKind::Literal(token) if token.kind == TokenKind::Number && !token.text.contains('.')
        );
        let (step_name, target_key, index_key) = if integer_index {
            ("ElementAtIndex", "Array", "Index")
        } else {
            ("EntityGetValue", "Entity", "Property")
        };

        Ok(FreezableStepProperty::Step(FreezableStep::compound(
            step_name,
            BTreeMap::from([(named(target_key), target), (named(index_key), index_value)]),
            node.location.clone(),
        )))
    }

    fn literal(&self, node: &Node, token: &Token) -> Result<FreezableStepProperty, ErrorList> {
        if token.kind != TokenKind::InterpolatedString {
            let value = decode_constant(token)?;
            return Ok(FreezableStepProperty::Step(FreezableStep::constant(
                value,
                node.location.clone(),
            )));
        }

        let mut strings = Vec::new();
        let mut errors = ErrorList::empty();
        for segment in split_interpolated(token)? {
            match segment {
                Segment::Text(text) => strings.push(FreezableStep::constant(
                    super::ConstantValue::String(text),
                    node.location.clone(),
                )),
                Segment::Expression { text, start } => {
                    let output = parse_at(&text, start);
                    if let Some(error) = output.errors.first() {
                        errors.push(SingleError::at(
                            ErrorKind::Syntax(error.message.clone()),
                            &output.root.location,
                        ));
                        continue;
                    }
                    match self.step(&output.root) {
                        Ok(step) => strings.push(step),
                        Err(e) => errors.extend(e),
                    }
                }
            }
        }

        errors.into_result(FreezableStepProperty::Step(FreezableStep::compound(
            "StringInterpolate",
            BTreeMap::from([(
                named("Strings"),
                FreezableStepProperty::StepList {
                    steps: strings,
                    location: node.location.clone(),
                },
            )]),
            node.location.clone(),
        )))
    }
}
