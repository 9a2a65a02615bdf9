//! Freezable intermediate representation
//!
//! The IR is the untyped step graph produced from a syntax tree. Step names
//! are still strings and arguments are keyed by position or name; the binder
//! (`freeze`) resolves both against a step factory store.

pub mod literals;
pub mod visitor;


use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::position::TextLocation;
use crate::types::TypeReference;

pub use visitor::{visit, visit_lenient};

/* ===================== Names and keys ===================== */

/// A variable name, stored without its angle brackets
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VariableName(String);

impl VariableName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Build from `<name>` token text
    ///
    /// Panics if the text is not bracketed; the lexer only produces variable
    /// tokens of that shape.
    pub fn from_token_text(text: &str) -> Self {
        match text.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
            Some(name) if !name.is_empty() => Self(name.to_string()),
            _ => panic!("variable token text must look like <name>, got {:?}", text),
        }
    }

    /// The implicit lambda variable
    pub fn item() -> Self {
        Self("item".to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VariableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

/// How an argument was supplied
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ParameterRef {
    /// Positional, 1-based
    Index(usize),
    Named(String),
}

impl fmt::Display for ParameterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterRef::Index(n) => write!(f, "#{}", n),
            ParameterRef::Named(name) => write!(f, "{}", name),
        }
    }
}

/// Source shape that the formatter tries to preserve
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StepMetadata {
    /// Written inside parentheses
    pub bracketed: bool,
    /// Written as an infix chain
    pub infix: bool,
}

/* ===================== Constants ===================== */

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConstantValue {
    String(String),
    Integer(i64),
    Double(f64),
    Bool(bool),
    Date(NaiveDateTime),
    Enum { enum_type: String, member: String },
}

impl ConstantValue {
    pub fn type_reference(&self) -> TypeReference {
        match self {
            ConstantValue::String(_) => TypeReference::STRING,
            ConstantValue::Integer(_) => TypeReference::INTEGER,
            ConstantValue::Double(_) => TypeReference::DOUBLE,
            ConstantValue::Bool(_) => TypeReference::BOOL,
            ConstantValue::Date(_) => TypeReference::DATE,
            ConstantValue::Enum { enum_type, .. } => TypeReference::enumeration(enum_type.clone()),
        }
    }

    /// Source text that reads back as the same constant
    pub fn serialize(&self) -> String {
        match self {
            ConstantValue::String(s) => literals::quote(s),
            ConstantValue::Integer(i) => i.to_string(),
            ConstantValue::Double(d) => {
                // `Display` never switches to exponent form; number literals have none
                let text = d.to_string();
                if text.contains('.') || !d.is_finite() {
                    text
                } else {
                    format!("{}.0", text)
                }
            }
            ConstantValue::Bool(b) => b.to_string(),
            // `%.f` prints 0, 3, 6 or 9 fraction digits, whichever keeps the value
            ConstantValue::Date(date) => date.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
            ConstantValue::Enum { enum_type, member } => format!("{}.{}", enum_type, member),
        }
    }
}

/* ===================== Steps ===================== */

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FreezableStep {
    Constant {
        value: ConstantValue,
        location: TextLocation,
        metadata: StepMetadata,
    },
    Compound {
        name: String,
        arguments: BTreeMap<ParameterRef, FreezableStepProperty>,
        location: TextLocation,
        metadata: StepMetadata,
    },
}

impl FreezableStep {
    pub fn constant(value: ConstantValue, location: TextLocation) -> Self {
        FreezableStep::Constant {
            value,
            location,
            metadata: StepMetadata::default(),
        }
    }

    pub fn compound(
        name: impl Into<String>,
        arguments: BTreeMap<ParameterRef, FreezableStepProperty>,
        location: TextLocation,
    ) -> Self {
        FreezableStep::Compound {
            name: name.into(),
            arguments,
            location,
            metadata: StepMetadata::default(),
        }
    }

    pub fn location(&self) -> &TextLocation {
        match self {
            FreezableStep::Constant { location, .. } | FreezableStep::Compound { location, .. } => {
                location
            }
        }
    }

    pub fn metadata(&self) -> StepMetadata {
        match self {
            FreezableStep::Constant { metadata, .. } | FreezableStep::Compound { metadata, .. } => {
                *metadata
            }
        }
    }

    pub fn metadata_mut(&mut self) -> &mut StepMetadata {
        match self {
            FreezableStep::Constant { metadata, .. } | FreezableStep::Compound { metadata, .. } => {
                metadata
            }
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            FreezableStep::Compound { name, .. } => Some(name),
            FreezableStep::Constant { .. } => None,
        }
    }

    pub fn arguments(&self) -> Option<&BTreeMap<ParameterRef, FreezableStepProperty>> {
        match self {
            FreezableStep::Compound { arguments, .. } => Some(arguments),
            FreezableStep::Constant { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FreezableStepProperty {
    Step(FreezableStep),
    Variable {
        name: VariableName,
        location: TextLocation,
    },
    Lambda {
        variable: Option<VariableName>,
        body: Box<FreezableStep>,
        location: TextLocation,
    },
    StepList {
        steps: Vec<FreezableStep>,
        location: TextLocation,
    },
}

impl FreezableStepProperty {
    pub fn location(&self) -> &TextLocation {
        match self {
            FreezableStepProperty::Step(step) => step.location(),
            FreezableStepProperty::Variable { location, .. }
            | FreezableStepProperty::Lambda { location, .. }
            | FreezableStepProperty::StepList { location, .. } => location,
        }
    }

    /// View this property as a step: variables become `GetVariable` and step
    /// lists become `ArrayNew`. Lambdas have no step form.
    pub fn into_step(self) -> Result<FreezableStep, FreezableStepProperty> {
        match self {
            FreezableStepProperty::Step(step) => Ok(step),
            FreezableStepProperty::Variable { name, location } => {
                let arguments = BTreeMap::from([(
                    ParameterRef::Named("Variable".to_string()),
                    FreezableStepProperty::Variable {
                        name,
                        location: location.clone(),
                    },
                )]);
                Ok(FreezableStep::compound("GetVariable", arguments, location))
            }
            FreezableStepProperty::StepList { steps, location } => {
                let arguments = BTreeMap::from([(
                    ParameterRef::Named("Elements".to_string()),
                    FreezableStepProperty::StepList {
                        steps,
                        location: location.clone(),
                    },
                )]);
                Ok(FreezableStep::compound("ArrayNew", arguments, location))
            }
            lambda @ FreezableStepProperty::Lambda { .. } => Err(lambda),
        }
    }

    pub fn as_step(&self) -> Option<&FreezableStep> {
        match self {
            FreezableStepProperty::Step(step) => Some(step),
            _ => None,
        }
    }
}
