//! Error types shared by every stage
//!
//! Each fallible stage (parsing, visiting, freezing) returns either a value or
//! a non-empty [`ErrorList`]. Lists concatenate, so independent failures are
//! collected instead of stopping at the first one.

use std::fmt;

use crate::position::TextLocation;

// ============================================================================
// Error kinds
// ============================================================================

/// Every user-facing error message lives here
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Unclosed parentheses: '(' has no matching ')'")]
    UnclosedParentheses,

    #[error("Ordered arguments cannot appear after named arguments")]
    OrderedAfterNamed,

    #[error("Variable '<{0}' is missing its closing '>'")]
    UnclosedVariable(String),

    #[error("The step '{0}' does not exist")]
    UnknownStep(String),

    #[error("The step '{step}' does not have a parameter '{parameter}'")]
    UnknownParameter { step: String, parameter: String },

    #[error("Missing parameter '{parameter}' for step '{step}'")]
    MissingRequiredParameter { step: String, parameter: String },

    #[error("Parameter '{parameter}' of step '{step}' is set more than once")]
    DuplicateParameter { step: String, parameter: String },

    #[error("'{step}.{parameter}' expects {expected} but was given {actual}")]
    TypeMismatch {
        step: String,
        parameter: String,
        expected: String,
        actual: String,
    },

    #[error("Could not determine a single type for '{step}.{parameter}' ({candidates})")]
    AmbiguousType {
        step: String,
        parameter: String,
        candidates: String,
    },

    #[error("'{member}' is not a member of enum '{enum_type}'")]
    UnknownEnumMember { enum_type: String, member: String },

    #[error("The enum '{0}' does not exist")]
    UnknownEnum(String),

    #[error("Infix operators '{first}' and '{second}' cannot be mixed; use brackets to group them")]
    MixedOperators { first: String, second: String },

    #[error("Unrecognized escape sequence '{0}'")]
    InvalidEscape(String),

    #[error("Could not read '{0}' as a number")]
    InvalidNumber(String),

    #[error("Could not read '{0}' as a date")]
    InvalidDate(String),

    #[error("'{step}.{parameter}' does not accept a lambda")]
    UnexpectedLambda { step: String, parameter: String },

    #[error("Only steps can follow '|', found '{0}'")]
    InvalidPipe(String),

    #[error("A lambda cannot be used on its own")]
    UnboundLambda,

    #[error("'{step}.{parameter}' must be a variable name")]
    ExpectedVariable { step: String, parameter: String },

    #[error("'{step}.{parameter}' expects a list of steps")]
    ExpectedStepList { step: String, parameter: String },
}

// ============================================================================
// Single error
// ============================================================================

/// One error, optionally tied to the span it concerns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleError {
    pub kind: ErrorKind,
    pub location: Option<TextLocation>,
}

impl SingleError {
    pub fn new(kind: ErrorKind, location: Option<TextLocation>) -> Self {
        Self { kind, location }
    }

    pub fn at(kind: ErrorKind, location: &TextLocation) -> Self {
        Self {
            kind,
            location: Some(location.clone()),
        }
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for SingleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} at {}", self.kind, location.start),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for SingleError {}

// ============================================================================
// Error list
// ============================================================================

/// An ordered collection of errors
///
/// `ErrorList::empty()` is the identity for [`ErrorList::combine`], and
/// combination is plain concatenation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorList {
    errors: Vec<SingleError>,
}

impl ErrorList {
    pub fn empty() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn single(kind: ErrorKind, location: Option<TextLocation>) -> Self {
        Self {
            errors: vec![SingleError::new(kind, location)],
        }
    }

    pub fn at(kind: ErrorKind, location: &TextLocation) -> Self {
        Self::single(kind, Some(location.clone()))
    }

    /// Concatenate two lists
    pub fn combine(mut self, other: ErrorList) -> Self {
        self.errors.extend(other.errors);
        self
    }

    pub fn push(&mut self, error: SingleError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, other: ErrorList) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SingleError> {
        self.errors.iter()
    }

    pub fn first(&self) -> Option<&SingleError> {
        self.errors.first()
    }

    pub fn kinds(&self) -> Vec<&ErrorKind> {
        self.errors.iter().map(|e| &e.kind).collect()
    }

    /// `Ok(value)` when no errors were collected, otherwise `Err(self)`
    pub fn into_result<T>(self, value: T) -> Result<T, ErrorList> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl From<SingleError> for ErrorList {
    fn from(error: SingleError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl FromIterator<SingleError> for ErrorList {
    fn from_iter<I: IntoIterator<Item = SingleError>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ErrorList {
    type Item = SingleError;
    type IntoIter = std::vec::IntoIter<SingleError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a SingleError;
    type IntoIter = std::slice::Iter<'a, SingleError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ErrorList {}

/// Collect every value, or every error from every failed result
pub fn collect_all<T>(
    results: impl IntoIterator<Item = Result<T, ErrorList>>,
) -> Result<Vec<T>, ErrorList> {
    let mut values = Vec::new();
    let mut errors = ErrorList::empty();
    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(e) => errors.extend(e),
        }
    }
    errors.into_result(values)
}
