//! SCL front end
//!
//! Parsing, binding and editor queries for SCL, a small step-based scripting
//! language. Documents are compiled with [`compile`]; editors call the pure
//! query functions in [`editor`], which only look at the command under the
//! cursor and degrade gracefully on broken input.

pub mod compiler;
pub mod config;
pub mod editor;
pub mod errors;
pub mod freeze;
pub mod ir;
pub mod parser;
pub mod position;
pub mod steps;
pub mod types;

// Re-export main types
pub use compiler::compile;
pub use config::{ConfigError, SclConfig};
pub use editor::{
    format_document, get_completions, get_diagnostics, get_hover, get_signature_help,
    CompletionItem, CompletionResponse, Diagnostic, FormattingOptions, LineEnding,
    QuickInfoResponse, SignatureHelpItem, SignatureHelpResponse, SignatureParameter, TextEdit,
};
pub use errors::{ErrorKind, ErrorList, SingleError};
pub use freeze::{BoundArgument, BoundStep, TypeResolver};
pub use position::{LinePosition, SourcePos, TextLocation, TextRange};
pub use steps::{core_store, StepFactory, StepFactoryStore};
pub use types::TypeReference;
