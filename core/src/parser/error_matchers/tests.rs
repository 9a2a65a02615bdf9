//! Tests for the syntax error matchers

use super::*;
use crate::parser::parse;
use crate::position::SourcePos;

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse source and classify every syntax error
fn errors(source: &str) -> Vec<SingleError> {
    let output = parse(source);
    syntax_errors(&output.errors).into_iter().collect()
}

fn start_of(error: &SingleError) -> SourcePos {
    error.location.as_ref().expect("syntax errors are located").start
}

// ============================================================================
// Unclosed Parentheses
// ============================================================================

#[test]
fn test_unclosed_bracketed_step() {
    let errors = errors("Foo (1, 2");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::UnclosedParentheses);
    assert_eq!(start_of(&errors[0]), SourcePos::new(1, 4, 4));
}

#[test]
fn test_unclosed_call_form() {
    let errors = errors("Foo(1, 2");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::UnclosedParentheses);
    assert_eq!(start_of(&errors[0]), SourcePos::new(1, 3, 3));
}

#[test]
fn test_closed_call_form_is_not_unclosed() {
    let errors = errors("Foo(a: 1, 2)");
    assert!(errors.iter().all(|e| e.kind != ErrorKind::UnclosedParentheses));
}

// ============================================================================
// Ordered After Named
// ============================================================================

#[test]
fn test_ordered_after_named_call_form() {
    let errors = errors("Foo(a: 1, 2)");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::OrderedAfterNamed);
    assert_eq!(start_of(&errors[0]), SourcePos::new(1, 10, 10));
}

#[test]
fn test_ordered_after_named_whitespace_form() {
    let errors = errors("Foo a: 1 2");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::OrderedAfterNamed);
}

// ============================================================================
// Unclosed Variable
// ============================================================================

#[test]
fn test_unclosed_variable() {
    let errors = errors("Print <name");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::UnclosedVariable("name".to_string()));
    assert_eq!(
        errors[0].message(),
        "Variable '<name' is missing its closing '>'"
    );
}

// ============================================================================
// Fallback and chain
// ============================================================================

#[test]
fn test_unmatched_errors_fall_back_to_syntax() {
    let errors = errors("Foo ]");
    assert_eq!(errors.len(), 1);
    match &errors[0].kind {
        ErrorKind::Syntax(message) => assert!(message.contains("']'"), "{}", message),
        other => panic!("expected a syntax error, got {:?}", other),
    }
    assert!(errors[0].message().starts_with("Syntax error: "));
}

#[test]
fn test_one_error_per_command() {
    let errors = errors("- Foo (1\n- Bar a: 1 2\n- Print 1");
    let kinds: Vec<&ErrorKind> = errors.iter().map(|e| &e.kind).collect();
    assert_eq!(
        kinds,
        vec![&ErrorKind::UnclosedParentheses, &ErrorKind::OrderedAfterNamed]
    );
}

#[test]
fn test_chain_order() {
    let ids: Vec<&str> = MatcherChain::new().matchers().collect();
    assert_eq!(
        ids,
        vec!["unclosed-parentheses", "ordered-after-named", "unclosed-variable"]
    );
}

#[test]
fn test_partial_ir_is_computed_once() {
    let output = parse("Foo a: 1 2");
    let context = &output.errors[0].context;
    let lazy = LazyPartialIr::new(context);
    assert!(!lazy.is_computed());

    let first = lazy.get().expect("partial function visits leniently");
    let second = lazy.get().expect("partial function visits leniently");
    assert!(lazy.is_computed());
    assert!(std::ptr::eq(first, second));
}
