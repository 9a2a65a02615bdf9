//! Tests for the grammar and the syntax tree it builds

use super::cst::FunctionCall;
use super::*;

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse source that must not have syntax errors and return the document items
fn items(source: &str) -> Vec<Node> {
    let output = parse(source);
    assert!(output.is_ok(), "unexpected syntax errors: {:?}", output.errors);
    match output.root.kind {
        NodeKind::Document(items) => items,
        other => panic!("root must be a document, got {:?}", other),
    }
}

/// The single item of a document
fn single(source: &str) -> Node {
    let mut items = items(source);
    assert_eq!(items.len(), 1, "expected one item in {:?}", source);
    items.remove(0)
}

fn call(node: &Node) -> &FunctionCall {
    match &node.kind {
        NodeKind::Function(call) => call,
        other => panic!("expected a function, got {:?}", other),
    }
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn test_whitespace_form_arguments() {
    let node = single("Print 1 Value: \"x\"");
    let call = call(&node);
    assert_eq!(call.name.text, "Print");
    assert_eq!(call.ordered.len(), 1);
    assert_eq!(call.named.len(), 1);
    assert_eq!(call.named[0].name.text, "Value");
    assert!(call.open.is_none());
}

#[test]
fn test_bare_name_in_argument_position_is_a_step() {
    let node = single("Print Foo 1");
    let call = call(&node);
    assert_eq!(call.ordered.len(), 2);
    let inner = self::call(&call.ordered[0]);
    assert_eq!(inner.name.text, "Foo");
    assert!(inner.ordered.is_empty());
}

#[test]
fn test_call_form() {
    let node = single("Print(1, Value: 2)");
    let call = call(&node);
    assert_eq!(call.ordered.len(), 1);
    assert_eq!(call.named.len(), 1);
    assert_eq!(call.open.as_ref().map(|t| t.text.as_str()), Some("("));
    assert!(node.is_call_form());
}

#[test]
fn test_space_before_paren_is_not_call_form() {
    let node = single("Print (1)");
    assert!(!node.is_call_form());
    assert!(matches!(call(&node).ordered[0].kind, NodeKind::Bracketed(_)));
}

// ============================================================================
// Steps and terms
// ============================================================================

#[test]
fn test_set_variable() {
    let node = single("<x> = 1 + 2");
    match &node.kind {
        NodeKind::SetVariable { variable, value } => {
            assert_eq!(variable.text, "<x>");
            let value = value.as_ref().expect("value parsed");
            assert!(matches!(value.kind, NodeKind::Infix { .. }));
        }
        other => panic!("expected set variable, got {:?}", other),
    }
}

#[test]
fn test_pipe_stages() {
    let node = single("\"abc\" | StringLength | Print");
    match &node.kind {
        NodeKind::Pipe(stages) => assert_eq!(stages.len(), 3),
        other => panic!("expected a pipe, got {:?}", other),
    }
}

#[test]
fn test_infix_operators() {
    let node = single("1 + 2 - 3");
    match &node.kind {
        NodeKind::Infix {
            operands,
            operators,
        } => {
            assert_eq!(operands.len(), 3);
            let symbols: Vec<&str> = operators.iter().map(|o| o.text.as_str()).collect();
            assert_eq!(symbols, vec!["+", "-"]);
        }
        other => panic!("expected infix, got {:?}", other),
    }
}

#[test]
fn test_paren_forms() {
    assert!(matches!(single("()").kind, NodeKind::Entity(ref p) if p.is_empty()));
    assert!(matches!(single("(a: 1, 'b c': 2)").kind, NodeKind::Entity(ref p) if p.len() == 2));
    assert!(matches!(single("(<x> => Print <x>)").kind, NodeKind::Lambda { variable: Some(_), .. }));
    assert!(matches!(single("(=> Print 1)").kind, NodeKind::Lambda { variable: None, .. }));
    assert!(matches!(single("(Print 1)").kind, NodeKind::Bracketed(Some(_))));
}

#[test]
fn test_accessor_needs_adjacent_bracket() {
    assert!(matches!(single("<x>[0]").kind, NodeKind::Accessor { .. }));

    let node = single("Print <x> [0]");
    let call = call(&node);
    assert_eq!(call.ordered.len(), 2);
    assert!(matches!(call.ordered[1].kind, NodeKind::Array(_)));
}

// ============================================================================
// Sequences
// ============================================================================

#[test]
fn test_top_level_sequence() {
    let node = single("- Print 1\n- Print 2\n");
    match &node.kind {
        NodeKind::Sequence(items) => {
            assert_eq!(items.len(), 2);
            assert!(items.iter().all(|i| i.step.is_some() && i.recovered.is_none()));
        }
        other => panic!("expected a sequence, got {:?}", other),
    }
}

#[test]
fn test_nested_sequence_in_parentheses() {
    let node = single("- ForEach [1, 2] (\n    - Print 1\n    - Print 2\n  )");
    let NodeKind::Sequence(items) = &node.kind else {
        panic!("expected a sequence");
    };
    let step = items[0].step.as_ref().expect("step parsed");
    let action = &call(step).ordered[1];
    match &action.kind {
        NodeKind::Bracketed(Some(inner)) => {
            assert!(matches!(&inner.kind, NodeKind::Sequence(items) if items.len() == 2));
        }
        other => panic!("expected a bracketed sequence, got {:?}", other),
    }
}

#[test]
fn test_comments_only_document_is_empty() {
    assert!(items("# nothing here\n/* or here */").is_empty());
    assert!(items("").is_empty());
}

// ============================================================================
// Recovery
// ============================================================================

#[test]
fn test_recovery_resumes_at_next_command() {
    let output = parse("- Foo (\n- Print 2");
    assert_eq!(output.errors.len(), 1);

    let NodeKind::Document(items) = &output.root.kind else {
        panic!("root must be a document");
    };
    let NodeKind::Sequence(sequence) = &items[0].kind else {
        panic!("expected a sequence");
    };
    assert_eq!(sequence.len(), 2);
    let second = sequence[1].step.as_ref().expect("second command parsed");
    assert_eq!(call(second).name.text, "Print");
    assert!(!second.is_partial());
}

#[test]
fn test_error_context_is_innermost_partial_node() {
    let output = parse("Print (Foo a: 1 2)");
    assert_eq!(output.errors.len(), 1);
    let error = &output.errors[0];
    assert_eq!(error.offending.text, "2");
    assert!(error.context.is_partial());
    assert_eq!(call(&error.context).name.text, "Foo");
}

#[test]
fn test_trailing_input_is_an_error_node() {
    let output = parse("Print 1 )");
    assert_eq!(output.errors.len(), 1);
    let NodeKind::Document(items) = &output.root.kind else {
        panic!("root must be a document");
    };
    assert_eq!(items.len(), 2);
    assert!(items[1].is_error());
}

#[test]
fn test_parse_command_uses_document_positions() {
    let commands = split_commands("- Print 1\n- Print 2");
    let output = parse_command(&commands[1]);
    assert!(output.is_ok());
    let name = output
        .tokens
        .iter()
        .find(|t| t.kind == TokenKind::Name)
        .expect("name token");
    assert_eq!(name.start.line, 2);
    assert_eq!(name.start.column, 2);
}
