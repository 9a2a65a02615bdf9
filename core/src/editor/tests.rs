//! Tests for the editor queries

use super::*;
use crate::errors::ErrorKind;
use crate::steps::core_store;

// ============================================================================
// Helper Functions
// ============================================================================

fn pos(line: usize, character: usize) -> LinePosition {
    LinePosition::new(line, character)
}

fn range(start: (usize, usize), end: (usize, usize)) -> TextRange {
    TextRange::new(pos(start.0, start.1), pos(end.0, end.1))
}

fn completions(text: &str, position: LinePosition) -> Vec<CompletionItem> {
    get_completions(text, position, &core_store()).items
}

fn labels(items: &[CompletionItem]) -> Vec<&str> {
    items.iter().map(|i| i.label.as_str()).collect()
}

fn hover(text: &str, position: LinePosition) -> Vec<String> {
    get_hover(text, position, &core_store()).markdown_lines
}

fn signature(text: &str, position: LinePosition) -> SignatureHelpResponse {
    get_signature_help(text, position, &core_store())
}

fn diagnostics(text: &str) -> Vec<Diagnostic> {
    get_diagnostics(text, &core_store())
}

/// Formatted text, failing the test when no edit is produced
fn format_with(text: &str, options: FormattingOptions) -> String {
    let mut edits = format_document(text, &core_store(), options);
    assert_eq!(edits.len(), 1, "expected one edit for {:?}", text);
    let edit = edits.remove(0);
    assert_eq!(edit.range, TextRange::whole_document(text));
    edit.new_text
}

fn format(text: &str) -> String {
    format_with(text, FormattingOptions::default())
}

// ============================================================================
// Command selection
// ============================================================================

#[test]
fn test_command_at_picks_last_command_starting_before_cursor() {
    let commands = split_commands("- Print 1\n- Print 2\n- Print 3");
    assert_eq!(command_at(&commands, pos(0, 0)), Some(0));
    assert_eq!(command_at(&commands, pos(1, 4)), Some(1));
    assert_eq!(command_at(&commands, pos(9, 0)), Some(2));
    assert_eq!(command_at(&[], pos(0, 0)), None);
}

#[test]
fn test_descend_follows_the_cursor() {
    let output = crate::parser::parse("Print (StringLength 'abc')");
    let path = descend(&output.root, pos(0, 21));
    let names: Vec<&str> = path
        .iter()
        .filter_map(|n| match &n.kind {
            NodeKind::Function(call) => Some(call.name.text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["Print", "StringLength"]);

    // Past the closing parenthesis only Print is still open
    let output = crate::parser::parse("Print (StringLength 'abc') ");
    let path = descend(&output.root, pos(0, 27));
    let open = open_path(&path, pos(0, 27));
    assert!(innermost_call(&open).is_some_and(|(_, call)| call.name.text == "Print"));
}

// ============================================================================
// Completion
// ============================================================================

#[test]
fn test_complete_step_name() {
    let items = completions("Prin", pos(0, 4));
    assert_eq!(labels(&items), vec!["Print", "Log"]);
    assert!(items[0].preselect);
    assert!(!items[1].preselect);
    assert_eq!(items[0].detail, "Write a value to the output.");
    assert!(items[0].documentation.starts_with("## Print"));
    assert!(items[0].documentation.contains("*Aliases:* Log"));
    assert_eq!(items[1].edit.new_text, "Log");
    assert_eq!(items[0].edit.range, range((0, 0), (0, 4)));
}

#[test]
fn test_complete_unused_parameters_in_whitespace() {
    let items = completions("Print ", pos(0, 6));
    assert_eq!(labels(&items), vec!["Value"]);
    assert_eq!(items[0].edit.new_text, "Value: ");
    assert_eq!(items[0].detail, "Any");
    assert_eq!(items[0].edit.range, TextRange::at(pos(0, 6)));

    assert!(completions("Print 1 ", pos(0, 8)).is_empty());

    let items = completions("StringToCase \"a\" ", pos(0, 17));
    assert_eq!(labels(&items), vec!["Case"]);
    assert_eq!(items[0].edit.new_text, "Case: ");
    assert_eq!(items[0].detail, "TextCase");
}

#[test]
fn test_complete_bare_name_in_argument_slot() {
    let items = completions("StringToCase Ca", pos(0, 15));
    assert_eq!(items[0].label, "Case");
    assert_eq!(items[0].edit.new_text, "Case: ");
    assert_eq!(items[0].edit.range, range((0, 13), (0, 15)));
    assert!(labels(&items).contains(&"StringToCase"));
}

#[test]
fn test_complete_named_argument_name() {
    let items = completions("StringToCase 'a' Ca: TextCase.Upper", pos(0, 18));
    assert_eq!(labels(&items), vec!["Case"]);
    assert_eq!(items[0].edit.new_text, "Case");
    assert_eq!(items[0].edit.range, range((0, 17), (0, 19)));
}

#[test]
fn test_complete_steps_after_colon() {
    let items = completions("Print Value: ", pos(0, 13));
    let labels = labels(&items);
    assert!(labels.contains(&"Print"));
    assert!(labels.contains(&"StringLength"));
    assert!(items.iter().all(|i| i.edit.range == TextRange::at(pos(0, 13))));
}

#[test]
fn test_complete_variables() {
    let text = "- <name> = 1\n- <other> = 'x'\n- Print <na";
    let items = completions(text, pos(2, 10));
    assert_eq!(labels(&items), vec!["<name>"]);
    assert_eq!(items[0].detail, "Integer");
    assert_eq!(items[0].edit.new_text, "<name>");
    assert_eq!(items[0].edit.range, range((2, 8), (2, 11)));
}

#[test]
fn test_complete_entity_properties() {
    let text = "- <e> = (a: 1, b: \"x\")\n- Print <e>[";
    let items = completions(text, pos(1, 12));
    assert_eq!(labels(&items), vec!["a", "b"]);
    assert_eq!(items[0].detail, "Integer");
    assert_eq!(items[1].detail, "String");
    assert_eq!(items[0].edit.new_text, "\"a\"");
    assert_eq!(items[0].edit.range, TextRange::at(pos(1, 12)));
}

#[test]
fn test_completion_outside_any_command() {
    assert!(completions("", pos(0, 0)).is_empty());
    assert!(completions("   ", pos(0, 2)).is_empty());
}

// ============================================================================
// Hover
// ============================================================================

#[test]
fn test_hover_step_name() {
    assert_eq!(
        hover("Print 1", pos(0, 2)),
        vec!["**Print**", "`Unit`", "Write a value to the output."]
    );
    // The output type is inferred from the arguments
    assert_eq!(hover("If true 1 2", pos(0, 1))[1], "`Integer`");
}

#[test]
fn test_hover_unknown_step() {
    assert_eq!(
        hover("Nope 1", pos(0, 1)),
        vec![
            "**Nope**".to_string(),
            ErrorKind::UnknownStep("Nope".to_string()).to_string()
        ]
    );
}

#[test]
fn test_hover_named_argument() {
    assert_eq!(
        hover("StringToCase String: 'a' Case: TextCase.Upper", pos(0, 15)),
        vec!["**String**", "`String`", "The string to change"]
    );
}

#[test]
fn test_hover_literals() {
    assert_eq!(hover("Print 1", pos(0, 6)), vec!["`1`", "`Integer`"]);
    assert_eq!(hover("Print 'hi'", pos(0, 7)), vec!["`'hi'`", "`String`"]);
}

#[test]
fn test_hover_variables() {
    assert_eq!(
        hover("- <x> = 1\n- Print <x>", pos(1, 9)),
        vec!["`<x>`", "`Integer`"]
    );
    assert_eq!(
        hover("Print <y>", pos(0, 7)),
        vec!["`<y>`", "Untyped VariableName"]
    );
}

#[test]
fn test_hover_survives_broken_earlier_commands() {
    let text = "- Print (\n- <a> = 'x'\n- Print <a>";
    assert_eq!(hover(text, pos(2, 9)), vec!["`<a>`", "`String`"]);
}

#[test]
fn test_hover_on_whitespace_is_empty() {
    assert!(hover("Print  1", pos(0, 6)).is_empty());
}

// ============================================================================
// Signature help
// ============================================================================

#[test]
fn test_signature_label_and_parameters() {
    let help = signature("StringToCase 'a' ", pos(0, 17));
    assert_eq!(help.active_signature, 0);
    assert_eq!(help.signatures.len(), 1);
    let item = &help.signatures[0];
    assert_eq!(item.label, "StringToCase String: String Case: TextCase");
    let parameters: Vec<&str> = item.parameters.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(parameters, vec!["String: String", "Case: TextCase"]);
    assert_eq!(item.parameters[1].documentation, "The case to change to");
    assert!(item.documentation.contains("|Case (2)|`TextCase`|✔|"));
}

#[test]
fn test_active_parameter() {
    // Next positional parameter
    assert_eq!(signature("StringToCase 'a' ", pos(0, 17)).active_parameter, 1);
    // On a positional argument
    assert_eq!(signature("StringToCase 'a' ", pos(0, 14)).active_parameter, 0);
    // On a named argument
    assert_eq!(
        signature("StringToCase Case: TextCase.Upper", pos(0, 20)).active_parameter,
        1
    );
}

#[test]
fn test_signature_of_innermost_open_step() {
    let help = signature("Print (StringLength 'abc')", pos(0, 21));
    assert!(help.signatures[0].label.starts_with("StringLength"));

    let help = signature("Print (StringLength 'abc') ", pos(0, 27));
    assert!(help.signatures[0].label.starts_with("Print"));
}

#[test]
fn test_no_signature_for_unknown_step() {
    assert_eq!(signature("Nope 1 ", pos(0, 7)), SignatureHelpResponse::default());
}

// ============================================================================
// Diagnostics
// ============================================================================

#[test]
fn test_valid_document_has_no_diagnostics() {
    assert!(diagnostics("- <x> = 1\n- Print <x>\n").is_empty());
}

#[test]
fn test_unclosed_parentheses_diagnostic() {
    let found = diagnostics("Foo (1, 2");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].start, pos(0, 4));
    assert_eq!(found[0].message, ErrorKind::UnclosedParentheses.to_string());
    assert_eq!(found[0].severity_code, SEVERITY_ERROR);
}

#[test]
fn test_ordered_after_named_diagnostic() {
    let found = diagnostics("Foo(a: 1, 2)");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].start, pos(0, 10));
    assert_eq!(found[0].message, ErrorKind::OrderedAfterNamed.to_string());
}

#[test]
fn test_each_command_reports_its_own_errors() {
    let found = diagnostics("- <x> = 1\n- Print <x>\n- Foo (1\n- Nope <x>");
    let lines: Vec<usize> = found.iter().map(|d| d.start.line).collect();
    assert_eq!(lines, vec![2, 3]);
    assert_eq!(found[0].start, pos(2, 6));
    assert_eq!(
        found[1].message,
        ErrorKind::UnknownStep("Nope".to_string()).to_string()
    );
}

#[test]
fn test_diagnostics_see_earlier_variables() {
    let found = diagnostics("- <x> = 1\n- StringLength <x>");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].start.line, 1);
}

#[test]
fn test_diagnostic_serializes_in_camel_case() {
    let found = diagnostics("Foo (1, 2");
    let json = serde_json::to_value(&found[0]).unwrap();
    assert_eq!(json["severityCode"], 1);
    assert_eq!(json["start"]["line"], 0);
    assert_eq!(json["start"]["character"], 4);
}

// ============================================================================
// Formatting
// ============================================================================

#[test]
fn test_format_sequence() {
    assert_eq!(
        format("-   print   1\n- Log \"hi\"\n"),
        "- Print 1\n- Print \"hi\"\n"
    );
}

#[test]
fn test_format_argument_forms() {
    assert_eq!(format("Print Value: 1"), "Print 1");
    // Declaration order, whatever order they were written in
    assert_eq!(
        format("StringToCase Case: TextCase.Upper String: 'a'"),
        "StringToCase\n    String: \"a\"\n    Case: TextCase.Upper"
    );
}

#[test]
fn test_format_multiple_arguments_one_per_line() {
    assert_eq!(
        format("- StringToCase 'a' TextCase.Upper"),
        "- StringToCase\n    String: \"a\"\n    Case: TextCase.Upper"
    );
    let options = FormattingOptions {
        indent_width: 2,
        ..FormattingOptions::default()
    };
    assert_eq!(
        format_with("If Condition: true Then: (Print 1)", options),
        "If\n  Condition: true\n  Then: (Print 1)"
    );
}

#[test]
fn test_format_operators() {
    assert_eq!(format("- <x> = 1   +  2 + 3"), "- <x> = 1 + 2 + 3");
    assert_eq!(format("- Print (1+ 2)"), "- Print (1 + 2)");
}

#[test]
fn test_format_collections_and_accessors() {
    let text = "- <a> = [1,2,3]\n- Print <a>[0]\n- <e> = (b: \"x\", a: 1)\n- Print <e>[\"a\"]";
    assert_eq!(
        format(text),
        "- <a> = [1, 2, 3]\n- Print <a>[0]\n- <e> = (a: 1, b: \"x\")\n- Print <e>[\"a\"]"
    );
}

#[test]
fn test_format_interpolation() {
    let text = "- <name> = 'World'\n- Print $\"Hello {<name>}!\"";
    assert_eq!(
        format(text),
        "- <name> = \"World\"\n- Print $\"Hello {<name>}!\""
    );
}

#[test]
fn test_format_lambda() {
    assert_eq!(
        format("ForEach [1,2] (<x> => Print <x>)"),
        "ForEach\n    Array: [1, 2]\n    Action: (<x> => Print <x>)"
    );
}

#[test]
fn test_format_keeps_comments() {
    let text = "# header\n- Print 1 # one\n- Print 2\n# trailer\n";
    assert_eq!(
        format(text),
        "# header\n- Print 1\n# one\n- Print 2\n# trailer\n"
    );
}

#[test]
fn test_format_keeps_comments_inside_nested_sequences() {
    let text = "- ForEach [1, 2] (<x> =>\n    # inner\n    - Print <x>\n    - Print 2 # two\n)\n- Print 3\n";
    assert_eq!(
        format(text),
        "- ForEach\n    Array: [1, 2]\n    Action: (<x> =>\n        # inner\n        - Print <x>\n        - Print 2\n        # two\n    )\n- Print 3\n"
    );
}

#[test]
fn test_format_keeps_comments_between_argument_lines() {
    let text = "- StringToCase\n    # the text\n    String: 'a'\n    Case: TextCase.Upper\n";
    assert_eq!(
        format(text),
        "- StringToCase\n    # the text\n    String: \"a\"\n    Case: TextCase.Upper\n"
    );
}

#[test]
fn test_format_keeps_number_and_date_literals() {
    for text in [
        "Print 100000000000000000000.0",
        "Print 0.0000001",
        "Print 2020-01-02T10:00:00.123456",
        "Print 2020-01-02T10:00:00.250",
    ] {
        let formatted = format(text);
        assert_eq!(formatted, text);
        assert!(diagnostics(&formatted).is_empty(), "{:?} no longer compiles", formatted);
    }
}

#[test]
fn test_format_is_idempotent() {
    let sources = [
        "- <a> = [1, 2]\n- ForEach <a> (<x> => Print <x>)\n- Print (1 + 2)\n",
        "- <e> = (name: 'x', \"full name\": 'y')\n- Print $\"{<e>['name']}!\"",
        "If Condition: (1 == 1) Then: (Print 'yes') Else: (Print 'no')",
        "# note\n- StringToCase 'abc' TextCase.Upper\n",
        "- Print 100000000000000000000.0\n- Print 2020-01-02T10:00:00.123456\n",
        "- ForEach [1, 2] (<x> =>\n    # inner\n    - Print <x>\n)\n",
    ];
    for source in sources {
        let once = format(source);
        assert_eq!(format(&once), once, "formatting {:?} again changed it", source);
    }
}

#[test]
fn test_broken_document_is_not_formatted() {
    assert!(format_document("Print (1", &core_store(), FormattingOptions::default()).is_empty());
    assert!(format_document("Nope 1", &core_store(), FormattingOptions::default()).is_empty());
}

#[test]
fn test_format_line_endings() {
    assert_eq!(
        format("- Print 1\r\n- Print 2\r\n"),
        "- Print 1\r\n- Print 2\r\n"
    );
    let options = FormattingOptions {
        line_ending: LineEnding::Lf,
        ..FormattingOptions::default()
    };
    assert_eq!(
        format_with("- Print 1\r\n- Print 2\r\n", options),
        "- Print 1\n- Print 2\n"
    );
}

#[test]
fn test_text_edit_serializes_in_camel_case() {
    let edits = format_document("Print 1", &core_store(), FormattingOptions::default());
    let json = serde_json::to_value(&edits[0]).unwrap();
    assert_eq!(json["newText"], "Print 1");
    assert_eq!(json["range"]["end"]["character"], 7);
}
