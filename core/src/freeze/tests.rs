//! Tests for freezing and variable type resolution

use super::*;
use crate::ir::visit;
use crate::parser::{parse, split_commands};
use crate::position::LinePosition;
use crate::steps::core_store;

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse, visit and freeze source against the built-in steps
fn freeze_text(source: &str) -> (Result<BoundStep, ErrorList>, TypeResolver) {
    let output = parse(source);
    assert!(output.is_ok(), "unexpected syntax errors: {:?}", output.errors);
    let property = visit(&output.root).expect("visit should succeed");
    let mut resolver = TypeResolver::new();
    let result = freeze_property(&property, &core_store(), &mut resolver);
    (result, resolver)
}

fn frozen(source: &str) -> BoundStep {
    freeze_text(source).0.expect("freeze should succeed")
}

fn freeze_errors(source: &str) -> Vec<ErrorKind> {
    match freeze_text(source).0 {
        Ok(step) => panic!("expected errors, froze to {:?}", step),
        Err(errors) => errors.into_iter().map(|e| e.kind).collect(),
    }
}

fn var(name: &str) -> VariableName {
    VariableName::new(name)
}

// ============================================================================
// Name and parameter resolution
// ============================================================================

#[test]
fn test_unknown_step() {
    assert_eq!(
        freeze_errors("Frobnicate 1"),
        vec![ErrorKind::UnknownStep("Frobnicate".to_string())]
    );
}

#[test]
fn test_step_names_are_case_insensitive() {
    let step = frozen("print 1");
    assert_eq!(step.name(), Some("Print"));
    assert!(step.argument("Value").is_some());
}

#[test]
fn test_unknown_parameter_and_missing_required() {
    assert_eq!(
        freeze_errors("Print Text: 1"),
        vec![
            ErrorKind::UnknownParameter {
                step: "Print".to_string(),
                parameter: "Text".to_string()
            },
            ErrorKind::MissingRequiredParameter {
                step: "Print".to_string(),
                parameter: "Value".to_string()
            },
        ]
    );
}

#[test]
fn test_positional_and_named_for_the_same_parameter() {
    assert_eq!(
        freeze_errors("Print 1 Value: 2"),
        vec![ErrorKind::DuplicateParameter {
            step: "Print".to_string(),
            parameter: "Value".to_string()
        }]
    );
}

#[test]
fn test_errors_from_independent_steps_are_collected() {
    let errors = freeze_errors("- StringLength 1\n- Frobnicate\n- Print 'fine'");
    assert_eq!(errors.len(), 2);
    assert!(matches!(errors[0], ErrorKind::TypeMismatch { .. }));
    assert_eq!(errors[1], ErrorKind::UnknownStep("Frobnicate".to_string()));
}

// ============================================================================
// Argument kinds
// ============================================================================

#[test]
fn test_variable_parameter_needs_a_variable() {
    assert_eq!(
        freeze_errors("GetVariable 1"),
        vec![ErrorKind::ExpectedVariable {
            step: "GetVariable".to_string(),
            parameter: "Variable".to_string()
        }]
    );
}

#[test]
fn test_lambda_where_a_step_is_expected() {
    assert_eq!(
        freeze_errors("Print (<x> => 1)"),
        vec![ErrorKind::UnexpectedLambda {
            step: "Print".to_string(),
            parameter: "Value".to_string()
        }]
    );
}

#[test]
fn test_top_level_lambda_is_unbound() {
    assert_eq!(freeze_errors("(<x> => 1)"), vec![ErrorKind::UnboundLambda]);
}

// ============================================================================
// Types
// ============================================================================

#[test]
fn test_type_mismatch() {
    assert_eq!(
        freeze_errors("StringLength 1"),
        vec![ErrorKind::TypeMismatch {
            step: "StringLength".to_string(),
            parameter: "String".to_string(),
            expected: "String".to_string(),
            actual: "Integer".to_string()
        }]
    );
}

#[test]
fn test_arithmetic_output_types() {
    assert_eq!(frozen("1 + 2").output_type, TypeReference::INTEGER);
    assert_eq!(frozen("1 + 2.5").output_type, TypeReference::DOUBLE);
    assert!(matches!(
        freeze_errors("1 + 'a'")[0],
        ErrorKind::TypeMismatch { .. }
    ));
}

#[test]
fn test_ambiguous_branch_types() {
    let errors = freeze_errors("StringLength (If true 'a' 1)");
    assert_eq!(
        errors,
        vec![ErrorKind::AmbiguousType {
            step: "StringLength".to_string(),
            parameter: "String".to_string(),
            candidates: "String, Integer".to_string()
        }]
    );
    // Nothing is expected of a statement, so the same step is fine on its own
    assert!(freeze_text("If true 'a' 1").0.is_ok());
}

#[test]
fn test_enum_members() {
    let step = frozen("StringToCase 'a' textcase.upper");
    let case = step.argument("Case").and_then(|a| a.as_step()).unwrap();
    assert_eq!(
        case.constant(),
        Some(&ConstantValue::Enum {
            enum_type: "TextCase".to_string(),
            member: "Upper".to_string()
        })
    );

    assert_eq!(
        freeze_errors("StringToCase 'a' TextCase.Shouting"),
        vec![ErrorKind::UnknownEnumMember {
            enum_type: "TextCase".to_string(),
            member: "Shouting".to_string()
        }]
    );
    assert_eq!(
        freeze_errors("StringToCase 'a' Colour.Red"),
        vec![ErrorKind::UnknownEnum("Colour".to_string())]
    );
}

#[test]
fn test_entity_schema_and_property_access() {
    let step = frozen("- <e> = (count: 1, label: 'x')\n- <e>['label'] | StringLength");
    assert!(step.name() == Some("Sequence"));

    let (_, resolver) = freeze_text("- <e> = (count: 1, label: 'x')");
    let entity = resolver.latest(&var("e")).expect("e is bound");
    let schema = entity.entity_schema().expect("entity has a schema");
    assert_eq!(schema.property("COUNT"), Some(&TypeReference::INTEGER));

    assert!(matches!(
        freeze_errors("- <e> = (count: 1)\n- <e>['count'] | StringLength")[0],
        ErrorKind::TypeMismatch { .. }
    ));
}

// ============================================================================
// Variables
// ============================================================================

#[test]
fn test_set_variable_records_type() {
    let (result, resolver) = freeze_text("- <x> = 'a'\n- <y> = [1, 2]");
    assert!(result.is_ok());
    assert_eq!(resolver.latest(&var("x")), Some(&TypeReference::STRING));
    assert_eq!(
        resolver.latest(&var("y")),
        Some(&TypeReference::array_of(TypeReference::INTEGER))
    );
}

#[test]
fn test_get_variable_uses_recorded_type() {
    let step = frozen("- <x> = 'a'\n- StringLength <x>");
    assert_eq!(step.name(), Some("Sequence"));
    assert!(matches!(
        freeze_errors("- <x> = 1\n- StringLength <x>")[0],
        ErrorKind::TypeMismatch { .. }
    ));
}

#[test]
fn test_unknown_variables_are_not_errors() {
    let step = frozen("StringLength <never>");
    let value = step.argument("String").and_then(|a| a.as_step()).unwrap();
    assert_eq!(value.output_type, TypeReference::Variable(var("never")));
}

#[test]
fn test_lambda_variable_is_typed_from_the_array() {
    let (result, resolver) = freeze_text("ForEach ['a', 'b'] (<s> => Print <s>)");
    let step = result.expect("freeze should succeed");
    assert_eq!(resolver.latest(&var("s")), Some(&TypeReference::STRING));
    assert!(matches!(
        step.argument("Action"),
        Some(BoundArgument::Lambda { implicit: false, .. })
    ));
}

#[test]
fn test_plain_step_becomes_lambda_over_item() {
    let (result, resolver) = freeze_text("ForEach [1, 2] (StringLength <item>)");
    assert!(matches!(
        result.unwrap_err().kinds()[0],
        ErrorKind::TypeMismatch { .. }
    ));
    assert_eq!(resolver.latest(&var("item")), Some(&TypeReference::INTEGER));

    let step = frozen("ForEach ['a'] (StringLength <item>)");
    assert!(matches!(
        step.argument("Action"),
        Some(BoundArgument::Lambda { implicit: true, .. })
    ));
}

// ============================================================================
// Type resolver
// ============================================================================

#[test]
fn test_resolver_follows_command_order() {
    let text = "- <Foo> = 1\n- <Bar> = <Foo>\n- Print <Bar>";
    let resolver = TypeResolver::for_commands(&split_commands(text), &core_store());
    assert_eq!(
        resolver.type_at(&var("Bar"), LinePosition::new(2, 8)),
        Some(&TypeReference::INTEGER)
    );
    assert_eq!(
        resolver.type_at(&var("Foo"), LinePosition::new(1, 2)),
        Some(&TypeReference::INTEGER)
    );
}

#[test]
fn test_type_at_uses_most_recent_definition_before_position() {
    let text = "- <x> = 1\n- <x> = 'a'\n- Print <x>";
    let resolver = TypeResolver::for_commands(&split_commands(text), &core_store());
    assert_eq!(resolver.definitions(&var("x")).len(), 2);
    assert_eq!(
        resolver.type_at(&var("x"), LinePosition::new(0, 9)),
        Some(&TypeReference::INTEGER)
    );
    assert_eq!(
        resolver.type_at(&var("x"), LinePosition::new(2, 8)),
        Some(&TypeReference::STRING)
    );
    // Before every definition, the latest one is used
    assert_eq!(
        resolver.type_at(&var("x"), LinePosition::new(0, 0)),
        Some(&TypeReference::STRING)
    );
    assert_eq!(resolver.type_at(&var("missing"), LinePosition::new(0, 0)), None);
}

#[test]
fn test_broken_commands_keep_earlier_variables() {
    let text = "- <a> = 1\n- <b> = 'x'\n- Print (\n- StringLength";
    let resolver = TypeResolver::for_commands(&split_commands(text), &core_store());
    assert_eq!(resolver.latest(&var("a")), Some(&TypeReference::INTEGER));
    assert_eq!(resolver.latest(&var("b")), Some(&TypeReference::STRING));
}

#[test]
fn test_lazy_resolver_builds_on_first_use() {
    let store = core_store();
    let commands = split_commands("- <a> = 1\n- Print <a>");
    let lazy = LazyTypeResolver::new(&commands, &store);
    assert!(!lazy.is_resolved());
    assert_eq!(lazy.get().latest(&var("a")), Some(&TypeReference::INTEGER));
    assert!(lazy.is_resolved());
    assert!(std::ptr::eq(lazy.get(), lazy.get()));
}
