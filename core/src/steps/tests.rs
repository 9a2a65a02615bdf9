//! Tests for step factories and the store

use super::stdlib::CoreStep;
use super::*;

// ============================================================================
// Helper Functions
// ============================================================================

fn parameter<'a>(step: &'a Arc<dyn StepFactory>, name: &str) -> &'a ParameterDescriptor {
    step.find_parameter(&ParameterRef::Named(name.to_string()))
        .unwrap_or_else(|| panic!("{} has no parameter {}", step.type_name(), name))
}

// ============================================================================
// Store lookups
// ============================================================================

#[test]
fn test_lookup_is_case_insensitive_and_includes_aliases() {
    let store = core_store();
    let print = store.get("print").expect("Print is registered");
    assert_eq!(print.type_name(), "Print");
    let log = store.get("LOG").expect("Log is an alias");
    assert!(Arc::ptr_eq(print, log));
    assert!(store.get("Missing").is_none());
}

#[test]
fn test_enum_lookup() {
    let store = core_store();
    let text_case = store.get_enum("textcase").expect("TextCase is registered");
    assert_eq!(text_case.member("upper"), Some("Upper"));
    assert_eq!(text_case.member("Shouting"), None);
}

#[test]
fn test_factories_keep_registration_order() {
    let store = core_store();
    let names: Vec<&str> = store.factories().take(3).map(|f| f.type_name()).collect();
    assert_eq!(names, vec!["Sequence", "SetVariable", "GetVariable"]);
    assert_eq!(store.len(), store.factories().count());
}

#[test]
fn test_later_registration_wins() {
    let store = StepFactoryStore::builder()
        .register(CoreStep::new("Print", "first", TypeReference::UNIT))
        .register(CoreStep::new("Print", "second", TypeReference::UNIT))
        .build();
    assert_eq!(store.get("Print").map(|f| f.summary()), Some("second"));
}

// ============================================================================
// Parameters
// ============================================================================

#[test]
fn test_find_parameter_by_position_and_name() {
    let store = core_store();
    let to_case = store.get("StringToCase").unwrap();
    assert_eq!(
        to_case
            .find_parameter(&ParameterRef::Index(2))
            .map(|p| p.name.as_str()),
        Some("Case")
    );
    assert_eq!(parameter(to_case, "string").name, "String");
    assert!(to_case.find_parameter(&ParameterRef::Index(3)).is_none());
}

#[test]
fn test_parameter_aliases() {
    let descriptor = ParameterDescriptor::step("Value", TypeReference::Any).alias("Message");
    assert!(descriptor.matches_name("message"));
    assert!(descriptor.matches_name("VALUE"));
    assert!(!descriptor.matches_name("Text"));
}

#[test]
fn test_display_types() {
    let store = core_store();
    assert_eq!(parameter(store.get("Sequence").unwrap(), "Steps").display_type(), "Array<Any>");
    assert_eq!(parameter(store.get("ForEach").unwrap(), "Action").display_type(), "Lambda");
    assert_eq!(
        parameter(store.get("SetVariable").unwrap(), "Variable").display_type(),
        "VariableName"
    );
    assert_eq!(
        parameter(store.get("StringToCase").unwrap(), "Case").display_type(),
        "TextCase"
    );
}

#[test]
fn test_infix_steps_serialize_as_operators() {
    let store = core_store();
    for (name, symbol) in [("Sum", "+"), ("And", "&&"), ("GreaterThanOrEqual", ">=")] {
        let factory = store.get(name).unwrap();
        assert_eq!(factory.serialization_form(), SerializationForm::Infix(symbol));
        assert!(parameter(factory, "Terms").required);
    }
}

#[test]
fn test_only_create_entity_accepts_extra_names() {
    let store = core_store();
    let extra: Vec<&str> = store
        .factories()
        .filter(|f| f.accepts_extra_named_arguments())
        .map(|f| f.type_name())
        .collect();
    assert_eq!(extra, vec!["CreateEntity"]);
}
