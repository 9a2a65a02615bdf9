//! Built-in steps

use std::collections::BTreeMap;

use super::{
    EnumDescriptor, ParameterDescriptor, SerializationForm, StepFactory, StepFactoryStore,
    StepFactoryStoreBuilder,
};
use crate::errors::ErrorList;
use crate::freeze::{BoundArgument, BoundArguments, TypeResolver};
use crate::ir::{ConstantValue, VariableName};
use crate::types::{EntitySchema, TypeReference};

type InferFn = fn(&BoundArguments, &TypeResolver) -> TypeReference;
type LambdaTypeFn = fn(&ParameterDescriptor, &BoundArguments) -> TypeReference;
type BindsFn = fn(&BoundArguments) -> Vec<(VariableName, TypeReference)>;

/// A step described by data plus a few typing hooks
#[derive(Debug, Clone)]
pub struct CoreStep {
    name: &'static str,
    aliases: Vec<&'static str>,
    summary: &'static str,
    parameters: Vec<ParameterDescriptor>,
    output: TypeReference,
    form: SerializationForm,
    infer: Option<InferFn>,
    lambda_type: Option<LambdaTypeFn>,
    binds: Option<BindsFn>,
    extra_named: bool,
}

impl CoreStep {
    pub fn new(name: &'static str, summary: &'static str, output: TypeReference) -> Self {
        Self {
            name,
            aliases: Vec::new(),
            summary,
            parameters: Vec::new(),
            output,
            form: SerializationForm::Function,
            infer: None,
            lambda_type: None,
            binds: None,
            extra_named: false,
        }
    }

    pub fn alias(mut self, alias: &'static str) -> Self {
        self.aliases.push(alias);
        self
    }

    pub fn parameter(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn form(mut self, form: SerializationForm) -> Self {
        self.form = form;
        self
    }

    pub fn infer(mut self, infer: InferFn) -> Self {
        self.infer = Some(infer);
        self
    }

    pub fn lambda_type(mut self, lambda_type: LambdaTypeFn) -> Self {
        self.lambda_type = Some(lambda_type);
        self
    }

    pub fn binds(mut self, binds: BindsFn) -> Self {
        self.binds = Some(binds);
        self
    }

    pub fn extra_named_arguments(mut self) -> Self {
        self.extra_named = true;
        self
    }
}

impl StepFactory for CoreStep {
    fn type_name(&self) -> &str {
        self.name
    }

    fn names(&self) -> Vec<&str> {
        let mut names = vec![self.name];
        names.extend(self.aliases.iter().copied());
        names
    }

    fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    fn summary(&self) -> &str {
        self.summary
    }

    fn declared_output_type(&self) -> TypeReference {
        self.output.clone()
    }

    fn infer_output_type(
        &self,
        arguments: &BoundArguments,
        resolver: &TypeResolver,
    ) -> Result<TypeReference, ErrorList> {
        Ok(match self.infer {
            Some(infer) => infer(arguments, resolver),
            None => self.output.clone(),
        })
    }

    fn lambda_variable_type(
        &self,
        parameter: &ParameterDescriptor,
        arguments: &BoundArguments,
    ) -> TypeReference {
        match self.lambda_type {
            Some(lambda_type) => lambda_type(parameter, arguments),
            None => TypeReference::Any,
        }
    }

    fn bound_variables(&self, arguments: &BoundArguments) -> Vec<(VariableName, TypeReference)> {
        match self.binds {
            Some(binds) => binds(arguments),
            None => Vec::new(),
        }
    }

    fn accepts_extra_named_arguments(&self) -> bool {
        self.extra_named
    }

    fn serialization_form(&self) -> SerializationForm {
        self.form
    }
}

/* ===================== Typing hooks ===================== */

fn argument_type(arguments: &BoundArguments, name: &str) -> TypeReference {
    arguments
        .get(name)
        .map(|a| a.output_type())
        .unwrap_or(TypeReference::Any)
}

fn variable_argument(arguments: &BoundArguments) -> Option<&VariableName> {
    match arguments.get("Variable") {
        Some(BoundArgument::Variable { name, .. }) => Some(name),
        _ => None,
    }
}

fn infer_get_variable(arguments: &BoundArguments, resolver: &TypeResolver) -> TypeReference {
    match variable_argument(arguments) {
        Some(name) => resolver
            .latest(name)
            .cloned()
            .unwrap_or_else(|| TypeReference::Variable(name.clone())),
        None => TypeReference::Any,
    }
}

fn binds_set_variable(arguments: &BoundArguments) -> Vec<(VariableName, TypeReference)> {
    match variable_argument(arguments) {
        Some(name) => vec![(name.clone(), argument_type(arguments, "Value"))],
        None => Vec::new(),
    }
}

fn infer_array(arguments: &BoundArguments, _: &TypeResolver) -> TypeReference {
    match arguments.get("Elements") {
        Some(BoundArgument::StepList(steps)) => {
            let types: Vec<TypeReference> = steps.iter().map(|s| s.output_type.clone()).collect();
            TypeReference::array_of(TypeReference::combine(&types))
        }
        _ => TypeReference::array_of(TypeReference::Any),
    }
}

fn infer_entity(arguments: &BoundArguments, _: &TypeResolver) -> TypeReference {
    let properties: BTreeMap<String, TypeReference> = arguments
        .iter()
        .map(|(key, value)| (key.clone(), value.output_type()))
        .collect();
    TypeReference::Entity(Some(EntitySchema { properties }))
}

fn infer_entity_get_value(arguments: &BoundArguments, _: &TypeResolver) -> TypeReference {
    let entity = argument_type(arguments, "Entity");
    let property = match arguments.get("Property") {
        Some(BoundArgument::Step(step)) => match step.constant() {
            Some(ConstantValue::String(name)) => Some(name.clone()),
            _ => None,
        },
        _ => None,
    };
    match (entity.entity_schema(), property) {
        (Some(schema), Some(property)) => {
            schema.property(&property).cloned().unwrap_or(TypeReference::Any)
        }
        _ => TypeReference::Any,
    }
}

fn infer_element(arguments: &BoundArguments, _: &TypeResolver) -> TypeReference {
    argument_type(arguments, "Array").element_type()
}

fn lambda_element_type(_: &ParameterDescriptor, arguments: &BoundArguments) -> TypeReference {
    argument_type(arguments, "Array").element_type()
}

fn infer_if(arguments: &BoundArguments, _: &TypeResolver) -> TypeReference {
    let then = argument_type(arguments, "Then");
    match arguments.get("Else") {
        Some(otherwise) => TypeReference::combine(&[then, otherwise.output_type()]),
        None => then,
    }
}

/// Integer when every term is an integer, double otherwise
fn infer_arithmetic(arguments: &BoundArguments, _: &TypeResolver) -> TypeReference {
    if argument_type(arguments, "Terms").element_type() == TypeReference::INTEGER {
        TypeReference::INTEGER
    } else {
        TypeReference::DOUBLE
    }
}

/* ===================== Catalog ===================== */

fn infix(
    name: &'static str,
    symbol: &'static str,
    summary: &'static str,
    element: TypeReference,
    output: TypeReference,
) -> CoreStep {
    CoreStep::new(name, summary, output)
        .form(SerializationForm::Infix(symbol))
        .parameter(
            ParameterDescriptor::step("Terms", TypeReference::array_of(element))
                .ordered(1)
                .required()
                .summary("The values to combine"),
        )
}

fn arithmetic(name: &'static str, symbol: &'static str, summary: &'static str) -> CoreStep {
    infix(name, symbol, summary, TypeReference::DOUBLE, TypeReference::DOUBLE).infer(infer_arithmetic)
}

fn comparison(name: &'static str, symbol: &'static str, summary: &'static str) -> CoreStep {
    infix(name, symbol, summary, TypeReference::Any, TypeReference::BOOL)
}

/// Every built-in step
pub fn core_steps() -> Vec<CoreStep> {
    vec![
        CoreStep::new("Sequence", "Run each step in order.", TypeReference::UNIT)
            .form(SerializationForm::Sequence)
            .parameter(
                ParameterDescriptor::step_list("Steps", TypeReference::Any)
                    .ordered(1)
                    .required()
                    .summary("The steps to run"),
            ),
        CoreStep::new("SetVariable", "Store a value in a variable.", TypeReference::UNIT)
            .form(SerializationForm::SetVariable)
            .parameter(
                ParameterDescriptor::variable("Variable")
                    .ordered(1)
                    .required()
                    .summary("The variable to set"),
            )
            .parameter(
                ParameterDescriptor::step("Value", TypeReference::Any)
                    .ordered(2)
                    .required()
                    .summary("The value to store"),
            )
            .binds(binds_set_variable),
        CoreStep::new("GetVariable", "Read the value of a variable.", TypeReference::Any)
            .form(SerializationForm::GetVariable)
            .parameter(
                ParameterDescriptor::variable("Variable")
                    .ordered(1)
                    .required()
                    .summary("The variable to read"),
            )
            .infer(infer_get_variable),
        CoreStep::new(
            "ArrayNew",
            "Create an array from its elements.",
            TypeReference::array_of(TypeReference::Any),
        )
        .alias("Array")
        .form(SerializationForm::Array)
        .parameter(
            ParameterDescriptor::step_list("Elements", TypeReference::Any)
                .ordered(1)
                .required()
                .summary("The elements of the array"),
        )
        .infer(infer_array),
        CoreStep::new("CreateEntity", "Create an entity from named values.", TypeReference::ENTITY)
            .form(SerializationForm::Entity)
            .extra_named_arguments()
            .infer(infer_entity),
        CoreStep::new("EntityGetValue", "Get the value of an entity property.", TypeReference::Any)
            .form(SerializationForm::EntityGetValue)
            .parameter(
                ParameterDescriptor::step("Entity", TypeReference::ENTITY)
                    .ordered(1)
                    .required()
                    .summary("The entity to read from"),
            )
            .parameter(
                ParameterDescriptor::step("Property", TypeReference::STRING)
                    .ordered(2)
                    .required()
                    .summary("The name of the property"),
            )
            .infer(infer_entity_get_value),
        CoreStep::new("ElementAtIndex", "Get the element of an array at an index.", TypeReference::Any)
            .form(SerializationForm::ElementAtIndex)
            .parameter(
                ParameterDescriptor::step("Array", TypeReference::array_of(TypeReference::Any))
                    .ordered(1)
                    .required()
                    .summary("The array to read from"),
            )
            .parameter(
                ParameterDescriptor::step("Index", TypeReference::INTEGER)
                    .ordered(2)
                    .required()
                    .summary("The zero-based index"),
            )
            .infer(infer_element),
        CoreStep::new("ArrayLength", "Count the elements of an array.", TypeReference::INTEGER)
            .parameter(
                ParameterDescriptor::step("Array", TypeReference::array_of(TypeReference::Any))
                    .ordered(1)
                    .required()
                    .summary("The array to count"),
            ),
        CoreStep::new("StringInterpolate", "Join text and values into one string.", TypeReference::STRING)
            .form(SerializationForm::Interpolation)
            .parameter(
                ParameterDescriptor::step_list("Strings", TypeReference::Any)
                    .ordered(1)
                    .required()
                    .summary("The pieces to join"),
            ),
        CoreStep::new("StringLength", "Count the characters of a string.", TypeReference::INTEGER)
            .parameter(
                ParameterDescriptor::step("String", TypeReference::STRING)
                    .ordered(1)
                    .required()
                    .summary("The string to measure"),
            ),
        CoreStep::new("StringToCase", "Change the case of a string.", TypeReference::STRING)
            .parameter(
                ParameterDescriptor::step("String", TypeReference::STRING)
                    .ordered(1)
                    .required()
                    .summary("The string to change"),
            )
            .parameter(
                ParameterDescriptor::step("Case", TypeReference::enumeration("TextCase"))
                    .ordered(2)
                    .required()
                    .summary("The case to change to"),
            ),
        CoreStep::new("Print", "Write a value to the output.", TypeReference::UNIT)
            .alias("Log")
            .parameter(
                ParameterDescriptor::step("Value", TypeReference::Any)
                    .ordered(1)
                    .required()
                    .summary("The value to write"),
            ),
        CoreStep::new("ForEach", "Run an action for every element of an array.", TypeReference::UNIT)
            .parameter(
                ParameterDescriptor::step("Array", TypeReference::array_of(TypeReference::Any))
                    .ordered(1)
                    .required()
                    .summary("The elements to iterate over"),
            )
            .parameter(
                ParameterDescriptor::lambda("Action")
                    .ordered(2)
                    .required()
                    .summary("The action to run for each element"),
            )
            .lambda_type(lambda_element_type),
        CoreStep::new("If", "Choose between two steps.", TypeReference::Any)
            .parameter(
                ParameterDescriptor::step("Condition", TypeReference::BOOL)
                    .ordered(1)
                    .required()
                    .summary("Whether to run Then"),
            )
            .parameter(
                ParameterDescriptor::step("Then", TypeReference::Any)
                    .ordered(2)
                    .required()
                    .summary("Run when the condition is true"),
            )
            .parameter(
                ParameterDescriptor::step("Else", TypeReference::Any)
                    .ordered(3)
                    .summary("Run when the condition is false"),
            )
            .infer(infer_if),
        CoreStep::new("Not", "Negate a boolean.", TypeReference::BOOL).parameter(
            ParameterDescriptor::step("Boolean", TypeReference::BOOL)
                .ordered(1)
                .required()
                .summary("The value to negate"),
        ),
        arithmetic("Sum", "+", "Add numbers together."),
        arithmetic("Subtract", "-", "Subtract numbers from the first."),
        arithmetic("Product", "*", "Multiply numbers together."),
        arithmetic("Divide", "/", "Divide the first number by the rest."),
        arithmetic("Modulo", "%", "Remainder after dividing the first number by the rest."),
        arithmetic("Power", "^", "Raise the first number to the power of the rest."),
        infix("And", "&&", "True when every term is true.", TypeReference::BOOL, TypeReference::BOOL),
        infix("Or", "||", "True when any term is true.", TypeReference::BOOL, TypeReference::BOOL),
        comparison("Equals", "==", "True when every term is equal."),
        comparison("NotEquals", "!=", "True when the terms are not all equal."),
        comparison("LessThan", "<", "True when each term is less than the next."),
        comparison("LessThanOrEqual", "<=", "True when each term is at most the next."),
        comparison("GreaterThan", ">", "True when each term is greater than the next."),
        comparison("GreaterThanOrEqual", ">=", "True when each term is at least the next."),
    ]
}

/// Enums the built-in steps use
pub fn core_enums() -> Vec<EnumDescriptor> {
    vec![EnumDescriptor::new(
        "TextCase",
        &["Upper", "Lower", "Title"],
        "Letter case of a string",
    )]
}

pub fn register_core_steps(builder: StepFactoryStoreBuilder) -> StepFactoryStoreBuilder {
    let builder = core_steps().into_iter().fold(builder, |b, step| b.register(step));
    core_enums().into_iter().fold(builder, |b, e| b.register_enum(e))
}

/// A store holding only the built-in steps
pub fn core_store() -> StepFactoryStore {
    register_core_steps(StepFactoryStore::builder()).build()
}
