//! Static types of steps and variables
//!
//! A [`TypeReference`] is what the binder knows about the value a step
//! produces. It is deliberately loose: `Any` and unresolved variable types
//! accept everything, integers widen to doubles, and a set of candidates that
//! cannot be narrowed to a single type is kept as `Multiple`.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::ir::VariableName;

/// Concrete value types
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SclType {
    String,
    Integer,
    Double,
    Bool,
    Date,
    Unit,
    Enum(String),
}

impl SclType {
    pub fn name(&self) -> &str {
        match self {
            SclType::String => "String",
            SclType::Integer => "Integer",
            SclType::Double => "Double",
            SclType::Bool => "Bool",
            SclType::Date => "DateTime",
            SclType::Unit => "Unit",
            SclType::Enum(name) => name,
        }
    }
}

/// Generic type constructors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum GenericBase {
    Array,
}

/// Known properties of an entity value
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntitySchema {
    pub properties: BTreeMap<String, TypeReference>,
}

impl EntitySchema {
    pub fn property(&self, name: &str) -> Option<&TypeReference> {
        self.properties
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, ty)| ty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TypeReference {
    Actual(SclType),
    Entity(Option<EntitySchema>),
    /// The type of a variable that has not been resolved yet
    Variable(VariableName),
    Generic(GenericBase, Vec<TypeReference>),
    Any,
    /// Candidates that could not be collapsed into one type
    Multiple(Vec<TypeReference>),
}

impl TypeReference {
    pub const STRING: TypeReference = TypeReference::Actual(SclType::String);
    pub const INTEGER: TypeReference = TypeReference::Actual(SclType::Integer);
    pub const DOUBLE: TypeReference = TypeReference::Actual(SclType::Double);
    pub const BOOL: TypeReference = TypeReference::Actual(SclType::Bool);
    pub const DATE: TypeReference = TypeReference::Actual(SclType::Date);
    pub const UNIT: TypeReference = TypeReference::Actual(SclType::Unit);
    pub const ENTITY: TypeReference = TypeReference::Entity(None);

    pub fn array_of(element: TypeReference) -> TypeReference {
        TypeReference::Generic(GenericBase::Array, vec![element])
    }

    pub fn enumeration(name: impl Into<String>) -> TypeReference {
        TypeReference::Actual(SclType::Enum(name.into()))
    }

    /// Element type of an array, `Any` for anything else
    pub fn element_type(&self) -> TypeReference {
        match self {
            TypeReference::Generic(GenericBase::Array, args) => {
                args.first().cloned().unwrap_or(TypeReference::Any)
            }
            _ => TypeReference::Any,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeReference::Generic(GenericBase::Array, _))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TypeReference::Actual(SclType::Integer) | TypeReference::Actual(SclType::Double)
        )
    }

    pub fn entity_schema(&self) -> Option<&EntitySchema> {
        match self {
            TypeReference::Entity(schema) => schema.as_ref(),
            _ => None,
        }
    }

    /// Whether a value of this type can be passed where `expected` is wanted
    ///
    /// Ambiguous `Multiple` values are never assignable; the binder reports
    /// them separately.
    pub fn is_assignable_to(&self, expected: &TypeReference) -> bool {
        use TypeReference::*;
        match (self, expected) {
            (_, Any) | (Any, _) => true,
            (Variable(_), _) | (_, Variable(_)) => true,
            (Multiple(_), _) => false,
            (actual, Multiple(options)) => options.iter().any(|o| actual.is_assignable_to(o)),
            (Actual(a), Actual(b)) => {
                a == b || (*a == SclType::Integer && *b == SclType::Double)
            }
            (Entity(_), Entity(None)) => true,
            (Entity(Some(actual)), Entity(Some(wanted))) => {
                wanted.properties.iter().all(|(key, ty)| {
                    actual
                        .property(key)
                        .is_some_and(|found| found.is_assignable_to(ty))
                })
            }
            (Entity(None), Entity(Some(_))) => true,
            (Generic(b1, args1), Generic(b2, args2)) => {
                b1 == b2
                    && args1.len() == args2.len()
                    && args1
                        .iter()
                        .zip(args2)
                        .all(|(a, e)| a.is_assignable_to(e))
            }
            _ => false,
        }
    }

    /// Narrow a set of candidate types to one
    ///
    /// `Any` is absorbed by anything more specific, integers widen to doubles,
    /// entities merge to a schemaless entity and arrays collapse element-wise.
    /// Returns the deduplicated candidates when no single type fits.
    pub fn collapse(candidates: &[TypeReference]) -> Result<TypeReference, Vec<TypeReference>> {
        let mut distinct: Vec<TypeReference> = Vec::new();
        for candidate in candidates {
            let flattened: Vec<TypeReference> = match candidate {
                TypeReference::Multiple(inner) => inner.clone(),
                other => vec![other.clone()],
            };
            for ty in flattened {
                if ty != TypeReference::Any && !distinct.contains(&ty) {
                    distinct.push(ty);
                }
            }
        }

        match distinct.len() {
            0 => return Ok(TypeReference::Any),
            1 => return Ok(distinct.remove(0)),
            _ => {}
        }

        if distinct.iter().all(|t| t.is_numeric()) {
            return Ok(TypeReference::DOUBLE);
        }
        if distinct.iter().all(|t| matches!(t, TypeReference::Entity(_))) {
            return Ok(TypeReference::ENTITY);
        }
        if distinct.iter().all(|t| t.is_array()) {
            let elements: Vec<TypeReference> = distinct.iter().map(|t| t.element_type()).collect();
            return match TypeReference::collapse(&elements) {
                Ok(element) => Ok(TypeReference::array_of(element)),
                Err(_) => Err(distinct),
            };
        }
        Err(distinct)
    }

    /// Collapse candidates, keeping them as `Multiple` when they conflict
    pub fn combine(candidates: &[TypeReference]) -> TypeReference {
        match TypeReference::collapse(candidates) {
            Ok(single) => single,
            Err(many) => TypeReference::Multiple(many),
        }
    }
}

impl fmt::Display for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeReference::Actual(t) => write!(f, "{}", t.name()),
            TypeReference::Entity(_) => write!(f, "Entity"),
            TypeReference::Variable(name) => write!(f, "typeof {}", name),
            TypeReference::Generic(GenericBase::Array, args) => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "Array<{}>", args.join(", "))
            }
            TypeReference::Any => write!(f, "Any"),
            TypeReference::Multiple(options) => {
                let options: Vec<String> = options.iter().map(|o| o.to_string()).collect();
                write!(f, "{}", options.join(" | "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreemap;

    #[test]
    fn test_integer_widens_to_double() {
        assert!(TypeReference::INTEGER.is_assignable_to(&TypeReference::DOUBLE));
        assert!(!TypeReference::DOUBLE.is_assignable_to(&TypeReference::INTEGER));
    }

    #[test]
    fn test_any_and_variables_accept_everything() {
        let var = TypeReference::Variable(VariableName::new("x"));
        assert!(TypeReference::STRING.is_assignable_to(&TypeReference::Any));
        assert!(TypeReference::Any.is_assignable_to(&TypeReference::INTEGER));
        assert!(var.is_assignable_to(&TypeReference::BOOL));
    }

    #[test]
    fn test_entity_with_schema_is_an_entity() {
        let schema = EntitySchema {
            properties: btreemap! { "a".to_string() => TypeReference::INTEGER },
        };
        let entity = TypeReference::Entity(Some(schema));
        assert!(entity.is_assignable_to(&TypeReference::ENTITY));
        assert!(!entity.is_assignable_to(&TypeReference::STRING));
    }

    #[test]
    fn test_arrays_compare_elementwise() {
        let ints = TypeReference::array_of(TypeReference::INTEGER);
        let strings = TypeReference::array_of(TypeReference::STRING);
        assert!(ints.is_assignable_to(&TypeReference::array_of(TypeReference::DOUBLE)));
        assert!(!strings.is_assignable_to(&ints));
        assert!(ints.is_assignable_to(&TypeReference::array_of(TypeReference::Any)));
    }

    #[test]
    fn test_collapse() {
        assert_eq!(
            TypeReference::collapse(&[TypeReference::INTEGER, TypeReference::DOUBLE]),
            Ok(TypeReference::DOUBLE)
        );
        assert_eq!(
            TypeReference::collapse(&[TypeReference::Any, TypeReference::STRING]),
            Ok(TypeReference::STRING)
        );
        assert_eq!(TypeReference::collapse(&[]), Ok(TypeReference::Any));
        assert!(TypeReference::collapse(&[TypeReference::STRING, TypeReference::BOOL]).is_err());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(
            TypeReference::array_of(TypeReference::INTEGER).to_string(),
            "Array<Integer>"
        );
        assert_eq!(TypeReference::enumeration("TextCase").to_string(), "TextCase");
        assert_eq!(
            TypeReference::Multiple(vec![TypeReference::STRING, TypeReference::BOOL]).to_string(),
            "String | Bool"
        );
    }
}
