//! Type model
//!
//! The policy/product type model identifiers are resolved against: model
//! types with their attributes and associations, enum types, and the
//! formal parameters of a formula. The model is built once (usually by
//! [`loader::ModelLoader`]) and then only read, so one `Arc<TypeModel>` can
//! serve any number of compilations on any number of threads.

pub mod loader;

use fl_types::Datatype;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

// =============================================================================
// MODEL ELEMENTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Policy,
    Product,
}

/// A policy or product component type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelType {
    pub name: String,
    pub kind: TypeKind,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub supertype: Option<String>,
    /// Policy types only: the product type configuring instances of this type
    #[serde(default)]
    pub configured_by: Option<String>,
    #[serde(default)]
    pub attributes: Vec<ModelAttribute>,
    #[serde(default)]
    pub associations: Vec<ModelAssociation>,
}

impl ModelType {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            package: None,
            supertype: None,
            configured_by: None,
            attributes: Vec::new(),
            associations: Vec::new(),
        }
    }

    pub fn policy(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Policy)
    }

    pub fn product(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Product)
    }

    pub fn with_supertype(mut self, supertype: impl Into<String>) -> Self {
        self.supertype = Some(supertype.into());
        self
    }

    pub fn configured_by(mut self, product_type: impl Into<String>) -> Self {
        self.configured_by = Some(product_type.into());
        self
    }

    pub fn with_attribute(mut self, attribute: ModelAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_association(mut self, association: ModelAssociation) -> Self {
        self.associations.push(association);
        self
    }

    /// Datatype of a (non-generation) value of this type
    pub fn datatype(&self) -> Datatype {
        match self.kind {
            TypeKind::Policy => Datatype::policy(&self.name),
            TypeKind::Product => Datatype::product(&self.name),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&ModelAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn association(&self, name: &str) -> Option<&ModelAssociation> {
        self.associations.iter().find(|a| a.matches(name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAttribute {
    pub name: String,
    /// Datatype name as written in the model: `Decimal`, `Money`, an enum type name...
    pub datatype: String,
    /// Product attributes: value lives in the time-sliced generation
    #[serde(default)]
    pub changing_over_time: bool,
    #[serde(default)]
    pub multi_valued: bool,
    /// Policy attributes: the product generation carries a default value
    #[serde(default)]
    pub product_relevant: bool,
}

impl ModelAttribute {
    pub fn new(name: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            datatype: datatype.into(),
            changing_over_time: false,
            multi_valued: false,
            product_relevant: false,
        }
    }

    pub fn changing_over_time(mut self) -> Self {
        self.changing_over_time = true;
        self
    }

    pub fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    pub fn product_relevant(mut self) -> Self {
        self.product_relevant = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAssociation {
    /// Target role, singular
    pub name: String,
    /// Target role, plural. Defaults to `name` + "s"
    #[serde(default)]
    pub plural: Option<String>,
    pub target: String,
    #[serde(default)]
    pub to_many: bool,
    /// Targets can be selected by the id of their configuring product component
    #[serde(default)]
    pub qualified: bool,
    /// Product associations only: the link lives in the generation
    #[serde(default)]
    pub changing_over_time: bool,
}

impl ModelAssociation {
    pub fn to_one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            plural: None,
            target: target.into(),
            to_many: false,
            qualified: false,
            changing_over_time: false,
        }
    }

    pub fn to_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            to_many: true,
            ..Self::to_one(name, target)
        }
    }

    pub fn qualified(mut self) -> Self {
        self.qualified = true;
        self
    }

    pub fn changing_over_time(mut self) -> Self {
        self.changing_over_time = true;
        self
    }

    pub fn with_plural(mut self, plural: impl Into<String>) -> Self {
        self.plural = Some(plural.into());
        self
    }

    pub fn plural_name(&self) -> String {
        self.plural
            .clone()
            .unwrap_or_else(|| format!("{}s", self.name))
    }

    /// Formulas may name an association by either target role
    pub fn matches(&self, name: &str) -> bool {
        self.name == name || (self.to_many && self.plural_name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumType {
    pub name: String,
    #[serde(default)]
    pub package: Option<String>,
    pub values: Vec<String>,
    /// Values come from runtime enum content instead of a fixed Java enum
    #[serde(default)]
    pub extensible: bool,
}

impl EnumType {
    pub fn new(name: impl Into<String>, values: &[&str]) -> Self {
        Self {
            name: name.into(),
            package: None,
            values: values.iter().map(|v| v.to_string()).collect(),
            extensible: false,
        }
    }

    pub fn extensible(mut self) -> Self {
        self.extensible = true;
        self
    }

    pub fn has_value(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }

    pub fn qualified_name(&self) -> Option<String> {
        self.package
            .as_ref()
            .map(|p| format!("{}.{}", p, self.name))
    }
}

/// Formal parameter of a formula
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub datatype: Datatype,
}

impl Parameter {
    pub fn new(name: impl Into<String>, datatype: Datatype) -> Result<Self, ModelError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ModelError::EmptyParameterName);
        }
        Ok(Self { name, datatype })
    }
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("duplicate type '{0}'")]
    DuplicateType(String),

    #[error("duplicate enum type '{0}'")]
    DuplicateEnum(String),

    #[error("parameter name must not be empty")]
    EmptyParameterName,

    #[error("invalid model:\n  {}", .0.join("\n  "))]
    Invalid(Vec<String>),
}

// =============================================================================
// TYPE MODEL
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeModel {
    types: BTreeMap<String, ModelType>,
    enums: BTreeMap<String, EnumType>,
}

impl TypeModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_type(&mut self, model_type: ModelType) -> Result<(), ModelError> {
        if self.types.contains_key(&model_type.name) || self.enums.contains_key(&model_type.name) {
            return Err(ModelError::DuplicateType(model_type.name));
        }
        self.types.insert(model_type.name.clone(), model_type);
        Ok(())
    }

    pub fn add_enum(&mut self, enum_type: EnumType) -> Result<(), ModelError> {
        if self.enums.contains_key(&enum_type.name) || self.types.contains_key(&enum_type.name) {
            return Err(ModelError::DuplicateEnum(enum_type.name));
        }
        self.enums.insert(enum_type.name.clone(), enum_type);
        Ok(())
    }

    pub fn find_type(&self, name: &str) -> Option<&ModelType> {
        self.types.get(name)
    }

    pub fn find_enum(&self, name: &str) -> Option<&EnumType> {
        self.enums.get(name)
    }

    pub fn types(&self) -> impl Iterator<Item = &ModelType> {
        self.types.values()
    }

    pub fn enums(&self) -> impl Iterator<Item = &EnumType> {
        self.enums.values()
    }

    /// Resolve a datatype name as written in the model
    pub fn resolve_datatype(&self, name: &str) -> Option<Datatype> {
        let name = name.trim();
        if let Some(inner) = name
            .strip_prefix("List<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            return self.resolve_datatype(inner).map(Datatype::list_of);
        }
        if let Some(value_type) = Datatype::value_datatype(name) {
            return Some(value_type);
        }
        if self.enums.contains_key(name) {
            return Some(Datatype::enumeration(name));
        }
        self.types.get(name).map(ModelType::datatype)
    }

    /// The type itself followed by its supertypes, stopping at a cycle or an unknown name
    pub fn supertype_chain(&self, name: &str) -> Vec<&ModelType> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.types.get(name);
        while let Some(model_type) = current {
            if !seen.insert(model_type.name.as_str()) {
                break;
            }
            chain.push(model_type);
            current = model_type
                .supertype
                .as_deref()
                .and_then(|s| self.types.get(s));
        }
        chain
    }

    /// Find an attribute on the type or one of its supertypes
    pub fn find_attribute(&self, type_name: &str, attribute: &str) -> Option<&ModelAttribute> {
        self.supertype_chain(type_name)
            .into_iter()
            .find_map(|t| t.attribute(attribute))
    }

    /// Find an association on the type or one of its supertypes
    pub fn find_association(&self, type_name: &str, association: &str) -> Option<&ModelAssociation> {
        self.supertype_chain(type_name)
            .into_iter()
            .find_map(|t| t.association(association))
    }

    /// The product type configuring a policy type, inherited from supertypes
    pub fn configuring_product_type(&self, policy_type: &str) -> Option<&ModelType> {
        self.supertype_chain(policy_type)
            .into_iter()
            .find_map(|t| t.configured_by.as_deref())
            .and_then(|p| self.types.get(p))
    }

    /// Check cross references. Every problem found is reported, not just the first.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut problems = Vec::new();

        for t in self.types.values() {
            if let Some(supertype) = &t.supertype {
                match self.types.get(supertype) {
                    None => problems.push(format!(
                        "type '{}': unknown supertype '{}'",
                        t.name, supertype
                    )),
                    Some(s) if s.kind != t.kind => problems.push(format!(
                        "type '{}': supertype '{}' is a different kind of type",
                        t.name, supertype
                    )),
                    Some(_) => {}
                }
                if self
                    .supertype_chain(&t.name)
                    .last()
                    .and_then(|last| last.supertype.as_deref())
                    .is_some_and(|s| self.types.contains_key(s))
                {
                    problems.push(format!("type '{}': cyclic supertype hierarchy", t.name));
                }
            }

            if let Some(product) = &t.configured_by {
                let ok = t.kind == TypeKind::Policy
                    && self
                        .types
                        .get(product)
                        .is_some_and(|p| p.kind == TypeKind::Product);
                if !ok {
                    problems.push(format!(
                        "type '{}': configured_by '{}' must name a product type from a policy type",
                        t.name, product
                    ));
                }
            }

            let mut member_names = HashSet::new();
            for attribute in &t.attributes {
                if !member_names.insert(attribute.name.as_str()) {
                    problems.push(format!(
                        "type '{}': duplicate member '{}'",
                        t.name, attribute.name
                    ));
                }
                if self.resolve_datatype(&attribute.datatype).is_none() {
                    problems.push(format!(
                        "type '{}': attribute '{}' has unknown datatype '{}'",
                        t.name, attribute.name, attribute.datatype
                    ));
                }
            }
            for association in &t.associations {
                if !member_names.insert(association.name.as_str()) {
                    problems.push(format!(
                        "type '{}': duplicate member '{}'",
                        t.name, association.name
                    ));
                }
                if !self.types.contains_key(&association.target) {
                    problems.push(format!(
                        "type '{}': association '{}' has unknown target '{}'",
                        t.name, association.name, association.target
                    ));
                }
                if association.qualified && !association.to_many {
                    problems.push(format!(
                        "type '{}': qualified association '{}' must be to-many",
                        t.name, association.name
                    ));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ModelError::Invalid(problems))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> TypeModel {
        let mut model = TypeModel::new();
        model
            .add_type(
                ModelType::policy("BasePolicy")
                    .with_attribute(ModelAttribute::new("startYear", "Integer"))
                    .configured_by("Product"),
            )
            .unwrap();
        model
            .add_type(
                ModelType::policy("Policy")
                    .with_supertype("BasePolicy")
                    .with_attribute(ModelAttribute::new("premium", "Decimal"))
                    .with_association(ModelAssociation::to_many("coverage", "Coverage")),
            )
            .unwrap();
        model.add_type(ModelType::policy("Coverage")).unwrap();
        model.add_type(ModelType::product("Product")).unwrap();
        model
            .add_enum(EnumType::new("Gender", &["male", "female"]))
            .unwrap();
        model
    }

    #[test]
    fn test_resolve_datatype() {
        let model = model();
        assert_eq!(model.resolve_datatype("Decimal"), Some(Datatype::Decimal));
        assert_eq!(model.resolve_datatype("Gender"), Some(Datatype::enumeration("Gender")));
        assert_eq!(model.resolve_datatype("Coverage"), Some(Datatype::policy("Coverage")));
        assert_eq!(model.resolve_datatype("Product"), Some(Datatype::product("Product")));
        assert_eq!(
            model.resolve_datatype("List<Money>"),
            Some(Datatype::list_of(Datatype::Money))
        );
        assert_eq!(model.resolve_datatype("Nope"), None);
    }

    #[test]
    fn test_inherited_members() {
        let model = model();
        assert!(model.find_attribute("Policy", "startYear").is_some());
        assert!(model.find_attribute("Policy", "premium").is_some());
        assert!(model.find_attribute("BasePolicy", "premium").is_none());
        assert_eq!(
            model.configuring_product_type("Policy").map(|t| t.name.as_str()),
            Some("Product")
        );
    }

    #[test]
    fn test_association_plural_name() {
        let model = model();
        assert!(model.find_association("Policy", "coverage").is_some());
        assert!(model.find_association("Policy", "coverages").is_some());
        let to_one = ModelAssociation::to_one("insurer", "Coverage");
        assert!(!to_one.matches("insurers"));
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let mut model = model();
        assert_eq!(
            model.add_type(ModelType::policy("Policy")),
            Err(ModelError::DuplicateType("Policy".to_string()))
        );
        assert!(matches!(
            model.add_enum(EnumType::new("Coverage", &[])),
            Err(ModelError::DuplicateEnum(_))
        ));
    }

    #[test]
    fn test_validate_ok() {
        assert_eq!(model().validate(), Ok(()));
    }

    #[test]
    fn test_validate_reports_all_problems() {
        let mut model = TypeModel::new();
        model
            .add_type(
                ModelType::policy("A")
                    .with_supertype("Missing")
                    .with_attribute(ModelAttribute::new("x", "Unknown"))
                    .with_association(ModelAssociation::to_one("x", "Nowhere")),
            )
            .unwrap();
        let Err(ModelError::Invalid(problems)) = model.validate() else {
            panic!("Expected invalid model");
        };
        assert_eq!(problems.len(), 4);
    }

    #[test]
    fn test_supertype_cycle_detected() {
        let mut model = TypeModel::new();
        model
            .add_type(ModelType::policy("A").with_supertype("B"))
            .unwrap();
        model
            .add_type(ModelType::policy("B").with_supertype("A"))
            .unwrap();
        assert_eq!(model.supertype_chain("A").len(), 2);
        let Err(ModelError::Invalid(problems)) = model.validate() else {
            panic!("Expected invalid model");
        };
        assert!(problems.iter().any(|p| p.contains("cyclic")));
    }

    #[test]
    fn test_empty_parameter_name() {
        assert_eq!(
            Parameter::new(" ", Datatype::Decimal),
            Err(ModelError::EmptyParameterName)
        );
    }
}
