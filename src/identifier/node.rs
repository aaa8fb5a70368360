//! Resolved identifier nodes
//!
//! One [`IdentifierNode`] per link of an identifier chain. Nodes are built
//! once by the resolver, never mutated, and consumed by the generators.

use fl_types::Datatype;
use serde::Serialize;

use crate::ast::Span;
use crate::diagnostics::Diagnostic;

/// Tag used to pick the generator for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    Parameter,
    Attribute,
    Association,
    Index,
    Qualifier,
    EnumValue,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum IdentifierNode {
    Parameter(ParameterNode),
    Attribute(AttributeNode),
    Association(AssociationNode),
    Index(IndexNode),
    Qualifier(QualifierNode),
    EnumValue(EnumValueNode),
    Invalid(InvalidNode),
}

impl IdentifierNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            IdentifierNode::Parameter(_) => NodeKind::Parameter,
            IdentifierNode::Attribute(_) => NodeKind::Attribute,
            IdentifierNode::Association(_) => NodeKind::Association,
            IdentifierNode::Index(_) => NodeKind::Index,
            IdentifierNode::Qualifier(_) => NodeKind::Qualifier,
            IdentifierNode::EnumValue(_) => NodeKind::EnumValue,
            IdentifierNode::Invalid(_) => NodeKind::Invalid,
        }
    }

    /// Static type of evaluating this node; `None` for invalid nodes
    pub fn datatype(&self) -> Option<&Datatype> {
        match self {
            IdentifierNode::Parameter(n) => Some(&n.datatype),
            IdentifierNode::Attribute(n) => Some(&n.datatype),
            IdentifierNode::Association(n) => Some(&n.datatype),
            IdentifierNode::Index(n) => Some(&n.datatype),
            IdentifierNode::Qualifier(n) => Some(&n.datatype),
            IdentifierNode::EnumValue(n) => Some(&n.datatype),
            IdentifierNode::Invalid(_) => None,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            IdentifierNode::Parameter(n) => n.span,
            IdentifierNode::Attribute(n) => n.span,
            IdentifierNode::Association(n) => n.span,
            IdentifierNode::Index(n) => n.span,
            IdentifierNode::Qualifier(n) => n.span,
            IdentifierNode::EnumValue(n) => n.span,
            IdentifierNode::Invalid(n) => n.diagnostic.span.unwrap_or_default(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, IdentifierNode::Invalid(_))
    }
}

/// Formal parameter of the formula, always the first link of a chain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterNode {
    pub name: String,
    pub datatype: Datatype,
    pub span: Span,
}

/// Where an attribute's value is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttributeOwner {
    /// On the policy object itself
    Policy,
    /// On the product component, or on its generation when changing over time
    Product { changing_over_time: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeNode {
    pub name: String,
    pub owner: AttributeOwner,
    /// `name@default`: read the default value from the product generation
    pub default_value: bool,
    /// The context was list-valued, so access is lifted over every element
    pub list_context: bool,
    /// Result type, already lifted to a list when `list_context` is set
    pub datatype: Datatype,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationNode {
    pub name: String,
    /// Target role name used by the navigation method (plural for to-many)
    pub role: String,
    pub owner: AttributeOwner,
    pub to_many: bool,
    pub qualified: bool,
    pub list_context: bool,
    /// Datatype of one target
    pub target: Datatype,
    pub datatype: Datatype,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexNode {
    pub index: u32,
    pub datatype: Datatype,
    pub span: Span,
}

/// Select the target configured by a given product component
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualifierNode {
    pub qualifier: String,
    pub datatype: Datatype,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumValueNode {
    pub enum_type: String,
    pub value: String,
    pub extensible: bool,
    pub qualified_class: Option<String>,
    pub datatype: Datatype,
    pub span: Span,
}

/// A link that could not be resolved; carries the reason
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvalidNode {
    pub diagnostic: Diagnostic,
}

/// Resolved chain, root first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedChain {
    pub nodes: Vec<IdentifierNode>,
    pub span: Span,
}

impl ResolvedChain {
    /// Datatype of the last node, `None` if the chain is invalid
    pub fn datatype(&self) -> Option<&Datatype> {
        if self.is_valid() {
            self.nodes.last().and_then(IdentifierNode::datatype)
        } else {
            None
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.nodes.is_empty() && self.nodes.iter().all(IdentifierNode::is_valid)
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.nodes.iter().filter_map(|n| match n {
            IdentifierNode::Invalid(invalid) => Some(&invalid.diagnostic),
            _ => None,
        })
    }
}
