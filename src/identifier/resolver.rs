//! Identifier resolution
//!
//! Gives each segment of a raw [`IdentifierChain`] its meaning against the
//! type model and the formula parameters. Resolution never fails as a
//! control-flow error: a segment that cannot be resolved becomes an
//! [`InvalidNode`] and resolution of that chain stops there.

use fl_types::Datatype;
use tracing::debug;

use super::node::*;
use crate::ast::{IdentifierChain, Segment, SegmentKind, Span};
use crate::diagnostics::{undefined_identifier_error, Diagnostic, DiagnosticCode};
use crate::model::{ModelAssociation, ModelAttribute, Parameter, TypeKind, TypeModel};

pub struct IdentifierResolver<'a> {
    model: &'a TypeModel,
    parameters: &'a [Parameter],
}

impl<'a> IdentifierResolver<'a> {
    pub fn new(model: &'a TypeModel, parameters: &'a [Parameter]) -> Self {
        Self { model, parameters }
    }

    /// Resolve a chain root to leaf
    pub fn resolve(&self, chain: &IdentifierChain) -> ResolvedChain {
        let mut nodes = Vec::with_capacity(chain.segments.len());

        let (root, consumed) = self.resolve_root(&chain.segments, chain);
        nodes.push(root);

        for segment in chain.segments.iter().skip(consumed) {
            let node = match nodes.last() {
                Some(previous) if previous.is_valid() => self.resolve_segment(previous, segment),
                _ => break,
            };
            nodes.push(node);
        }

        let resolved = ResolvedChain {
            nodes,
            span: chain.span,
        };
        for diagnostic in resolved.diagnostics() {
            debug!(identifier = %chain, code = ?diagnostic.code, "identifier did not resolve");
        }
        resolved
    }

    // =========================================================================
    // Root segment: parameter or enum value
    // =========================================================================

    fn resolve_root(&self, segments: &[Segment], chain: &IdentifierChain) -> (IdentifierNode, usize) {
        let Some(first) = segments.first() else {
            return (
                invalid(undefined_identifier_error(&chain.to_string(), chain.span)),
                0,
            );
        };
        let SegmentKind::Name { name, default_value } = &first.kind else {
            return (
                invalid(undefined_identifier_error(&chain.to_string(), first.span)),
                1,
            );
        };

        if let Some(parameter) = self.parameters.iter().find(|p| &p.name == name) {
            if *default_value {
                return (
                    invalid(
                        Diagnostic::error(
                            DiagnosticCode::NoDefaultValue,
                            format!("parameter '{}' has no default value", name),
                        )
                        .with_span(first.span),
                    ),
                    1,
                );
            }
            let node = IdentifierNode::Parameter(ParameterNode {
                name: parameter.name.clone(),
                datatype: parameter.datatype.clone(),
                span: first.span,
            });
            return (node, 1);
        }

        if let Some(enum_type) = self.model.find_enum(name) {
            if *default_value {
                return (invalid(enum_default_error(&enum_type.name, first.span)), 1);
            }
            return match segments.get(1) {
                Some(Segment {
                    kind:
                        SegmentKind::Name {
                            name: value,
                            default_value: false,
                        },
                    span,
                }) => {
                    if enum_type.has_value(value) {
                        let node = IdentifierNode::EnumValue(EnumValueNode {
                            enum_type: enum_type.name.clone(),
                            value: value.clone(),
                            extensible: enum_type.extensible,
                            qualified_class: enum_type.qualified_name(),
                            datatype: Datatype::enumeration(&enum_type.name),
                            span: Span::merge(first.span, *span),
                        });
                        (node, 2)
                    } else {
                        let diagnostic = Diagnostic::error(
                            DiagnosticCode::UnknownEnumValue,
                            format!("enum type '{}' has no value '{}'", enum_type.name, value),
                        )
                        .with_span(*span);
                        (invalid(diagnostic), 2)
                    }
                }
                Some(Segment {
                    kind:
                        SegmentKind::Name {
                            default_value: true,
                            ..
                        },
                    span,
                }) => (invalid(enum_default_error(&enum_type.name, *span)), 2),
                _ => {
                    let diagnostic = Diagnostic::error(
                        DiagnosticCode::UnknownEnumValue,
                        format!("enum type '{}' must be followed by one of its values", name),
                    )
                    .with_span(first.span);
                    (invalid(diagnostic), 1)
                }
            };
        }

        (invalid(undefined_identifier_error(name, first.span)), 1)
    }

    // =========================================================================
    // Following segments
    // =========================================================================

    fn resolve_segment(&self, previous: &IdentifierNode, segment: &Segment) -> IdentifierNode {
        let Some(context) = previous.datatype() else {
            return invalid(undefined_identifier_error("", segment.span));
        };

        match &segment.kind {
            SegmentKind::Index(index) => match context.element_type() {
                Some(element) => IdentifierNode::Index(IndexNode {
                    index: *index,
                    datatype: element.clone(),
                    span: segment.span,
                }),
                None => invalid(
                    Diagnostic::error(
                        DiagnosticCode::IndexOnNonList,
                        format!("cannot index a value of type {}; only lists can be indexed", context),
                    )
                    .with_span(segment.span),
                ),
            },

            SegmentKind::Qualifier(qualifier) => match previous {
                IdentifierNode::Association(association)
                    if association.qualified && context.is_list() =>
                {
                    IdentifierNode::Qualifier(QualifierNode {
                        qualifier: qualifier.clone(),
                        datatype: association.target.clone(),
                        span: segment.span,
                    })
                }
                _ => invalid(
                    Diagnostic::error(
                        DiagnosticCode::QualifierNotAllowed,
                        format!(
                            "qualifier [\"{}\"] can only follow a qualified association",
                            qualifier
                        ),
                    )
                    .with_span(segment.span),
                ),
            },

            SegmentKind::Name { name, default_value } => {
                self.resolve_member(context, name, *default_value, segment.span)
            }
        }
    }

    fn resolve_member(
        &self,
        context: &Datatype,
        name: &str,
        default_value: bool,
        span: Span,
    ) -> IdentifierNode {
        let (element, list_context) = match context {
            Datatype::List(inner) => (inner.as_ref(), true),
            other => (other, false),
        };

        let Some(model_type) = element
            .model_type_name()
            .and_then(|type_name| self.model.find_type(type_name))
        else {
            return invalid(
                Diagnostic::error(
                    DiagnosticCode::NotNavigable,
                    format!("cannot access '{}' on a value of type {}", name, context),
                )
                .with_span(span),
            );
        };

        if let Some(attribute) = self.model.find_attribute(&model_type.name, name) {
            let owner = match model_type.kind {
                TypeKind::Policy => AttributeOwner::Policy,
                TypeKind::Product => AttributeOwner::Product {
                    changing_over_time: attribute.changing_over_time,
                },
            };
            return self.attribute_node(attribute, owner, default_value, list_context, span);
        }

        if let Some(association) = self.model.find_association(&model_type.name, name) {
            let owner = match model_type.kind {
                TypeKind::Policy => AttributeOwner::Policy,
                TypeKind::Product => AttributeOwner::Product {
                    changing_over_time: association.changing_over_time,
                },
            };
            return self.association_node(association, owner, default_value, list_context, span);
        }

        // Policy types also expose the attributes of their configuring product
        if model_type.kind == TypeKind::Policy {
            if let Some(attribute) = self
                .model
                .configuring_product_type(&model_type.name)
                .and_then(|product| self.model.find_attribute(&product.name, name))
            {
                let owner = AttributeOwner::Product {
                    changing_over_time: attribute.changing_over_time,
                };
                return self.attribute_node(attribute, owner, default_value, list_context, span);
            }
        }

        invalid(
            Diagnostic::error(
                DiagnosticCode::UnknownMember,
                format!(
                    "type '{}' has no attribute or association '{}'",
                    model_type.name, name
                ),
            )
            .with_span(span),
        )
    }

    fn attribute_node(
        &self,
        attribute: &ModelAttribute,
        owner: AttributeOwner,
        default_value: bool,
        list_context: bool,
        span: Span,
    ) -> IdentifierNode {
        let Some(mut value_type) = self.model.resolve_datatype(&attribute.datatype) else {
            return invalid(
                Diagnostic::error(
                    DiagnosticCode::UnknownDatatype,
                    format!(
                        "attribute '{}' has unknown datatype '{}'",
                        attribute.name, attribute.datatype
                    ),
                )
                .with_span(span),
            );
        };

        if default_value {
            if owner != AttributeOwner::Policy || !attribute.product_relevant {
                return invalid(
                    Diagnostic::error(
                        DiagnosticCode::NoDefaultValue,
                        format!("attribute '{}' has no default value", attribute.name),
                    )
                    .with_span(span),
                );
            }
            if list_context {
                return invalid(
                    Diagnostic::error(
                        DiagnosticCode::NoDefaultValue,
                        format!(
                            "default value of '{}' cannot be read through a to-many navigation",
                            attribute.name
                        ),
                    )
                    .with_span(span),
                );
            }
        }

        if attribute.multi_valued {
            value_type = Datatype::list_of(value_type);
        }
        if list_context && value_type.is_list() {
            return invalid(
                Diagnostic::error(
                    DiagnosticCode::ListOfListsNotSupported,
                    format!(
                        "multi-valued attribute '{}' cannot be accessed through a to-many navigation",
                        attribute.name
                    ),
                )
                .with_span(span),
            );
        }

        let datatype = if list_context {
            Datatype::list_of(value_type)
        } else {
            value_type
        };

        IdentifierNode::Attribute(AttributeNode {
            name: attribute.name.clone(),
            owner,
            default_value,
            list_context,
            datatype,
            span,
        })
    }

    fn association_node(
        &self,
        association: &ModelAssociation,
        owner: AttributeOwner,
        default_value: bool,
        list_context: bool,
        span: Span,
    ) -> IdentifierNode {
        if default_value {
            return invalid(
                Diagnostic::error(
                    DiagnosticCode::NoDefaultValue,
                    format!("association '{}' has no default value", association.name),
                )
                .with_span(span),
            );
        }

        let Some(target_type) = self.model.find_type(&association.target) else {
            return invalid(
                Diagnostic::error(
                    DiagnosticCode::UnknownDatatype,
                    format!(
                        "association '{}' has unknown target '{}'",
                        association.name, association.target
                    ),
                )
                .with_span(span),
            );
        };

        let target = target_type.datatype();
        let datatype = if association.to_many || list_context {
            Datatype::list_of(target.clone())
        } else {
            target.clone()
        };
        let role = if association.to_many {
            association.plural_name()
        } else {
            association.name.clone()
        };

        IdentifierNode::Association(AssociationNode {
            name: association.name.clone(),
            role,
            owner,
            to_many: association.to_many,
            qualified: association.qualified,
            list_context,
            target,
            datatype,
            span,
        })
    }
}

fn enum_default_error(enum_type: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCode::NoDefaultValue,
        format!("enum type '{}' has no default value", enum_type),
    )
    .with_span(span)
}

fn invalid(diagnostic: Diagnostic) -> IdentifierNode {
    IdentifierNode::Invalid(InvalidNode { diagnostic })
}
