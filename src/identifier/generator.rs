//! Per-node code generators
//!
//! A [`GeneratorFactory`] maps each [`NodeKind`] to the [`NodeGenerator`]
//! responsible for it. A chain is generated as a strict left-to-right fold:
//! node `i` receives the compiled result of node `i - 1` (the root receives
//! `None`) and never sees anything further along the chain.

use fl_types::Datatype;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use super::node::*;
use crate::code::{capitalize, java_string_literal, CodeFragment, COLLECTORS_CLASS};
use crate::compiler::{CompilationResult, CompileFailure, Compiled};
use crate::diagnostics::{Diagnostic, DiagnosticCode};

/// Lambda parameter for per-element access in generated streams. `$` is not
/// an identifier character in formulas, so no parameter can share the name.
pub const ELEMENT_VAR: &str = "e$";

pub trait NodeGenerator: Send + Sync {
    /// Compile `node` given the compiled result of the preceding chain segment
    fn generate(&self, node: &IdentifierNode, context: Option<&Compiled>) -> CompilationResult;
}

// =============================================================================
// FACTORY
// =============================================================================

#[derive(Clone)]
pub struct GeneratorFactory {
    generators: HashMap<NodeKind, Arc<dyn NodeGenerator>>,
}

impl GeneratorFactory {
    pub fn empty() -> Self {
        Self {
            generators: HashMap::new(),
        }
    }

    /// Factory with a generator for every node kind
    pub fn standard() -> Self {
        let mut factory = Self::empty();
        factory.register(NodeKind::Parameter, Arc::new(ParameterGenerator));
        factory.register(NodeKind::Attribute, Arc::new(AttributeGenerator));
        factory.register(NodeKind::Association, Arc::new(AssociationGenerator));
        factory.register(NodeKind::Index, Arc::new(IndexGenerator));
        factory.register(NodeKind::Qualifier, Arc::new(QualifierGenerator));
        factory.register(NodeKind::EnumValue, Arc::new(EnumValueGenerator));
        factory.register(NodeKind::Invalid, Arc::new(InvalidGenerator));
        factory
    }

    /// Bind `generator` to `kind`, returning the generator it replaces
    pub fn register(
        &mut self,
        kind: NodeKind,
        generator: Arc<dyn NodeGenerator>,
    ) -> Option<Arc<dyn NodeGenerator>> {
        self.generators.insert(kind, generator)
    }

    pub fn generator_for(&self, kind: NodeKind) -> Option<&dyn NodeGenerator> {
        self.generators.get(&kind).map(|g| g.as_ref())
    }

    /// Fold the chain left to right into one result
    pub fn generate_chain(&self, chain: &ResolvedChain) -> CompilationResult {
        let mut context: Option<Compiled> = None;

        for node in &chain.nodes {
            let generator = self.generator_for(node.kind()).ok_or_else(|| {
                CompileFailure::new(
                    Diagnostic::error(
                        DiagnosticCode::NoGenerator,
                        format!("no generator registered for {:?} nodes", node.kind()),
                    )
                    .with_span(node.span()),
                )
            })?;

            let mut result = generator.generate(node, context.as_ref())?;
            trace!(
                kind = ?node.kind(),
                datatype = %result.datatype,
                code = %result.code,
                "generated identifier node"
            );

            if let Some(previous) = context.take() {
                let mut warnings = previous.warnings;
                warnings.append(&mut result.warnings);
                result.warnings = warnings;
            }
            context = Some(result);
        }

        context.ok_or_else(|| {
            CompileFailure::new(
                Diagnostic::error(DiagnosticCode::UndefinedIdentifier, "empty identifier")
                    .with_span(chain.span),
            )
        })
    }
}

impl Default for GeneratorFactory {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for GeneratorFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.generators.keys().map(|k| format!("{:?}", k)).collect();
        kinds.sort();
        f.debug_struct("GeneratorFactory").field("kinds", &kinds).finish()
    }
}

fn wrong_node(generator: &str, node: &IdentifierNode) -> CompileFailure {
    CompileFailure::new(
        Diagnostic::error(
            DiagnosticCode::NoGenerator,
            format!("{} generator cannot generate {:?} nodes", generator, node.kind()),
        )
        .with_span(node.span()),
    )
}

fn require_context<'c>(
    node: &IdentifierNode,
    context: Option<&'c Compiled>,
) -> Result<&'c Compiled, CompileFailure> {
    context.ok_or_else(|| {
        CompileFailure::new(
            Diagnostic::error(
                DiagnosticCode::MissingContext,
                format!("{:?} node cannot start an identifier", node.kind()),
            )
            .with_span(node.span()),
        )
    })
}

// =============================================================================
// GETTER PATHS
// =============================================================================

/// Call `member` on a product-owned value reached from `target`.
///
/// | context            | static member       | changing member                         |
/// |--------------------|---------------------|-----------------------------------------|
/// | product component  | `t.m`               | `t.getLatestProductCmptGeneration().m`  |
/// | product generation | `t.getProductCmpt().m` | `t.m`                                |
/// | policy             | `t.getProductCmpt().m` | `t.getProductCmptGeneration().m`     |
fn product_member(target: &str, context: &Datatype, changing_over_time: bool, member: &str) -> String {
    match context {
        Datatype::Product {
            generation: false, ..
        } if changing_over_time => format!("{}.getLatestProductCmptGeneration().{}", target, member),
        Datatype::Product {
            generation: true, ..
        } if !changing_over_time => format!("{}.getProductCmpt().{}", target, member),
        Datatype::Product { .. } => format!("{}.{}", target, member),
        _ if changing_over_time => format!("{}.getProductCmptGeneration().{}", target, member),
        _ => format!("{}.getProductCmpt().{}", target, member),
    }
}

fn member_access(target: &str, context: &Datatype, owner: AttributeOwner, member: &str) -> String {
    match owner {
        AttributeOwner::Policy => format!("{}.{}", target, member),
        AttributeOwner::Product { changing_over_time } => {
            product_member(target, context, changing_over_time, member)
        }
    }
}

/// Element type when the context is a list, the context type otherwise
fn element_of(context: &Datatype) -> &Datatype {
    context.element_type().unwrap_or(context)
}

// =============================================================================
// GENERATORS
// =============================================================================

pub struct ParameterGenerator;

impl NodeGenerator for ParameterGenerator {
    fn generate(&self, node: &IdentifierNode, _context: Option<&Compiled>) -> CompilationResult {
        let IdentifierNode::Parameter(parameter) = node else {
            return Err(wrong_node("parameter", node));
        };
        Ok(Compiled::new(
            CodeFragment::new(&parameter.name),
            parameter.datatype.clone(),
        ))
    }
}

pub struct AttributeGenerator;

impl AttributeGenerator {
    fn access(target: &str, context: &Datatype, attribute: &AttributeNode) -> String {
        if attribute.default_value {
            return format!(
                "{}.getProductCmptGeneration().getDefaultValue{}()",
                target,
                capitalize(&attribute.name)
            );
        }
        let getter = format!("get{}()", capitalize(&attribute.name));
        member_access(target, context, attribute.owner, &getter)
    }
}

impl NodeGenerator for AttributeGenerator {
    fn generate(&self, node: &IdentifierNode, context: Option<&Compiled>) -> CompilationResult {
        let IdentifierNode::Attribute(attribute) = node else {
            return Err(wrong_node("attribute", node));
        };
        let context = require_context(node, context)?;

        let code = if attribute.list_context {
            let element = element_of(&context.datatype);
            CodeFragment::derived(
                format!(
                    "{}.stream().map({} -> {}).collect(Collectors.toList())",
                    context.code,
                    ELEMENT_VAR,
                    Self::access(ELEMENT_VAR, element, attribute)
                ),
                &[&context.code],
            )
            .with_import(COLLECTORS_CLASS)
        } else {
            CodeFragment::derived(
                Self::access(context.code.source(), &context.datatype, attribute),
                &[&context.code],
            )
        };

        Ok(Compiled::new(code, attribute.datatype.clone()))
    }
}

pub struct AssociationGenerator;

impl NodeGenerator for AssociationGenerator {
    fn generate(&self, node: &IdentifierNode, context: Option<&Compiled>) -> CompilationResult {
        let IdentifierNode::Association(association) = node else {
            return Err(wrong_node("association", node));
        };
        let context = require_context(node, context)?;
        let getter = format!("get{}()", capitalize(&association.role));

        let code = if association.list_context {
            let element = element_of(&context.datatype);
            let access = member_access(ELEMENT_VAR, element, association.owner, &getter);
            let source = if association.to_many {
                format!(
                    "{}.stream().flatMap({} -> {}.stream()).collect(Collectors.toList())",
                    context.code, ELEMENT_VAR, access
                )
            } else {
                format!(
                    "{}.stream().map({} -> {}).collect(Collectors.toList())",
                    context.code, ELEMENT_VAR, access
                )
            };
            CodeFragment::derived(source, &[&context.code]).with_import(COLLECTORS_CLASS)
        } else {
            CodeFragment::derived(
                member_access(
                    context.code.source(),
                    &context.datatype,
                    association.owner,
                    &getter,
                ),
                &[&context.code],
            )
        };

        Ok(Compiled::new(code, association.datatype.clone()))
    }
}

/// Assumes a list context; resolution only builds index nodes on lists
pub struct IndexGenerator;

impl NodeGenerator for IndexGenerator {
    fn generate(&self, node: &IdentifierNode, context: Option<&Compiled>) -> CompilationResult {
        let IdentifierNode::Index(index) = node else {
            return Err(wrong_node("index", node));
        };
        let context = require_context(node, context)?;
        Ok(Compiled::new(
            CodeFragment::derived(format!("{}.get({})", context.code, index.index), &[&context.code]),
            index.datatype.clone(),
        ))
    }
}

pub struct QualifierGenerator;

impl NodeGenerator for QualifierGenerator {
    fn generate(&self, node: &IdentifierNode, context: Option<&Compiled>) -> CompilationResult {
        let IdentifierNode::Qualifier(qualifier) = node else {
            return Err(wrong_node("qualifier", node));
        };
        let context = require_context(node, context)?;

        let product_id = match &qualifier.datatype {
            Datatype::Product { .. } => format!("{}.getId()", ELEMENT_VAR),
            _ => format!("{}.getProductCmpt().getId()", ELEMENT_VAR),
        };
        let source = format!(
            "{}.stream().filter({} -> {}.equals({})).findFirst().orElse(null)",
            context.code,
            ELEMENT_VAR,
            java_string_literal(&qualifier.qualifier),
            product_id
        );

        Ok(Compiled::new(
            CodeFragment::derived(source, &[&context.code]),
            qualifier.datatype.clone(),
        ))
    }
}

pub struct EnumValueGenerator;

impl NodeGenerator for EnumValueGenerator {
    fn generate(&self, node: &IdentifierNode, _context: Option<&Compiled>) -> CompilationResult {
        let IdentifierNode::EnumValue(value) = node else {
            return Err(wrong_node("enum value", node));
        };

        let literal = java_string_literal(&value.value);
        let source = if value.extensible {
            format!(
                "getRepository().getExistingEnumValue({}.class, {})",
                value.enum_type, literal
            )
        } else {
            format!("{}.valueOf({})", value.enum_type, literal)
        };

        let mut code = CodeFragment::new(source);
        if let Some(class) = &value.qualified_class {
            code = code.with_import(class);
        }
        Ok(Compiled::new(code, value.datatype.clone()))
    }
}

/// Emits no code, only the resolution diagnostic
pub struct InvalidGenerator;

impl NodeGenerator for InvalidGenerator {
    fn generate(&self, node: &IdentifierNode, _context: Option<&Compiled>) -> CompilationResult {
        match node {
            IdentifierNode::Invalid(invalid) => Err(CompileFailure::new(invalid.diagnostic.clone())),
            other => Err(wrong_node("invalid", other)),
        }
    }
}
