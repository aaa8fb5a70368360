//! faktor-fl: formula-language expression compiler
//!
//! Compiles formula expressions written against a policy/product type model
//! into typed target-language (Java) code fragments:
//! - Nom-based parser producing an AST with raw identifier chains
//! - Identifier resolution against the type model (attributes, associations,
//!   indices, qualifiers, parameters, enum values)
//! - Per-node code generators dispatched through a generator factory
//! - Exact-match operator and function tables
//! - Diagnostic types for error reporting
//! - YAML type-model loader
//!
//! Datatypes live in the `fl_types` foundation crate.

pub mod ast;
pub mod code;
pub mod compiler;
pub mod diagnostics;
pub mod formula;
pub mod identifier;
pub mod model;
pub mod parser;

// Re-export commonly used types
pub use ast::{Expr, IdentifierChain, Span};
pub use code::CodeFragment;
pub use compiler::{
    CompilationResult, CompileFailure, Compiled, CompilerConfig, ExprCompiler, RoundingMode,
};
pub use diagnostics::{Diagnostic, DiagnosticCode, Severity, SourceSpan};
pub use fl_types::{Datatype, DatatypeError, Money};
pub use formula::{compile_formula, CompiledFormula, FormulaSignature};
pub use identifier::{IdentifierNode, NodeKind, ResolvedChain};
pub use model::loader::{LoadedModel, ModelLoader};
pub use model::{Parameter, TypeModel};
pub use parser::parse_formula;
