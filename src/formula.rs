//! Formula binding
//!
//! A formula is an expression bound to a method signature: its parameters
//! are the identifiers the body may start from, and the body's datatype must
//! be exactly the declared return type.

use fl_types::Datatype;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::Span;
use crate::code::CodeFragment;
use crate::compiler::{CompileFailure, ExprCompiler};
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::model::Parameter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaSignature {
    pub name: String,
    pub return_type: Datatype,
    pub parameters: Vec<Parameter>,
}

impl FormulaSignature {
    pub fn new(name: impl Into<String>, return_type: Datatype) -> Self {
        Self {
            name: name.into(),
            return_type,
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFormula {
    pub name: String,
    /// `return <expr>;`
    pub body: CodeFragment,
    pub datatype: Datatype,
    pub warnings: Vec<Diagnostic>,
}

pub fn compile_formula(
    compiler: &ExprCompiler,
    signature: &FormulaSignature,
    text: &str,
) -> Result<CompiledFormula, CompileFailure> {
    debug!(formula = %signature.name, "compiling formula");

    if text.trim().is_empty() {
        return Err(CompileFailure::new(
            Diagnostic::error(
                DiagnosticCode::EmptyFormula,
                format!("formula '{}' has no expression", signature.name),
            )
            .with_span(Span::new(0, text.len()))
            .locate(text),
        ));
    }

    let compiled = compiler.compile_with_parameters(text, &signature.parameters)?;

    if compiled.datatype != signature.return_type {
        return Err(CompileFailure::new(
            Diagnostic::error(
                DiagnosticCode::ResultTypeMismatch,
                format!(
                    "formula '{}' must return {}, but the expression is {}",
                    signature.name, signature.return_type, compiled.datatype
                ),
            )
            .with_span(Span::new(0, text.len()))
            .locate(text),
        ));
    }

    let body = CodeFragment::derived(format!("return {};", compiled.code), &[&compiled.code]);
    Ok(CompiledFormula {
        name: signature.name.clone(),
        body,
        datatype: compiled.datatype,
        warnings: compiled.warnings,
    })
}
