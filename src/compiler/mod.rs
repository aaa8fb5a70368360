//! Expression compiler
//!
//! Drives the whole pipeline for one formula expression:
//!
//! ```text
//! text ─parse─▶ Expr ─resolve identifiers─▶ ResolvedChain(s)
//!                 │                               │ generate (left-to-right fold)
//!                 └──── operators / functions ◀───┘
//!                              │
//!                  Compiled { code, datatype } | CompileFailure { diagnostics }
//! ```
//!
//! Compilation is a pure function of the text, the parameters and the
//! (read-only) type model. An [`ExprCompiler`] holds no per-compile state and
//! can be shared between threads.

pub mod functions;
pub mod operations;
pub mod result;

pub use functions::{FunctionDef, FunctionLookupError, FunctionRegistry, ParamType, ReturnType};
pub use operations::{BinaryOperation, OperationRegistry, UnaryOperation};
pub use result::{collect_all, combine, CompilationResult, CompileFailure, Compiled};

use fl_types::Datatype;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::ast::{find_identifiers, Expr, IdentifierChain, Literal, Span};
use crate::code::{java_string_literal, CodeFragment, DECIMAL_CLASS, MONEY_CLASS};
use crate::diagnostics::{
    undefined_operator_error, wrong_argument_types_error, Diagnostic, DiagnosticCode,
};
use crate::identifier::{GeneratorFactory, IdentifierResolver, ResolvedChain};
use crate::model::{Parameter, TypeModel};
use crate::parser::parse_formula;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Rounding applied by generated division and `ROUND`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    #[default]
    HalfUp,
    HalfEven,
    HalfDown,
    Up,
    Down,
    Ceiling,
    Floor,
}

impl RoundingMode {
    /// Constant name in `java.math.RoundingMode`
    pub fn java_name(&self) -> &'static str {
        match self {
            RoundingMode::HalfUp => "HALF_UP",
            RoundingMode::HalfEven => "HALF_EVEN",
            RoundingMode::HalfDown => "HALF_DOWN",
            RoundingMode::Up => "UP",
            RoundingMode::Down => "DOWN",
            RoundingMode::Ceiling => "CEILING",
            RoundingMode::Floor => "FLOOR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Scale of the result of Decimal division
    pub division_scale: u32,
    pub rounding_mode: RoundingMode,
    /// Further diagnostics are dropped and replaced by one info note
    pub max_diagnostics: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            division_scale: 10,
            rounding_mode: RoundingMode::HalfUp,
            max_diagnostics: 100,
        }
    }
}

// =============================================================================
// COMPILER
// =============================================================================

#[derive(Debug, Clone)]
pub struct ExprCompiler {
    model: Arc<TypeModel>,
    parameters: Vec<Parameter>,
    config: CompilerConfig,
    operations: OperationRegistry,
    functions: FunctionRegistry,
    generators: GeneratorFactory,
}

impl ExprCompiler {
    /// Compiler with the standard operator, function and generator tables,
    /// plus `=`/`!=` for every enum type of the model
    pub fn new(model: Arc<TypeModel>) -> Self {
        let mut operations = OperationRegistry::standard();
        for enum_type in model.enums() {
            operations.register_enum_equality(&enum_type.name);
        }
        Self {
            model,
            parameters: Vec::new(),
            config: CompilerConfig::default(),
            operations,
            functions: FunctionRegistry::standard(),
            generators: GeneratorFactory::standard(),
        }
    }

    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn add_parameter(&mut self, parameter: Parameter) {
        self.parameters.retain(|p| p.name != parameter.name);
        self.parameters.push(parameter);
    }

    pub fn model(&self) -> &TypeModel {
        &self.model
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn operations(&self) -> &OperationRegistry {
        &self.operations
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn operations_mut(&mut self) -> &mut OperationRegistry {
        &mut self.operations
    }

    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    pub fn generators_mut(&mut self) -> &mut GeneratorFactory {
        &mut self.generators
    }

    /// Compile formula text against the compiler's parameters
    pub fn compile(&self, text: &str) -> CompilationResult {
        self.compile_with_parameters(text, &self.parameters)
    }

    /// Compile formula text against an explicit parameter list
    pub fn compile_with_parameters(&self, text: &str, parameters: &[Parameter]) -> CompilationResult {
        debug!(expression = %text, "compiling formula expression");

        if text.trim().is_empty() {
            return Err(self.finish_failure(
                CompileFailure::new(
                    Diagnostic::error(DiagnosticCode::EmptyFormula, "formula is empty")
                        .with_span(Span::new(0, text.len())),
                ),
                text,
            ));
        }

        let result = parse_formula(text)
            .map_err(CompileFailure::new)
            .and_then(|expr| self.compile_expr_with(&expr, parameters));

        match result {
            Ok(mut compiled) => {
                compiled.warnings = compiled
                    .warnings
                    .into_iter()
                    .map(|w| w.locate(text))
                    .collect();
                debug!(
                    datatype = %compiled.datatype,
                    warnings = compiled.warnings.len(),
                    "compiled formula expression"
                );
                Ok(compiled)
            }
            Err(failure) => {
                let failure = self.finish_failure(failure, text);
                debug!(
                    diagnostics = failure.diagnostics().len(),
                    "formula expression failed to compile"
                );
                Err(failure)
            }
        }
    }

    /// Compile an already parsed expression against the compiler's parameters
    pub fn compile_expr(&self, expr: &Expr) -> CompilationResult {
        self.compile_expr_with(expr, &self.parameters)
    }

    pub fn resolve_identifier(&self, chain: &IdentifierChain) -> ResolvedChain {
        IdentifierResolver::new(&self.model, &self.parameters).resolve(chain)
    }

    /// Identifier chains used by the formula, in source order, as written
    pub fn identifiers_used(&self, text: &str) -> Result<Vec<String>, Diagnostic> {
        let expr = parse_formula(text).map_err(|d| d.locate(text))?;
        let mut names: Vec<String> = Vec::new();
        for chain in find_identifiers(&expr) {
            let name = chain.to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn finish_failure(&self, failure: CompileFailure, text: &str) -> CompileFailure {
        let mut failure = failure.map_diagnostics(|d| d.locate(text));
        let total = failure.diagnostics().len();
        if total > self.config.max_diagnostics {
            failure.truncate(self.config.max_diagnostics);
            failure.push(Diagnostic::info(
                DiagnosticCode::TooManyDiagnostics,
                format!(
                    "{} further diagnostics omitted",
                    total - self.config.max_diagnostics
                ),
            ));
        }
        failure
    }

    // =========================================================================
    // Expression tree
    // =========================================================================

    fn compile_expr_with(&self, expr: &Expr, parameters: &[Parameter]) -> CompilationResult {
        match expr {
            Expr::Literal { value, .. } => Ok(literal(value)),

            Expr::Identifier(chain) => {
                let resolved = IdentifierResolver::new(&self.model, parameters).resolve(chain);
                self.generators.generate_chain(&resolved)
            }

            Expr::Unary { op, operand, span } => {
                let operand = self.compile_expr_with(operand, parameters)?;
                let operation = self
                    .operations
                    .find_unary(*op, &operand.datatype)
                    .ok_or_else(|| {
                        CompileFailure::new(undefined_operator_error(
                            op.symbol(),
                            &[operand.datatype.to_string()],
                            *span,
                        ))
                    })?;
                Ok(operation.apply(&operand, &self.config))
            }

            Expr::Binary {
                op,
                left,
                right,
                span,
            } => {
                let (left, right) = combine(
                    self.compile_expr_with(left, parameters),
                    self.compile_expr_with(right, parameters),
                )?;
                let operation = self
                    .operations
                    .find_binary(*op, &left.datatype, &right.datatype)
                    .ok_or_else(|| {
                        CompileFailure::new(undefined_operator_error(
                            op.symbol(),
                            &[left.datatype.to_string(), right.datatype.to_string()],
                            *span,
                        ))
                    })?;
                let compiled = operation.apply(&left, &right, &self.config);
                Ok(match operation.warning() {
                    Some(warning) => compiled.with_warning(warning.clone().with_span(*span)),
                    None => compiled,
                })
            }

            Expr::Call { name, args, span } => {
                let args = collect_all(
                    args.iter()
                        .map(|arg| self.compile_expr_with(arg, parameters))
                        .collect(),
                )?;
                let datatypes: Vec<Datatype> = args.iter().map(|a| a.datatype.clone()).collect();
                match self.functions.resolve(name, &datatypes) {
                    Ok(function) => Ok(function.apply(&args, &self.config)),
                    Err(FunctionLookupError::UndefinedFunction) => Err(CompileFailure::new(
                        Diagnostic::error(
                            DiagnosticCode::UndefinedFunction,
                            format!("undefined function {}", name),
                        )
                        .with_span(*span),
                    )),
                    Err(FunctionLookupError::WrongArgumentTypes) => {
                        let names: Vec<String> = datatypes.iter().map(ToString::to_string).collect();
                        Err(CompileFailure::new(wrong_argument_types_error(
                            name, &names, *span,
                        )))
                    }
                }
            }
        }
    }
}

fn literal(value: &Literal) -> Compiled {
    match value {
        Literal::Integer(i) => Compiled::new(
            CodeFragment::new(format!("Integer.valueOf({})", i)),
            Datatype::Integer,
        ),
        Literal::Decimal(d) => Compiled::new(
            CodeFragment::new(format!("Decimal.valueOf(\"{}\")", d)).with_import(DECIMAL_CLASS),
            Datatype::Decimal,
        ),
        Literal::Money { amount, currency } => Compiled::new(
            CodeFragment::new(format!("Money.valueOf(\"{}{}\")", amount, currency))
                .with_import(MONEY_CLASS),
            Datatype::Money,
        ),
        Literal::String(s) => Compiled::new(CodeFragment::new(java_string_literal(s)), Datatype::String),
        Literal::Boolean(true) => Compiled::new(CodeFragment::new("Boolean.TRUE"), Datatype::Boolean),
        Literal::Boolean(false) => Compiled::new(CodeFragment::new("Boolean.FALSE"), Datatype::Boolean),
    }
}
