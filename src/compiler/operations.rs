//! Operator tables
//!
//! Binary operations are keyed by `(operator, lhs datatype, rhs datatype)`,
//! unary operations by `(operator, operand datatype)`. Lookup is exact: no
//! promotion between datatype families, and no fallback when a key is
//! missing.

use fl_types::Datatype;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use super::{CompilerConfig, Compiled};
use crate::ast::{BinaryOperator, UnaryOperator};
use crate::code::{CodeFragment, DECIMAL_CLASS, ROUNDING_MODE_CLASS};
use crate::diagnostics::{Diagnostic, DiagnosticCode};

type BinaryEmitter = Arc<dyn Fn(&str, &str, &CompilerConfig) -> String + Send + Sync>;
type UnaryEmitter = Arc<dyn Fn(&str, &CompilerConfig) -> String + Send + Sync>;

// =============================================================================
// OPERATIONS
// =============================================================================

#[derive(Clone)]
pub struct BinaryOperation {
    pub operator: BinaryOperator,
    pub lhs: Datatype,
    pub rhs: Datatype,
    pub result: Datatype,
    imports: Vec<&'static str>,
    /// Attached to every use of the operation, located at the expression
    warning: Option<Diagnostic>,
    emit: BinaryEmitter,
}

impl BinaryOperation {
    pub fn new(
        operator: BinaryOperator,
        lhs: Datatype,
        rhs: Datatype,
        result: Datatype,
        emit: impl Fn(&str, &str, &CompilerConfig) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            operator,
            lhs,
            rhs,
            result,
            imports: Vec::new(),
            warning: None,
            emit: Arc::new(emit),
        }
    }

    pub fn with_import(mut self, qualified_name: &'static str) -> Self {
        self.imports.push(qualified_name);
        self
    }

    pub fn with_warning(mut self, warning: Diagnostic) -> Self {
        self.warning = Some(warning);
        self
    }

    pub fn warning(&self) -> Option<&Diagnostic> {
        self.warning.as_ref()
    }

    pub fn apply(&self, left: &Compiled, right: &Compiled, config: &CompilerConfig) -> Compiled {
        let source = (self.emit)(left.code.source(), right.code.source(), config);
        let mut code = CodeFragment::derived(source, &[&left.code, &right.code]);
        for import in &self.imports {
            code = code.with_import(*import);
        }
        Compiled::derived(code, self.result.clone(), &[left, right])
    }
}

impl fmt::Debug for BinaryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} -> {}", self.lhs, self.operator, self.rhs, self.result)
    }
}

#[derive(Clone)]
pub struct UnaryOperation {
    pub operator: UnaryOperator,
    pub operand: Datatype,
    pub result: Datatype,
    emit: UnaryEmitter,
}

impl UnaryOperation {
    pub fn new(
        operator: UnaryOperator,
        operand: Datatype,
        result: Datatype,
        emit: impl Fn(&str, &CompilerConfig) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            operator,
            operand,
            result,
            emit: Arc::new(emit),
        }
    }

    pub fn apply(&self, operand: &Compiled, config: &CompilerConfig) -> Compiled {
        let source = (self.emit)(operand.code.source(), config);
        Compiled::derived(
            CodeFragment::derived(source, &[&operand.code]),
            self.result.clone(),
            &[operand],
        )
    }
}

impl fmt::Debug for UnaryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} -> {}", self.operator, self.operand, self.result)
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

type BinaryKey = (BinaryOperator, Datatype, Datatype);
type UnaryKey = (UnaryOperator, Datatype);

#[derive(Clone, Default)]
pub struct OperationRegistry {
    binary: HashMap<BinaryKey, BinaryOperation>,
    unary: HashMap<UnaryKey, UnaryOperation>,
}

impl OperationRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Operations on the predefined value datatypes
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for operation in standard_binary_operations() {
            registry.register_binary(operation);
        }
        for operation in standard_unary_operations() {
            registry.register_unary(operation);
        }
        registry
    }

    /// Register an operation, returning the one previously bound to its key
    pub fn register_binary(&mut self, operation: BinaryOperation) -> Option<BinaryOperation> {
        let key = (operation.operator, operation.lhs.clone(), operation.rhs.clone());
        let previous = self.binary.insert(key, operation);
        if let Some(previous) = &previous {
            warn!(operation = ?previous, "replacing registered binary operation");
        }
        previous
    }

    pub fn register_unary(&mut self, operation: UnaryOperation) -> Option<UnaryOperation> {
        let key = (operation.operator, operation.operand.clone());
        let previous = self.unary.insert(key, operation);
        if let Some(previous) = &previous {
            warn!(operation = ?previous, "replacing registered unary operation");
        }
        previous
    }

    /// `=` and `!=` between two values of the enum type `name`
    pub fn register_enum_equality(&mut self, name: &str) {
        let datatype = Datatype::enumeration(name);
        for operation in equality_operations(&datatype) {
            self.register_binary(operation);
        }
    }

    pub fn find_binary(
        &self,
        operator: BinaryOperator,
        lhs: &Datatype,
        rhs: &Datatype,
    ) -> Option<&BinaryOperation> {
        self.binary.get(&(operator, lhs.clone(), rhs.clone()))
    }

    pub fn find_unary(&self, operator: UnaryOperator, operand: &Datatype) -> Option<&UnaryOperation> {
        self.unary.get(&(operator, operand.clone()))
    }

    pub fn binary_operations(&self) -> impl Iterator<Item = &BinaryOperation> {
        self.binary.values()
    }

    pub fn unary_operations(&self) -> impl Iterator<Item = &UnaryOperation> {
        self.unary.values()
    }
}

impl fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("binary", &self.binary.len())
            .field("unary", &self.unary.len())
            .finish()
    }
}

// =============================================================================
// STANDARD TABLE
// =============================================================================

fn rounding(config: &CompilerConfig) -> String {
    format!("RoundingMode.{}", config.rounding_mode.java_name())
}

fn comparison_operations(datatype: &Datatype) -> Vec<BinaryOperation> {
    [
        (BinaryOperator::Lt, "<"),
        (BinaryOperator::Le, "<="),
        (BinaryOperator::Gt, ">"),
        (BinaryOperator::Ge, ">="),
        (BinaryOperator::Eq, "=="),
        (BinaryOperator::NotEq, "!="),
    ]
    .into_iter()
    .map(|(operator, symbol)| {
        BinaryOperation::new(
            operator,
            datatype.clone(),
            datatype.clone(),
            Datatype::Boolean,
            move |l, r, _| format!("Boolean.valueOf({}.compareTo({}) {} 0)", l, r, symbol),
        )
    })
    .collect()
}

fn equality_operations(datatype: &Datatype) -> Vec<BinaryOperation> {
    vec![
        BinaryOperation::new(
            BinaryOperator::Eq,
            datatype.clone(),
            datatype.clone(),
            Datatype::Boolean,
            |l, r, _| format!("Boolean.valueOf({}.equals({}))", l, r),
        ),
        BinaryOperation::new(
            BinaryOperator::NotEq,
            datatype.clone(),
            datatype.clone(),
            Datatype::Boolean,
            |l, r, _| format!("Boolean.valueOf(!{}.equals({}))", l, r),
        ),
    ]
}

fn standard_binary_operations() -> Vec<BinaryOperation> {
    use BinaryOperator::*;
    let mut ops = Vec::new();

    // Decimal and BigDecimal: exact arithmetic, division to the configured scale
    for datatype in [Datatype::Decimal, Datatype::BigDecimal] {
        for (operator, method) in [(Plus, "add"), (Minus, "subtract"), (Multiply, "multiply")] {
            ops.push(BinaryOperation::new(
                operator,
                datatype.clone(),
                datatype.clone(),
                datatype.clone(),
                move |l, r, _| format!("{}.{}({})", l, method, r),
            ));
        }
        ops.push(
            BinaryOperation::new(
                Divide,
                datatype.clone(),
                datatype.clone(),
                datatype.clone(),
                |l, r, c| format!("{}.divide({}, {}, {})", l, r, c.division_scale, rounding(c)),
            )
            .with_import(ROUNDING_MODE_CLASS),
        );
        ops.extend(comparison_operations(&datatype));
    }

    // Integer
    for (operator, symbol) in [(Plus, "+"), (Minus, "-"), (Multiply, "*")] {
        ops.push(BinaryOperation::new(
            operator,
            Datatype::Integer,
            Datatype::Integer,
            Datatype::Integer,
            move |l, r, _| format!("Integer.valueOf({} {} {})", l, symbol, r),
        ));
    }
    ops.push(
        BinaryOperation::new(
            Divide,
            Datatype::Integer,
            Datatype::Integer,
            Datatype::Decimal,
            |l, r, c| {
                format!(
                    "Decimal.valueOf({}).divide(Decimal.valueOf({}), {}, {})",
                    l,
                    r,
                    c.division_scale,
                    rounding(c)
                )
            },
        )
        .with_import(DECIMAL_CLASS)
        .with_import(ROUNDING_MODE_CLASS),
    );
    ops.extend(comparison_operations(&Datatype::Integer));

    // Double: IEEE arithmetic
    for (operator, symbol) in [(Plus, "+"), (Minus, "-"), (Multiply, "*"), (Divide, "/")] {
        ops.push(BinaryOperation::new(
            operator,
            Datatype::Double,
            Datatype::Double,
            Datatype::Double,
            move |l, r, _| format!("Double.valueOf({} {} {})", l, symbol, r),
        ));
    }
    for operation in comparison_operations(&Datatype::Double) {
        let operation = if matches!(operation.operator, Eq | NotEq) {
            operation.with_warning(Diagnostic::warning(
                DiagnosticCode::FloatingPointEquality,
                "comparing Double values for equality is subject to rounding",
            ))
        } else {
            operation
        };
        ops.push(operation);
    }

    // Money
    for (operator, method) in [(Plus, "add"), (Minus, "subtract")] {
        ops.push(BinaryOperation::new(
            operator,
            Datatype::Money,
            Datatype::Money,
            Datatype::Money,
            move |l, r, _| format!("{}.{}({})", l, method, r),
        ));
    }
    ops.push(
        BinaryOperation::new(Multiply, Datatype::Money, Datatype::Decimal, Datatype::Money, |l, r, c| {
            format!("{}.multiply({}, {})", l, r, rounding(c))
        })
        .with_import(ROUNDING_MODE_CLASS),
    );
    ops.push(
        BinaryOperation::new(Multiply, Datatype::Decimal, Datatype::Money, Datatype::Money, |l, r, c| {
            format!("{}.multiply({}, {})", r, l, rounding(c))
        })
        .with_import(ROUNDING_MODE_CLASS),
    );
    ops.push(BinaryOperation::new(
        Multiply,
        Datatype::Money,
        Datatype::Integer,
        Datatype::Money,
        |l, r, _| format!("{}.multiply({})", l, r),
    ));
    ops.push(BinaryOperation::new(
        Multiply,
        Datatype::Integer,
        Datatype::Money,
        Datatype::Money,
        |l, r, _| format!("{}.multiply({})", r, l),
    ));
    for divisor in [Datatype::Decimal, Datatype::Integer] {
        ops.push(
            BinaryOperation::new(Divide, Datatype::Money, divisor, Datatype::Money, |l, r, c| {
                format!("{}.divide({}, {})", l, r, rounding(c))
            })
            .with_import(ROUNDING_MODE_CLASS),
        );
    }
    ops.extend(comparison_operations(&Datatype::Money));

    // String
    ops.push(BinaryOperation::new(
        Plus,
        Datatype::String,
        Datatype::String,
        Datatype::String,
        |l, r, _| format!("({} + {})", l, r),
    ));
    ops.extend(equality_operations(&Datatype::String));

    // Boolean
    for (operator, symbol) in [(And, "&&"), (Or, "||")] {
        ops.push(BinaryOperation::new(
            operator,
            Datatype::Boolean,
            Datatype::Boolean,
            Datatype::Boolean,
            move |l, r, _| format!("Boolean.valueOf({} {} {})", l, symbol, r),
        ));
    }
    ops.extend(equality_operations(&Datatype::Boolean));

    ops
}

fn standard_unary_operations() -> Vec<UnaryOperation> {
    let mut ops = Vec::new();

    for datatype in [
        Datatype::Decimal,
        Datatype::BigDecimal,
        Datatype::Integer,
        Datatype::Double,
        Datatype::Money,
    ] {
        ops.push(UnaryOperation::new(
            UnaryOperator::Plus,
            datatype.clone(),
            datatype,
            |o, _| o.to_string(),
        ));
    }

    for datatype in [Datatype::Decimal, Datatype::BigDecimal] {
        ops.push(UnaryOperation::new(
            UnaryOperator::Minus,
            datatype.clone(),
            datatype,
            |o, _| format!("{}.negate()", o),
        ));
    }
    ops.push(UnaryOperation::new(
        UnaryOperator::Minus,
        Datatype::Integer,
        Datatype::Integer,
        |o, _| format!("Integer.valueOf(-{})", o),
    ));
    ops.push(UnaryOperation::new(
        UnaryOperator::Minus,
        Datatype::Double,
        Datatype::Double,
        |o, _| format!("Double.valueOf(-{})", o),
    ));
    ops.push(UnaryOperation::new(
        UnaryOperator::Minus,
        Datatype::Money,
        Datatype::Money,
        |o, _| format!("{}.multiply(-1)", o),
    ));
    ops.push(UnaryOperation::new(
        UnaryOperator::Not,
        Datatype::Boolean,
        Datatype::Boolean,
        |o, _| format!("Boolean.valueOf(!{})", o),
    ));

    ops
}
