//! Formula AST
//!
//! The parser produces a raw tree: literals, operator applications, function
//! calls and *unresolved* identifier chains. Identifier chains are plain
//! text segments here; giving them meaning (attribute, association, index,
//! parameter, enum value) is the job of [`crate::identifier`].
//!
//! ```text
//! Source → Parser → Expr (raw identifier chains)
//!                       ↓
//!              Identifier resolution (per chain, against the type model)
//!                       ↓
//!              Node generation + operator/function tables
//!                       ↓
//!                 CodeFragment + Datatype
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::code::java_string_literal;

// =============================================================================
// EXPRESSIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal {
        value: Literal,
        span: Span,
    },

    /// Dotted/bracketed identifier chain: `policy.coverages[0].premium`
    Identifier(IdentifierChain),

    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
        span: Span,
    },

    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },

    /// Function call: `ROUND(x; 2)`
    Call {
        name: String,
        args: Vec<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Call { span, .. } => *span,
            Expr::Identifier(chain) => chain.span,
        }
    }

    /// Height of the tree; a literal or identifier chain is 1
    pub fn depth(&self) -> usize {
        match self {
            Expr::Literal { .. } | Expr::Identifier(_) => 1,
            Expr::Unary { operand, .. } => 1 + operand.depth(),
            Expr::Binary { left, right, .. } => 1 + left.depth().max(right.depth()),
            Expr::Call { args, .. } => 1 + args.iter().map(Expr::depth).max().unwrap_or(0),
        }
    }

    /// Render the expression back to formula source, fully parenthesized
    pub fn to_formula_string(&self) -> String {
        match self {
            Expr::Literal { value, .. } => value.to_formula_string(),
            Expr::Identifier(chain) => chain.to_string(),
            Expr::Unary { op, operand, .. } => format!("{}{}", op, operand.to_formula_string()),
            Expr::Binary {
                op, left, right, ..
            } => format!(
                "({} {} {})",
                left.to_formula_string(),
                op,
                right.to_formula_string()
            ),
            Expr::Call { name, args, .. } => {
                let args: Vec<String> = args.iter().map(|a| a.to_formula_string()).collect();
                format!("{}({})", name, args.join("; "))
            }
        }
    }
}

// =============================================================================
// LITERALS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Integer literal: 42
    Integer(i32),

    /// Decimal literal: 3.14
    Decimal(Decimal),

    /// Money literal: 10.50EUR
    Money { amount: Decimal, currency: String },

    /// String literal: "text"
    String(String),

    /// Boolean literal: true, false
    Boolean(bool),
}

impl Literal {
    pub fn to_formula_string(&self) -> String {
        match self {
            Literal::Integer(i) => i.to_string(),
            Literal::Decimal(d) => d.to_string(),
            Literal::Money { amount, currency } => format!("{}{}", amount, currency),
            Literal::String(s) => java_string_literal(s),
            Literal::Boolean(b) => b.to_string(),
        }
    }
}

// =============================================================================
// IDENTIFIER CHAINS
// =============================================================================

/// A raw identifier chain as written in the formula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifierChain {
    pub segments: Vec<Segment>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SegmentKind {
    /// `name` or `name@default`
    Name { name: String, default_value: bool },

    /// `[0]`
    Index(u32),

    /// `["productId"]`
    Qualifier(String),
}

impl fmt::Display for IdentifierChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match &segment.kind {
                SegmentKind::Name { name, default_value } => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", name)?;
                    if *default_value {
                        write!(f, "@default")?;
                    }
                }
                SegmentKind::Index(index) => write!(f, "[{}]", index)?,
                SegmentKind::Qualifier(q) => write!(f, "[{}]", java_string_literal(q))?,
            }
        }
        Ok(())
    }
}

// =============================================================================
// OPERATORS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BinaryOperator {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Multiply,
    Divide,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Or => "||",
            BinaryOperator::And => "&&",
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnaryOperator {
    Plus,
    Minus,
    Not,
}

impl UnaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
            UnaryOperator::Not => "!",
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// =============================================================================
// SOURCE SPAN
// =============================================================================

/// Byte range in the formula text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset of start
    pub start: usize,
    /// Byte offset of end
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Create a span covering two spans
    pub fn merge(a: Span, b: Span) -> Span {
        Span {
            start: a.start.min(b.start),
            end: a.end.max(b.end),
        }
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Is this span empty?
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Span for nodes that don't correspond to formula text
    pub fn synthetic() -> Self {
        Self {
            start: usize::MAX,
            end: usize::MAX,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.start == usize::MAX && self.end == usize::MAX
    }
}

// =============================================================================
// TREE WALKING UTILITIES
// =============================================================================

/// Collect every identifier chain in source order
pub fn find_identifiers(expr: &Expr) -> Vec<&IdentifierChain> {
    struct Collector<'a> {
        chains: Vec<&'a IdentifierChain>,
    }

    impl<'a> Collector<'a> {
        fn walk(&mut self, expr: &'a Expr) {
            match expr {
                Expr::Literal { .. } => {}
                Expr::Identifier(chain) => self.chains.push(chain),
                Expr::Unary { operand, .. } => self.walk(operand),
                Expr::Binary { left, right, .. } => {
                    self.walk(left);
                    self.walk(right);
                }
                Expr::Call { args, .. } => {
                    for arg in args {
                        self.walk(arg);
                    }
                }
            }
        }
    }

    let mut collector = Collector { chains: Vec::new() };
    collector.walk(expr);
    collector.chains
}

// =============================================================================
// TESTS
// =============================================================================
