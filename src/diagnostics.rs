//! Compile Diagnostics
//!
//! Single diagnostic type used across parsing, identifier resolution,
//! code generation and operator resolution. Every expected failure of the
//! compiler is one of these values, never a panic.

use serde::{Deserialize, Serialize};

use crate::ast::Span;

/// Diagnostic severity level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Diagnostic codes for categorizing issues
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // =========================================================================
    // Parse errors
    // =========================================================================
    SyntaxError,
    InvalidLiteral,
    EmptyFormula,

    // =========================================================================
    // Identifier resolution errors
    // =========================================================================
    UndefinedIdentifier,
    UnknownMember,
    UnknownEnumValue,
    UnknownDatatype,
    IndexOnNonList,
    QualifierNotAllowed,
    NotNavigable,
    NoDefaultValue,
    ListOfListsNotSupported,

    // =========================================================================
    // Type errors
    // =========================================================================
    UndefinedOperator,
    UndefinedFunction,
    WrongArgumentTypes,
    ResultTypeMismatch,
    FloatingPointEquality,

    // =========================================================================
    // Generation errors
    // =========================================================================
    MissingContext,
    NoGenerator,

    // =========================================================================
    // Bookkeeping
    // =========================================================================
    TooManyDiagnostics,
}

/// Source location span
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl SourceSpan {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Create a span from byte offsets (requires source text for line/col calculation)
    pub fn from_byte_offset(source: &str, start: usize, end: usize) -> Self {
        let (start_line, start_col) = byte_to_line_col(source, start);
        let (end_line, end_col) = byte_to_line_col(source, end);
        Self::new(start_line, start_col, end_line, end_col)
    }
}

/// Convert byte offset to line and column
fn byte_to_line_col(source: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut col = 1u32;

    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// A diagnostic message with severity, code and optional location.
///
/// `span` is the byte range in the formula text; `location` is filled in
/// once the diagnostic leaves the compiler and the source text is known.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    pub span: Option<Span>,
    pub location: Option<SourceSpan>,
}

impl Diagnostic {
    /// Create an error diagnostic
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            span: None,
            location: None,
        }
    }

    /// Create a warning diagnostic
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, message)
        }
    }

    /// Create an info diagnostic
    pub fn info(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            ..Self::error(code, message)
        }
    }

    /// Add source span
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Resolve the byte span against the source text
    pub fn locate(mut self, source: &str) -> Self {
        if let Some(span) = self.span {
            if !span.is_synthetic() {
                self.location = Some(SourceSpan::from_byte_offset(source, span.start, span.end));
            }
        }
        self
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }

    /// Check if this is a warning
    pub fn is_warning(&self) -> bool {
        matches!(self.severity, Severity::Warning)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(loc) => write!(
                f,
                "{}:{}: {:?}: {}",
                loc.start_line, loc.start_col, self.code, self.message
            ),
            None => write!(f, "{:?}: {}", self.code, self.message),
        }
    }
}

// =============================================================================
// Convenience Builders
// =============================================================================

/// Create an error for an identifier that names neither a parameter nor an enum type
pub fn undefined_identifier_error(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCode::UndefinedIdentifier,
        format!("undefined identifier '{}'", name),
    )
    .with_span(span)
}

/// Create an error for an operator with no registered operation for its operand types
pub fn undefined_operator_error(operator: &str, operands: &[String], span: Span) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCode::UndefinedOperator,
        format!(
            "operator '{}' is not defined for operand types ({})",
            operator,
            operands.join(", ")
        ),
    )
    .with_span(span)
}

/// Create an error for a function call without a matching signature
pub fn wrong_argument_types_error(function: &str, arguments: &[String], span: Span) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCode::WrongArgumentTypes,
        format!(
            "function {} is not defined for argument types ({})",
            function,
            arguments.join(", ")
        ),
    )
    .with_span(span)
}

// =============================================================================
// Tests
// =============================================================================
