//! Compilation results
//!
//! Every compile step yields a [`CompilationResult`]: either a code fragment
//! with its datatype (plus any warnings), or a non-empty list of diagnostics.
//! Combinators here keep every diagnostic when several operands fail.

use fl_types::Datatype;
use thiserror::Error;

use crate::code::CodeFragment;
use crate::diagnostics::Diagnostic;

/// Successfully compiled (sub)expression
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub code: CodeFragment,
    pub datatype: Datatype,
    /// Non-fatal diagnostics collected while compiling this expression
    pub warnings: Vec<Diagnostic>,
}

impl Compiled {
    pub fn new(code: CodeFragment, datatype: Datatype) -> Self {
        Self {
            code,
            datatype,
            warnings: Vec::new(),
        }
    }

    /// Result built from `parts`, carrying over their warnings in order
    pub fn derived(code: CodeFragment, datatype: Datatype, parts: &[&Compiled]) -> Self {
        Self {
            code,
            datatype,
            warnings: parts
                .iter()
                .flat_map(|p| p.warnings.iter().cloned())
                .collect(),
        }
    }

    pub fn with_warning(mut self, warning: Diagnostic) -> Self {
        self.warnings.push(warning);
        self
    }
}

/// Failed compilation. Never empty.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", format_diagnostics(.diagnostics))]
pub struct CompileFailure {
    diagnostics: Vec<Diagnostic>,
}

impl CompileFailure {
    pub fn new(diagnostic: Diagnostic) -> Self {
        Self {
            diagnostics: vec![diagnostic],
        }
    }

    /// `None` when there is nothing to report
    pub fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Option<Self> {
        if diagnostics.is_empty() {
            None
        } else {
            Some(Self { diagnostics })
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn merge(mut self, other: CompileFailure) -> Self {
        self.diagnostics.extend(other.diagnostics);
        self
    }

    pub fn map_diagnostics(self, f: impl FnMut(Diagnostic) -> Diagnostic) -> Self {
        Self {
            diagnostics: self.diagnostics.into_iter().map(f).collect(),
        }
    }

    pub(crate) fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.diagnostics.truncate(len);
    }
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

pub type CompilationResult = Result<Compiled, CompileFailure>;

/// Both operands, or the diagnostics of every operand that failed
pub fn combine(left: CompilationResult, right: CompilationResult) -> Result<(Compiled, Compiled), CompileFailure> {
    match (left, right) {
        (Ok(l), Ok(r)) => Ok((l, r)),
        (Err(l), Err(r)) => Err(l.merge(r)),
        (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
    }
}

/// All results, or the merged diagnostics of every failure in order
pub fn collect_all(results: Vec<CompilationResult>) -> Result<Vec<Compiled>, CompileFailure> {
    let mut compiled = Vec::with_capacity(results.len());
    let mut failure: Option<CompileFailure> = None;
    for result in results {
        match result {
            Ok(c) => compiled.push(c),
            Err(e) => {
                failure = Some(match failure {
                    Some(f) => f.merge(e),
                    None => e,
                })
            }
        }
    }
    match failure {
        Some(f) => Err(f),
        None => Ok(compiled),
    }
}
