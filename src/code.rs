//! Generated code fragments
//!
//! A [`CodeFragment`] is a piece of target-language (Java) source plus the
//! qualified class names it needs imported. Imports are kept in an ordered
//! set so the same input always yields byte-identical output.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub const DECIMAL_CLASS: &str = "org.faktorips.values.Decimal";
pub const MONEY_CLASS: &str = "org.faktorips.values.Money";
pub const ROUNDING_MODE_CLASS: &str = "java.math.RoundingMode";
pub const COLLECTORS_CLASS: &str = "java.util.stream.Collectors";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CodeFragment {
    source: String,
    imports: BTreeSet<String>,
}

impl CodeFragment {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            imports: BTreeSet::new(),
        }
    }

    pub fn with_import(mut self, qualified_name: impl Into<String>) -> Self {
        self.imports.insert(qualified_name.into());
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn imports(&self) -> impl Iterator<Item = &str> {
        self.imports.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Add all of `other`'s imports to this fragment
    pub fn merge_imports(&mut self, other: &CodeFragment) {
        self.imports.extend(other.imports.iter().cloned());
    }

    /// New fragment with `source`, inheriting the imports of every part it was built from
    pub fn derived(source: impl Into<String>, parts: &[&CodeFragment]) -> Self {
        let mut fragment = Self::new(source);
        for part in parts {
            fragment.merge_imports(part);
        }
        fragment
    }
}

impl fmt::Display for CodeFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// `premium` → `Premium`, for getter names
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Quote a string as a Java string literal
pub fn java_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_merges_imports_in_order() {
        let a = CodeFragment::new("a").with_import(MONEY_CLASS);
        let b = CodeFragment::new("b").with_import(DECIMAL_CLASS);
        let c = CodeFragment::derived("a.add(b)", &[&a, &b]);
        assert_eq!(c.source(), "a.add(b)");
        assert_eq!(c.imports().collect::<Vec<_>>(), vec![DECIMAL_CLASS, MONEY_CLASS]);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("premium"), "Premium");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_java_string_literal() {
        assert_eq!(java_string_literal("a\"b\\"), r#""a\"b\\""#);
    }
}
