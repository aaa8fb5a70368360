//! Built-in functions
//!
//! Functions are resolved like operators: by name, then by exact argument
//! datatypes. A function name may have several overloads.

use fl_types::Datatype;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use super::{CompilerConfig, Compiled};
use crate::code::{CodeFragment, DECIMAL_CLASS, ROUNDING_MODE_CLASS};

type FunctionEmitter = Arc<dyn Fn(&[&str], &CompilerConfig) -> String + Send + Sync>;

/// Accepted datatype of one argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Exact(Datatype),
    /// Any list datatype
    AnyList,
    /// Any datatype, but every `Same` argument of the call must agree
    Same,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnType {
    Fixed(Datatype),
    /// Datatype of the argument at this position
    SameAs(usize),
}

#[derive(Clone)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<ParamType>,
    pub returns: ReturnType,
    imports: Vec<&'static str>,
    emit: FunctionEmitter,
}

impl FunctionDef {
    pub fn new(
        name: impl Into<String>,
        params: Vec<ParamType>,
        returns: ReturnType,
        emit: impl Fn(&[&str], &CompilerConfig) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            params,
            returns,
            imports: Vec::new(),
            emit: Arc::new(emit),
        }
    }

    pub fn with_import(mut self, qualified_name: &'static str) -> Self {
        self.imports.push(qualified_name);
        self
    }

    pub fn matches(&self, args: &[Datatype]) -> bool {
        if args.len() != self.params.len() {
            return false;
        }
        let mut same: Option<&Datatype> = None;
        self.params.iter().zip(args).all(|(param, arg)| match param {
            ParamType::Exact(expected) => expected == arg,
            ParamType::AnyList => arg.is_list(),
            ParamType::Same => match same {
                Some(first) => first == arg,
                None => {
                    same = Some(arg);
                    true
                }
            },
        })
    }

    /// Caller must have checked `matches`
    pub fn apply(&self, args: &[Compiled], config: &CompilerConfig) -> Compiled {
        let sources: Vec<&str> = args.iter().map(|a| a.code.source()).collect();
        let fragments: Vec<&CodeFragment> = args.iter().map(|a| &a.code).collect();
        let mut code = CodeFragment::derived((self.emit)(&sources, config), &fragments);
        for import in &self.imports {
            code = code.with_import(*import);
        }

        let datatype = match &self.returns {
            ReturnType::Fixed(datatype) => datatype.clone(),
            ReturnType::SameAs(index) => args
                .get(*index)
                .or(args.first())
                .map(|a| a.datatype.clone())
                .unwrap_or(Datatype::Boolean),
        };

        let parts: Vec<&Compiled> = args.iter().collect();
        Compiled::derived(code, datatype, &parts)
    }
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .finish()
    }
}

/// Why a call could not be bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionLookupError {
    UndefinedFunction,
    WrongArgumentTypes,
}

#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, Vec<FunctionDef>>,
}

impl FunctionRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for function in standard_functions() {
            registry.register(function);
        }
        registry
    }

    /// Add an overload. An overload with identical parameters is replaced.
    pub fn register(&mut self, function: FunctionDef) {
        if let ReturnType::SameAs(index) = function.returns {
            if index >= function.params.len() {
                warn!(function = %function.name, index, "return type refers to a missing argument; not registered");
                return;
            }
        }
        let overloads = self.functions.entry(function.name.clone()).or_default();
        if let Some(existing) = overloads.iter_mut().find(|f| f.params == function.params) {
            warn!(function = %function.name, "replacing registered function overload");
            *existing = function;
        } else {
            overloads.push(function);
        }
    }

    /// Names are case-insensitive
    pub fn overloads(&self, name: &str) -> Option<&[FunctionDef]> {
        self.functions
            .get(&name.to_ascii_uppercase())
            .map(Vec::as_slice)
    }

    pub fn resolve(&self, name: &str, args: &[Datatype]) -> Result<&FunctionDef, FunctionLookupError> {
        let overloads = self
            .overloads(name)
            .ok_or(FunctionLookupError::UndefinedFunction)?;
        overloads
            .iter()
            .find(|f| f.matches(args))
            .ok_or(FunctionLookupError::WrongArgumentTypes)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.functions.keys()).finish()
    }
}

// =============================================================================
// STANDARD FUNCTIONS
// =============================================================================

fn exact(datatype: Datatype) -> ParamType {
    ParamType::Exact(datatype)
}

fn standard_functions() -> Vec<FunctionDef> {
    let mut functions = vec![
        FunctionDef::new(
            "IF",
            vec![exact(Datatype::Boolean), ParamType::Same, ParamType::Same],
            ReturnType::SameAs(1),
            |a, _| format!("({}.booleanValue() ? {} : {})", a[0], a[1], a[2]),
        ),
        FunctionDef::new(
            "NOT",
            vec![exact(Datatype::Boolean)],
            ReturnType::Fixed(Datatype::Boolean),
            |a, _| format!("Boolean.valueOf(!{})", a[0]),
        ),
        FunctionDef::new(
            "ROUND",
            vec![exact(Datatype::Decimal), exact(Datatype::Integer)],
            ReturnType::Fixed(Datatype::Decimal),
            |a, c| {
                format!(
                    "{}.setScale({}, RoundingMode.{})",
                    a[0],
                    a[1],
                    c.rounding_mode.java_name()
                )
            },
        )
        .with_import(ROUNDING_MODE_CLASS),
        FunctionDef::new(
            "ABS",
            vec![exact(Datatype::Decimal)],
            ReturnType::Fixed(Datatype::Decimal),
            |a, _| format!("{}.abs()", a[0]),
        ),
        FunctionDef::new(
            "ABS",
            vec![exact(Datatype::Money)],
            ReturnType::Fixed(Datatype::Money),
            |a, _| format!("{}.abs()", a[0]),
        ),
        FunctionDef::new(
            "ABS",
            vec![exact(Datatype::Integer)],
            ReturnType::Fixed(Datatype::Integer),
            |a, _| format!("Integer.valueOf(Math.abs({}))", a[0]),
        ),
        FunctionDef::new(
            "SUM",
            vec![exact(Datatype::list_of(Datatype::Decimal))],
            ReturnType::Fixed(Datatype::Decimal),
            |a, _| format!("{}.stream().reduce(Decimal.ZERO, Decimal::add)", a[0]),
        )
        .with_import(DECIMAL_CLASS),
        FunctionDef::new(
            "SUM",
            vec![exact(Datatype::list_of(Datatype::Integer))],
            ReturnType::Fixed(Datatype::Integer),
            |a, _| format!("{}.stream().reduce(0, Integer::sum)", a[0]),
        ),
        FunctionDef::new(
            "COUNT",
            vec![ParamType::AnyList],
            ReturnType::Fixed(Datatype::Integer),
            |a, _| format!("Integer.valueOf({}.size())", a[0]),
        ),
        FunctionDef::new(
            "ISEMPTY",
            vec![ParamType::AnyList],
            ReturnType::Fixed(Datatype::Boolean),
            |a, _| format!("Boolean.valueOf({}.isEmpty())", a[0]),
        ),
    ];

    for (name, method) in [("MIN", "min"), ("MAX", "max")] {
        for datatype in [Datatype::Decimal, Datatype::Money] {
            functions.push(FunctionDef::new(
                name,
                vec![exact(datatype.clone()), exact(datatype.clone())],
                ReturnType::Fixed(datatype),
                move |a, _| format!("{}.{}({})", a[0], method, a[1]),
            ));
        }
        functions.push(FunctionDef::new(
            name,
            vec![exact(Datatype::Integer), exact(Datatype::Integer)],
            ReturnType::Fixed(Datatype::Integer),
            move |a, _| format!("Integer.valueOf(Math.{}({}, {}))", method, a[0], a[1]),
        ));
    }

    functions
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn arg(source: &str, datatype: Datatype) -> Compiled {
        Compiled::new(CodeFragment::new(source), datatype)
    }

    #[test]
    fn test_resolve_by_name_and_types() {
        let registry = FunctionRegistry::standard();
        assert!(registry.resolve("ABS", &[Datatype::Money]).is_ok());
        assert!(registry.resolve("abs", &[Datatype::Integer]).is_ok());
        assert_eq!(
            registry.resolve("ABS", &[Datatype::String]).unwrap_err(),
            FunctionLookupError::WrongArgumentTypes
        );
        assert_eq!(
            registry.resolve("FOO", &[]).unwrap_err(),
            FunctionLookupError::UndefinedFunction
        );
    }

    #[test]
    fn test_if_requires_matching_branches() {
        let registry = FunctionRegistry::standard();
        let if_fn = registry
            .resolve("IF", &[Datatype::Boolean, Datatype::Money, Datatype::Money])
            .unwrap();
        let result = if_fn.apply(
            &[
                arg("c", Datatype::Boolean),
                arg("a", Datatype::Money),
                arg("b", Datatype::Money),
            ],
            &CompilerConfig::default(),
        );
        assert_eq!(result.datatype, Datatype::Money);
        assert_eq!(result.code.source(), "(c.booleanValue() ? a : b)");

        assert!(registry
            .resolve("IF", &[Datatype::Boolean, Datatype::Money, Datatype::Decimal])
            .is_err());
    }

    #[test]
    fn test_count_accepts_any_list() {
        let registry = FunctionRegistry::standard();
        let list = Datatype::list_of(Datatype::policy("Coverage"));
        assert!(registry.resolve("COUNT", &[list]).is_ok());
        assert!(registry.resolve("COUNT", &[Datatype::Integer]).is_err());
    }

    #[test]
    fn test_sum_of_decimals() {
        let registry = FunctionRegistry::standard();
        let list = Datatype::list_of(Datatype::Decimal);
        let sum = registry.resolve("SUM", &[list.clone()]).unwrap();
        let result = sum.apply(&[arg("xs", list)], &CompilerConfig::default());
        assert_eq!(result.code.source(), "xs.stream().reduce(Decimal.ZERO, Decimal::add)");
        assert_eq!(result.code.imports().collect::<Vec<_>>(), vec![DECIMAL_CLASS]);
    }

    #[test]
    fn test_register_replaces_same_signature() {
        let mut registry = FunctionRegistry::standard();
        registry.register(FunctionDef::new(
            "not",
            vec![ParamType::Exact(Datatype::Boolean)],
            ReturnType::Fixed(Datatype::Boolean),
            |a, _| format!("!{}", a[0]),
        ));
        assert_eq!(registry.overloads("NOT").unwrap().len(), 1);
    }
}
