//! FL Types - Level 1 Foundation Types
//!
//! This crate holds the datatype model every other part of the formula
//! compiler builds on. It depends on nothing in the workspace.
//!
//! ## Contents
//!
//! - [`Datatype`]: the static type of a compiled expression (value
//!   datatypes, enum types, policy/product model types, lists)
//! - Value-datatype queries used by validation logic: `subtract`,
//!   `divisible_without_remainder`, `has_decimal_places`
//! - [`Money`]: amount + currency value used by the Money datatype
//!
//! ## Numeric semantics
//!
//! Decimal, BigDecimal and Money arithmetic is exact (arbitrary precision).
//! Double subtraction is plain IEEE arithmetic, but Double divisibility is
//! checked with exact decimal arithmetic on the textual values.

use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// DATATYPE MODEL
// ============================================================================

/// Static type of a formula expression or identifier-chain segment.
///
/// Equality is exact. `Product { generation: true }` and
/// `Product { generation: false }` are different types, and `List<Decimal>`
/// never equals `Decimal`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Datatype {
    Boolean,
    Integer,
    Decimal,
    BigDecimal,
    Double,
    Money,
    String,
    /// Enum type by name
    Enum(String),
    /// Policy component type by name
    Policy(String),
    /// Product component type by name. `generation` marks a value that is a
    /// time-sliced generation of the product component rather than the
    /// product component itself.
    Product { name: String, generation: bool },
    /// List of values, produced by to-many navigation or multi-valued attributes
    List(Box<Datatype>),
}

impl Datatype {
    pub fn list_of(element: Datatype) -> Self {
        Datatype::List(Box::new(element))
    }

    pub fn policy(name: impl Into<String>) -> Self {
        Datatype::Policy(name.into())
    }

    pub fn product(name: impl Into<String>) -> Self {
        Datatype::Product {
            name: name.into(),
            generation: false,
        }
    }

    pub fn product_generation(name: impl Into<String>) -> Self {
        Datatype::Product {
            name: name.into(),
            generation: true,
        }
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        Datatype::Enum(name.into())
    }

    /// Look up one of the predefined value datatypes by name
    pub fn value_datatype(name: &str) -> Option<Self> {
        match name {
            "Boolean" | "boolean" => Some(Datatype::Boolean),
            "Integer" | "int" => Some(Datatype::Integer),
            "Decimal" => Some(Datatype::Decimal),
            "BigDecimal" => Some(Datatype::BigDecimal),
            "Double" | "double" => Some(Datatype::Double),
            "Money" => Some(Datatype::Money),
            "String" => Some(Datatype::String),
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Datatype::List(_))
    }

    /// Element type of a list, `None` for scalar datatypes
    pub fn element_type(&self) -> Option<&Datatype> {
        match self {
            Datatype::List(inner) => Some(inner),
            _ => None,
        }
    }

    /// Name of the policy/product type, `None` for anything else
    pub fn model_type_name(&self) -> Option<&str> {
        match self {
            Datatype::Policy(name) | Datatype::Product { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Whether values of this datatype may carry a fractional part
    pub fn has_decimal_places(&self) -> bool {
        matches!(
            self,
            Datatype::Decimal | Datatype::BigDecimal | Datatype::Double | Datatype::Money
        )
    }

    // ========================================================================
    // VALUE QUERIES
    // ========================================================================

    /// Subtract two values given in their textual form, returning the
    /// difference in the same form.
    pub fn subtract(&self, minuend: &str, subtrahend: &str) -> Result<String, DatatypeError> {
        match self {
            Datatype::Decimal | Datatype::BigDecimal => {
                let a = parse_exact(self, minuend)?;
                let b = parse_exact(self, subtrahend)?;
                Ok((a - b).to_string())
            }
            Datatype::Money => {
                let a = Money::parse(minuend)?;
                let b = Money::parse(subtrahend)?;
                Ok(a.checked_sub(&b)?.to_string())
            }
            Datatype::Double => {
                let a = parse_double(minuend)?;
                let b = parse_double(subtrahend)?;
                Ok((a - b).to_string())
            }
            Datatype::Integer => {
                let a = parse_integer(minuend)?;
                let b = parse_integer(subtrahend)?;
                a.checked_sub(b)
                    .map(|d| d.to_string())
                    .ok_or(DatatypeError::Overflow)
            }
            other => Err(DatatypeError::NotNumeric(other.to_string())),
        }
    }

    /// Whether `dividend` is an exact multiple of `divisor`.
    ///
    /// A zero divisor is an error, never `false`.
    pub fn divisible_without_remainder(
        &self,
        dividend: &str,
        divisor: &str,
    ) -> Result<bool, DatatypeError> {
        match self {
            Datatype::Decimal | Datatype::BigDecimal | Datatype::Double => {
                let a = parse_exact(self, dividend)?;
                let b = parse_exact(self, divisor)?;
                exact_divisible(&a, &b)
            }
            Datatype::Money => {
                let a = Money::parse(dividend)?;
                let b = Money::parse(divisor)?;
                if a.currency != b.currency {
                    return Err(DatatypeError::CurrencyMismatch(a.currency, b.currency));
                }
                exact_divisible(&a.amount, &b.amount)
            }
            Datatype::Integer => {
                let a = parse_integer(dividend)?;
                let b = parse_integer(divisor)?;
                if b == 0 {
                    return Err(DatatypeError::DivisionByZero);
                }
                Ok(a.checked_rem(b).map(|r| r == 0).unwrap_or(true))
            }
            other => Err(DatatypeError::NotNumeric(other.to_string())),
        }
    }

    /// Whether `value` is a valid textual value of this datatype
    pub fn is_parsable(&self, value: &str) -> bool {
        match self {
            Datatype::Decimal | Datatype::BigDecimal => BigDecimal::from_str(value).is_ok(),
            Datatype::Double => parse_double(value).is_ok(),
            Datatype::Integer => parse_integer(value).is_ok(),
            Datatype::Money => Money::parse(value).is_ok(),
            Datatype::Boolean => matches!(value, "true" | "false"),
            Datatype::String => true,
            _ => false,
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datatype::Boolean => write!(f, "Boolean"),
            Datatype::Integer => write!(f, "Integer"),
            Datatype::Decimal => write!(f, "Decimal"),
            Datatype::BigDecimal => write!(f, "BigDecimal"),
            Datatype::Double => write!(f, "Double"),
            Datatype::Money => write!(f, "Money"),
            Datatype::String => write!(f, "String"),
            Datatype::Enum(name) | Datatype::Policy(name) => write!(f, "{}", name),
            Datatype::Product {
                name,
                generation: false,
            } => write!(f, "{}", name),
            Datatype::Product {
                name,
                generation: true,
            } => write!(f, "{}Gen", name),
            Datatype::List(inner) => write!(f, "List<{}>", inner),
        }
    }
}

fn parse_exact(datatype: &Datatype, value: &str) -> Result<BigDecimal, DatatypeError> {
    BigDecimal::from_str(value.trim()).map_err(|_| DatatypeError::InvalidValue {
        datatype: datatype.to_string(),
        value: value.to_string(),
    })
}

fn parse_double(value: &str) -> Result<f64, DatatypeError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| DatatypeError::InvalidValue {
            datatype: "Double".to_string(),
            value: value.to_string(),
        })
}

fn parse_integer(value: &str) -> Result<i64, DatatypeError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| DatatypeError::InvalidValue {
            datatype: "Integer".to_string(),
            value: value.to_string(),
        })
}

fn exact_divisible(dividend: &BigDecimal, divisor: &BigDecimal) -> Result<bool, DatatypeError> {
    if divisor.is_zero() {
        return Err(DatatypeError::DivisionByZero);
    }
    Ok((dividend % divisor).is_zero())
}

// ============================================================================
// MONEY
// ============================================================================

/// Money value: exact amount plus ISO currency code, written `10.50EUR`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: BigDecimal,
    pub currency: String,
}

impl Money {
    /// Parse `10.50EUR` or `10.50 EUR`
    pub fn parse(value: &str) -> Result<Self, DatatypeError> {
        let invalid = || DatatypeError::InvalidValue {
            datatype: "Money".to_string(),
            value: value.to_string(),
        };
        let trimmed = value.trim();
        if trimmed.len() < 4 || !trimmed.is_char_boundary(trimmed.len() - 3) {
            return Err(invalid());
        }
        let (amount, currency) = trimmed.split_at(trimmed.len() - 3);
        if !is_currency_code(currency) {
            return Err(invalid());
        }
        let amount = BigDecimal::from_str(amount.trim_end()).map_err(|_| invalid())?;
        Ok(Self {
            amount,
            currency: currency.to_string(),
        })
    }

    pub fn checked_sub(&self, other: &Money) -> Result<Money, DatatypeError> {
        if self.currency != other.currency {
            return Err(DatatypeError::CurrencyMismatch(
                self.currency.clone(),
                other.currency.clone(),
            ));
        }
        Ok(Money {
            amount: &self.amount - &other.amount,
            currency: self.currency.clone(),
        })
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.currency)
    }
}

/// Three upper-case ASCII letters
pub fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase())
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DatatypeError {
    #[error("'{value}' is not a valid {datatype} value")]
    InvalidValue { datatype: String, value: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow")]
    Overflow,

    #[error("currency mismatch: {0} vs {1}")]
    CurrencyMismatch(String, String),

    #[error("datatype {0} is not numeric")]
    NotNumeric(String),
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decimal_divisible() {
        assert_eq!(Datatype::Decimal.divisible_without_remainder("10", "3"), Ok(false));
        assert_eq!(Datatype::Decimal.divisible_without_remainder("10", "5"), Ok(true));
        assert_eq!(
            Datatype::Decimal.divisible_without_remainder("10", "0"),
            Err(DatatypeError::DivisionByZero)
        );
        assert_eq!(
            Datatype::Decimal.divisible_without_remainder("1.5", "0.5"),
            Ok(true)
        );
    }

    #[test]
    fn test_double_subtract_is_ieee() {
        let diff = Datatype::Double.subtract("0.3", "0.1").unwrap();
        assert_eq!(diff, (0.3f64 - 0.1f64).to_string());
        assert_ne!(diff, "0.2");
    }

    #[test]
    fn test_double_divisible_is_exact() {
        // 0.3 % 0.1 is not zero in IEEE arithmetic
        assert!(0.3f64 % 0.1f64 != 0.0);
        assert_eq!(Datatype::Double.divisible_without_remainder("0.3", "0.1"), Ok(true));
        assert_eq!(
            Datatype::Double.divisible_without_remainder("1", "0.0"),
            Err(DatatypeError::DivisionByZero)
        );
    }

    #[test]
    fn test_decimal_subtract_exact() {
        assert_eq!(Datatype::Decimal.subtract("10.5", "3.25").unwrap(), "7.25");
        assert_eq!(Datatype::BigDecimal.subtract("0.3", "0.1").unwrap(), "0.2");
    }

    #[test]
    fn test_integer_queries() {
        assert_eq!(Datatype::Integer.subtract("5", "7").unwrap(), "-2");
        assert_eq!(
            Datatype::Integer.subtract(&i64::MIN.to_string(), "1"),
            Err(DatatypeError::Overflow)
        );
        assert_eq!(Datatype::Integer.divisible_without_remainder("9", "3"), Ok(true));
        assert_eq!(Datatype::Integer.divisible_without_remainder("9", "2"), Ok(false));
        assert_eq!(
            Datatype::Integer.divisible_without_remainder("9", "0"),
            Err(DatatypeError::DivisionByZero)
        );
        assert!(!Datatype::Integer.has_decimal_places());
    }

    #[test]
    fn test_money() {
        assert_eq!(Datatype::Money.subtract("10.00EUR", "2.50EUR").unwrap(), "7.50EUR");
        assert!(matches!(
            Datatype::Money.subtract("10.00EUR", "2.50USD"),
            Err(DatatypeError::CurrencyMismatch(_, _))
        ));
        assert_eq!(
            Datatype::Money.divisible_without_remainder("10.00 EUR", "2.50EUR"),
            Ok(true)
        );
        assert!(Money::parse("10.00eur").is_err());
        assert!(Money::parse("EUR").is_err());
    }

    #[test]
    fn test_non_numeric() {
        assert!(matches!(
            Datatype::String.subtract("a", "b"),
            Err(DatatypeError::NotNumeric(_))
        ));
        assert!(!Datatype::Boolean.has_decimal_places());
        assert!(Datatype::Money.has_decimal_places());
    }

    #[test]
    fn test_invalid_value() {
        assert!(matches!(
            Datatype::Decimal.subtract("abc", "1"),
            Err(DatatypeError::InvalidValue { .. })
        ));
        assert!(!Datatype::Decimal.is_parsable("1.2.3"));
        assert!(Datatype::Money.is_parsable("3EUR"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Datatype::list_of(Datatype::Decimal).to_string(), "List<Decimal>");
        assert_eq!(Datatype::product_generation("CoverageType").to_string(), "CoverageTypeGen");
        assert_eq!(Datatype::policy("Policy").to_string(), "Policy");
    }

    #[test]
    fn test_serde_round_trip_of_nested_list() {
        let dt = Datatype::list_of(Datatype::policy("Coverage"));
        let json = serde_json::to_string(&dt).unwrap();
        let back: Datatype = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dt);
    }

    #[test]
    fn test_value_datatype_lookup() {
        assert_eq!(Datatype::value_datatype("Decimal"), Some(Datatype::Decimal));
        assert_eq!(Datatype::value_datatype("Coverage"), None);
    }
}
