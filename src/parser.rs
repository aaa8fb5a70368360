//! Formula Parser - nom-based, produces the raw [`Expr`] tree
//!
//! Grammar (lowest precedence first, all binary operators left-associative):
//!
//! ```text
//! expr       := or
//! or         := and ( "||" and )*
//! and        := equality ( "&&" equality )*
//! equality   := relational ( ("=" | "!=") relational )*
//! relational := additive ( ("<=" | ">=" | "<" | ">") additive )*
//! additive   := term ( ("+" | "-") term )*
//! term       := unary ( ("*" | "/") unary )*
//! unary      := ("-" | "+" | "!") unary | primary
//! primary    := "(" expr ")" | literal | call | chain
//! call       := NAME "(" [ expr ( ";" expr )* ] ")"
//! chain      := segment ( "." segment | "[" INT "]" | "[" STRING "]" )*
//! segment    := NAME [ "@default" ]
//! literal    := STRING | NUMBER [ CURRENCY ] | "true" | "false"
//! ```
//!
//! Identifiers stay raw here; see [`crate::identifier`] for resolution.

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, tag, take_while_m_n},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0, none_of, satisfy},
    combinator::{all_consuming, cut, not, opt, peek, recognize, value},
    error::{context, VerboseError, VerboseErrorKind},
    multi::many0,
    sequence::{delimited, pair, terminated},
    IResult,
};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::ast::*;
use crate::diagnostics::{Diagnostic, DiagnosticCode};

type PResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

const INVALID_LITERAL: &str = "invalid literal";

// ============================================================================
// Public API
// ============================================================================

/// Parse a complete formula expression.
///
/// A parse failure is reported as a single diagnostic pointing at the
/// offset where parsing stopped.
pub fn parse_formula(input: &str) -> Result<Expr, Diagnostic> {
    let result = all_consuming(delimited(
        multispace0,
        |i| expression(i, State::new(input)),
        multispace0,
    ))(input);

    match result {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(syntax_error(input, &e)),
        Err(nom::Err::Incomplete(_)) => Err(Diagnostic::error(
            DiagnosticCode::SyntaxError,
            "incomplete input",
        )),
    }
}

fn syntax_error(source: &str, error: &VerboseError<&str>) -> Diagnostic {
    let offset = error
        .errors
        .first()
        .map(|(rest, _)| source.len() - rest.len())
        .unwrap_or(0);

    let expected = error.errors.iter().find_map(|(_, kind)| match kind {
        VerboseErrorKind::Context(ctx) => Some(*ctx),
        _ => None,
    });

    let found = match source[offset..].chars().next() {
        Some(c) => format!("'{}'", c),
        None => "end of input".to_string(),
    };

    let (code, message) = match expected {
        Some(INVALID_LITERAL) => (
            DiagnosticCode::InvalidLiteral,
            format!("invalid literal at offset {}", offset),
        ),
        Some(NESTING_TOO_DEEP) => (
            DiagnosticCode::SyntaxError,
            format!("expression nested too deeply at offset {}", offset),
        ),
        Some(ctx) => (
            DiagnosticCode::SyntaxError,
            format!("unexpected {}, expected {}", found, ctx),
        ),
        None => (DiagnosticCode::SyntaxError, format!("unexpected {}", found)),
    };

    let end = source[offset..]
        .chars()
        .next()
        .map(|c| offset + c.len_utf8())
        .unwrap_or(offset);
    Diagnostic::error(code, message).with_span(Span::new(offset, end))
}

fn offset(input: &str, original: &str) -> usize {
    original.len() - input.len()
}

// ============================================================================
// Nesting Limits
// ============================================================================

/// Parentheses, prefix operators and call argument lists nested deeper than
/// this are rejected
pub const MAX_NESTING_DEPTH: usize = 64;

/// Expression trees higher than this are rejected. Long operator chains
/// nest to the left, so this also bounds the length of one chain.
pub const MAX_EXPRESSION_DEPTH: usize = 256;

const NESTING_TOO_DEEP: &str = "nesting too deep";

/// Threaded through the recursive levels
#[derive(Clone, Copy)]
struct State<'a> {
    original: &'a str,
    nesting: usize,
}

impl<'a> State<'a> {
    fn new(original: &'a str) -> Self {
        Self {
            original,
            nesting: 0,
        }
    }

    /// One level further in, failing once the nesting limit is passed
    fn nested(self, input: &'a str) -> Result<Self, nom::Err<VerboseError<&'a str>>> {
        if self.nesting >= MAX_NESTING_DEPTH {
            return Err(too_deep(input));
        }
        Ok(Self {
            nesting: self.nesting + 1,
            ..self
        })
    }
}

fn too_deep(input: &str) -> nom::Err<VerboseError<&str>> {
    nom::Err::Failure(VerboseError {
        errors: vec![(input, VerboseErrorKind::Context(NESTING_TOO_DEEP))],
    })
}

fn check_depth<'a>(expr: Expr, input: &'a str) -> PResult<'a, Expr> {
    if expr.depth() > MAX_EXPRESSION_DEPTH {
        return Err(too_deep(input));
    }
    Ok((input, expr))
}

// ============================================================================
// Operator Levels
// ============================================================================

type LevelParser<'a> = fn(&'a str, State<'a>) -> PResult<'a, Expr>;
type OperatorParser<'a> = fn(&'a str) -> PResult<'a, BinaryOperator>;

fn expression<'a>(input: &'a str, state: State<'a>) -> PResult<'a, Expr> {
    or_expr(input, state)
}

/// One left-associative precedence level
fn binary_level<'a>(
    input: &'a str,
    state: State<'a>,
    operand: LevelParser<'a>,
    operator: OperatorParser<'a>,
) -> PResult<'a, Expr> {
    let (mut input, mut left) = operand(input, state)?;
    let mut depth = left.depth();

    loop {
        let (rest, _) = multispace0(input)?;
        let (rest, op) = match operator(rest) {
            Ok(ok) => ok,
            Err(nom::Err::Error(_)) => return Ok((input, left)),
            Err(e) => return Err(e),
        };
        let (rest, _) = multispace0(rest)?;
        let (rest, right) = cut(context("operand", |i| operand(i, state)))(rest)?;

        depth = 1 + depth.max(right.depth());
        if depth > MAX_EXPRESSION_DEPTH {
            return Err(too_deep(rest));
        }

        let span = Span::merge(left.span(), right.span());
        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            span,
        };
        input = rest;
    }
}

fn or_expr<'a>(input: &'a str, state: State<'a>) -> PResult<'a, Expr> {
    binary_level(input, state, and_expr, or_op)
}

fn and_expr<'a>(input: &'a str, state: State<'a>) -> PResult<'a, Expr> {
    binary_level(input, state, equality, and_op)
}

fn equality<'a>(input: &'a str, state: State<'a>) -> PResult<'a, Expr> {
    binary_level(input, state, relational, equality_op)
}

fn relational<'a>(input: &'a str, state: State<'a>) -> PResult<'a, Expr> {
    binary_level(input, state, additive, relational_op)
}

fn additive<'a>(input: &'a str, state: State<'a>) -> PResult<'a, Expr> {
    binary_level(input, state, term, additive_op)
}

fn term<'a>(input: &'a str, state: State<'a>) -> PResult<'a, Expr> {
    binary_level(input, state, unary, multiplicative_op)
}

fn or_op(input: &str) -> PResult<'_, BinaryOperator> {
    value(BinaryOperator::Or, tag("||"))(input)
}

fn and_op(input: &str) -> PResult<'_, BinaryOperator> {
    value(BinaryOperator::And, tag("&&"))(input)
}

fn equality_op(input: &str) -> PResult<'_, BinaryOperator> {
    alt((
        value(BinaryOperator::NotEq, tag("!=")),
        value(BinaryOperator::Eq, tag("=")),
    ))(input)
}

fn relational_op(input: &str) -> PResult<'_, BinaryOperator> {
    // Two-character operators first
    alt((
        value(BinaryOperator::Le, tag("<=")),
        value(BinaryOperator::Ge, tag(">=")),
        value(BinaryOperator::Lt, tag("<")),
        value(BinaryOperator::Gt, tag(">")),
    ))(input)
}

fn additive_op(input: &str) -> PResult<'_, BinaryOperator> {
    alt((
        value(BinaryOperator::Plus, char('+')),
        value(BinaryOperator::Minus, char('-')),
    ))(input)
}

fn multiplicative_op(input: &str) -> PResult<'_, BinaryOperator> {
    alt((
        value(BinaryOperator::Multiply, char('*')),
        value(BinaryOperator::Divide, char('/')),
    ))(input)
}

fn unary<'a>(input: &'a str, state: State<'a>) -> PResult<'a, Expr> {
    let (input, _) = multispace0(input)?;
    let start = offset(input, state.original);

    let (rest, op) = opt(alt((
        value(UnaryOperator::Minus, char('-')),
        value(UnaryOperator::Plus, char('+')),
        value(UnaryOperator::Not, char('!')),
    )))(input)?;

    match op {
        Some(op) => {
            let inner = state.nested(input)?;
            let (rest, _) = multispace0(rest)?;
            let (rest, operand) = cut(context("operand", |i| unary(i, inner)))(rest)?;
            let span = Span::new(start, operand.span().end);
            check_depth(
                Expr::Unary {
                    op,
                    operand: Box::new(operand),
                    span,
                },
                rest,
            )
        }
        None => primary(input, state),
    }
}

// ============================================================================
// Primaries
// ============================================================================

fn primary<'a>(input: &'a str, state: State<'a>) -> PResult<'a, Expr> {
    let (input, _) = multispace0(input)?;
    context(
        "expression",
        alt((
            |i| parenthesized(i, state),
            |i| literal(i, state.original),
            |i| call_or_chain(i, state),
        )),
    )(input)
}

fn parenthesized<'a>(input: &'a str, state: State<'a>) -> PResult<'a, Expr> {
    let (input, _) = char('(')(input)?;
    let inner = state.nested(input)?;
    let (input, _) = multispace0(input)?;
    let (input, expr) = cut(|i| expression(i, inner))(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = cut(context("closing parenthesis", char(')')))(input)?;
    Ok((input, expr))
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Succeeds when the next character cannot continue an identifier
fn word_boundary(input: &str) -> PResult<'_, ()> {
    not(peek(satisfy(is_identifier_char)))(input)
}

fn name(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

// ============================================================================
// Literals
// ============================================================================

fn literal<'a>(input: &'a str, original: &'a str) -> PResult<'a, Expr> {
    let start = offset(input, original);
    let (rest, value) = alt((string_literal, number_literal, boolean_literal))(input)?;
    let span = Span::new(start, offset(rest, original));
    Ok((rest, Expr::Literal { value, span }))
}

fn boolean_literal(input: &str) -> PResult<'_, Literal> {
    alt((
        value(Literal::Boolean(true), terminated(tag("true"), word_boundary)),
        value(Literal::Boolean(false), terminated(tag("false"), word_boundary)),
    ))(input)
}

fn string_literal(input: &str) -> PResult<'_, Literal> {
    let (input, _) = char('"')(input)?;
    // escaped_transform rejects empty content, so check for "" explicitly
    if let Ok((rest, _)) = char::<_, VerboseError<&str>>('"')(input) {
        return Ok((rest, Literal::String(String::new())));
    }
    let (input, s) = cut(terminated(
        escaped_transform(
            none_of("\"\\"),
            '\\',
            alt((
                value('\\', char('\\')),
                value('"', char('"')),
                value('\n', char('n')),
                value('\t', char('t')),
            )),
        ),
        context("closing quote", char('"')),
    ))(input)?;
    Ok((input, Literal::String(s)))
}

/// Integer, decimal or money literal
fn number_literal(input: &str) -> PResult<'_, Literal> {
    let (rest, digits) = recognize(pair(digit1, opt(pair(char('.'), digit1))))(input)?;
    let (rest, currency) = opt(terminated(
        take_while_m_n(3, 3, |c: char| c.is_ascii_uppercase()),
        word_boundary,
    ))(rest)?;
    let (rest, _) = word_boundary(rest)?;

    let invalid = || {
        nom::Err::Failure(VerboseError {
            errors: vec![(input, VerboseErrorKind::Context(INVALID_LITERAL))],
        })
    };

    let literal = match currency {
        Some(currency) => Literal::Money {
            amount: Decimal::from_str(digits).map_err(|_| invalid())?,
            currency: currency.to_string(),
        },
        None if digits.contains('.') => {
            Literal::Decimal(Decimal::from_str(digits).map_err(|_| invalid())?)
        }
        None => Literal::Integer(digits.parse::<i32>().map_err(|_| invalid())?),
    };
    Ok((rest, literal))
}

// ============================================================================
// Function Calls and Identifier Chains
// ============================================================================

fn call_or_chain<'a>(input: &'a str, state: State<'a>) -> PResult<'a, Expr> {
    let start = offset(input, state.original);
    let (after_name, fn_name) = name(input)?;

    let (after_ws, _) = multispace0(after_name)?;
    if let Ok((rest, _)) = char::<_, VerboseError<&str>>('(')(after_ws) {
        let (rest, args) = call_arguments(rest, state.nested(rest)?)?;
        let span = Span::new(start, offset(rest, state.original));
        return check_depth(
            Expr::Call {
                name: fn_name.to_string(),
                args,
                span,
            },
            rest,
        );
    }

    identifier_chain(input, state.original)
}

fn call_arguments<'a>(input: &'a str, state: State<'a>) -> PResult<'a, Vec<Expr>> {
    let (input, _) = multispace0(input)?;
    if let Ok((rest, _)) = char::<_, VerboseError<&str>>(')')(input) {
        return Ok((rest, Vec::new()));
    }

    let mut args = Vec::new();
    let mut remaining = input;
    loop {
        let (rest, arg) = cut(|i| expression(i, state))(remaining)?;
        args.push(arg);
        let (rest, _) = multispace0(rest)?;
        if let Ok((rest, _)) = char::<_, VerboseError<&str>>(';')(rest) {
            remaining = rest;
            continue;
        }
        let (rest, _) = cut(context("';' or ')'", char(')')))(rest)?;
        return Ok((rest, args));
    }
}

fn identifier_chain<'a>(input: &'a str, original: &'a str) -> PResult<'a, Expr> {
    let start = offset(input, original);
    let (mut input, first) = name_segment(input, original)?;
    let mut segments = vec![first];

    loop {
        if let Ok((rest, _)) = char::<_, VerboseError<&str>>('.')(input) {
            let (rest, segment) = cut(context("identifier", |i| name_segment(i, original)))(rest)?;
            segments.push(segment);
            input = rest;
        } else if input.starts_with('[') {
            let (rest, segment) = bracket_segment(input, original)?;
            segments.push(segment);
            input = rest;
        } else {
            break;
        }
    }

    let span = Span::new(start, offset(input, original));
    Ok((input, Expr::Identifier(IdentifierChain { segments, span })))
}

fn name_segment<'a>(input: &'a str, original: &'a str) -> PResult<'a, Segment> {
    let start = offset(input, original);
    let (rest, n) = name(input)?;
    let (rest, default) = opt(terminated(tag("@default"), word_boundary))(rest)?;
    Ok((
        rest,
        Segment {
            kind: SegmentKind::Name {
                name: n.to_string(),
                default_value: default.is_some(),
            },
            span: Span::new(start, offset(rest, original)),
        },
    ))
}

fn bracket_segment<'a>(input: &'a str, original: &'a str) -> PResult<'a, Segment> {
    let start = offset(input, original);
    let (rest, _) = char('[')(input)?;
    let (rest, _) = multispace0(rest)?;

    let (rest, kind) = if let Ok((r, digits)) = digit1::<_, VerboseError<&str>>(rest) {
        // Indices share the Integer literal range
        let index = digits
            .parse::<i32>()
            .ok()
            .and_then(|i| u32::try_from(i).ok())
            .ok_or_else(|| {
                nom::Err::Failure(VerboseError {
                    errors: vec![(rest, VerboseErrorKind::Context(INVALID_LITERAL))],
                })
            })?;
        (r, SegmentKind::Index(index))
    } else {
        match cut(context("index or qualifier", string_literal))(rest)? {
            (r, Literal::String(q)) => (r, SegmentKind::Qualifier(q)),
            (r, _) => (r, SegmentKind::Qualifier(String::new())),
        }
    };

    let (rest, _) = multispace0(rest)?;
    let (rest, _) = cut(context("closing bracket", char(']')))(rest)?;
    Ok((
        rest,
        Segment {
            kind,
            span: Span::new(start, offset(rest, original)),
        },
    ))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chain(expr: &Expr) -> &IdentifierChain {
        match expr {
            Expr::Identifier(chain) => chain,
            other => panic!("Expected identifier chain, got {:?}", other),
        }
    }

    #[test]
    fn test_simple_chain() {
        let expr = parse_formula("policy.premium").unwrap();
        let chain = chain(&expr);
        assert_eq!(chain.segments.len(), 2);
        assert_eq!(chain.span, Span::new(0, 14));
        assert_eq!(chain.segments[1].span, Span::new(7, 14));
        assert_eq!(chain.to_string(), "policy.premium");
    }

    #[test]
    fn test_chain_with_index_and_qualifier() {
        let expr = parse_formula(r#"policy.coverages[0].premium + policy.coverages["CovA"].premium"#)
            .unwrap();
        let Expr::Binary { left, right, .. } = &expr else {
            panic!("Expected binary expression");
        };
        let left = chain(left);
        assert_eq!(left.segments[2].kind, SegmentKind::Index(0));
        let right = chain(right);
        assert_eq!(
            right.segments[2].kind,
            SegmentKind::Qualifier("CovA".to_string())
        );
    }

    #[test]
    fn test_default_value_suffix() {
        let expr = parse_formula("policy.premium@default").unwrap();
        assert_eq!(
            chain(&expr).segments[1].kind,
            SegmentKind::Name {
                name: "premium".to_string(),
                default_value: true
            }
        );
    }

    #[test]
    fn test_precedence() {
        let expr = parse_formula("a + b * c = d || !e && f").unwrap();
        assert_eq!(expr.to_formula_string(), "(((a + (b * c)) = d) || (!e && f))");
    }

    #[test]
    fn test_left_associativity() {
        let expr = parse_formula("a - b - c").unwrap();
        assert_eq!(expr.to_formula_string(), "((a - b) - c)");
    }

    #[test]
    fn test_parentheses() {
        let expr = parse_formula("(a + b) * c").unwrap();
        assert_eq!(expr.to_formula_string(), "((a + b) * c)");
    }

    #[test]
    fn test_relational_two_char_operators() {
        let expr = parse_formula("a <= b").unwrap();
        assert!(matches!(
            expr,
            Expr::Binary {
                op: BinaryOperator::Le,
                ..
            }
        ));
        let expr = parse_formula("a != b").unwrap();
        assert!(matches!(
            expr,
            Expr::Binary {
                op: BinaryOperator::NotEq,
                ..
            }
        ));
    }

    #[test]
    fn test_literals() {
        let lit = |src: &str| match parse_formula(src).unwrap() {
            Expr::Literal { value, .. } => value,
            other => panic!("Expected literal, got {:?}", other),
        };
        assert_eq!(lit("42"), Literal::Integer(42));
        assert_eq!(lit("3.25"), Literal::Decimal(Decimal::from_str("3.25").unwrap()));
        assert_eq!(
            lit("10.50EUR"),
            Literal::Money {
                amount: Decimal::from_str("10.50").unwrap(),
                currency: "EUR".to_string()
            }
        );
        assert_eq!(lit(r#""a \"b\"""#), Literal::String("a \"b\"".to_string()));
        assert_eq!(lit(r#""""#), Literal::String(String::new()));
        assert_eq!(lit("true"), Literal::Boolean(true));
        assert_eq!(lit("false"), Literal::Boolean(false));
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        let expr = parse_formula("trueValue").unwrap();
        assert_eq!(chain(&expr).to_string(), "trueValue");
    }

    #[test]
    fn test_unary_minus() {
        let expr = parse_formula("-policy.premium").unwrap();
        assert!(matches!(
            expr,
            Expr::Unary {
                op: UnaryOperator::Minus,
                ..
            }
        ));
        assert_eq!(expr.span(), Span::new(0, 15));
    }

    #[test]
    fn test_function_call() {
        let expr = parse_formula("ROUND(policy.premium * 1.1; 2)").unwrap();
        let Expr::Call { name, args, span } = &expr else {
            panic!("Expected call");
        };
        assert_eq!(name, "ROUND");
        assert_eq!(args.len(), 2);
        assert_eq!(*span, Span::new(0, 30));
    }

    #[test]
    fn test_empty_call() {
        let expr = parse_formula("NOW()").unwrap();
        assert!(matches!(expr, Expr::Call { ref args, .. } if args.is_empty()));
    }

    #[test]
    fn test_whitespace_variations() {
        let expr = parse_formula("  a\n+\tb  ").unwrap();
        assert_eq!(expr.to_formula_string(), "(a + b)");
    }

    #[test]
    fn test_error_missing_operand() {
        let diag = parse_formula("a +").unwrap_err();
        assert_eq!(diag.code, DiagnosticCode::SyntaxError);
        assert_eq!(diag.span, Some(Span::new(3, 3)));
        assert!(diag.message.contains("end of input"));
    }

    #[test]
    fn test_error_unclosed_paren() {
        let diag = parse_formula("(a + b").unwrap_err();
        assert_eq!(diag.code, DiagnosticCode::SyntaxError);
        assert!(diag.message.contains("closing parenthesis"));
    }

    #[test]
    fn test_error_unclosed_bracket() {
        assert!(parse_formula("a.b[0").is_err());
        assert!(parse_formula("a.b[x]").is_err());
    }

    #[test]
    fn test_error_trailing_dot() {
        assert!(parse_formula("policy.").is_err());
    }

    #[test]
    fn test_error_trailing_garbage() {
        let diag = parse_formula("a b").unwrap_err();
        assert_eq!(diag.span, Some(Span::new(2, 3)));
    }

    #[test]
    fn test_error_integer_out_of_range() {
        let diag = parse_formula("99999999999999999999").unwrap_err();
        assert_eq!(diag.code, DiagnosticCode::InvalidLiteral);
    }

    #[test]
    fn test_escaped_string_reparses() {
        let source = r#""line\nnext\t\"quoted\" \\""#;
        let expr = parse_formula(source).unwrap();
        let Expr::Literal { value, .. } = &expr else {
            panic!("Expected literal");
        };
        assert_eq!(*value, Literal::String("line\nnext\t\"quoted\" \\".to_string()));

        let rendered = expr.to_formula_string();
        assert_eq!(rendered, source);
        let Expr::Literal { value: reparsed, .. } = parse_formula(&rendered).unwrap() else {
            panic!("Expected literal");
        };
        assert_eq!(reparsed, *value);

        let expr = parse_formula(r#"coverages["a\"b\nc"]"#).unwrap();
        let rendered = expr.to_formula_string();
        assert_eq!(rendered, r#"coverages["a\"b\nc"]"#);
        assert_eq!(parse_formula(&rendered).unwrap().to_formula_string(), rendered);
    }

    #[test]
    fn test_integer_literal_range() {
        assert_eq!(
            parse_formula("2147483647").unwrap(),
            Expr::Literal {
                value: Literal::Integer(i32::MAX),
                span: Span::new(0, 10),
            }
        );
        let diag = parse_formula("2147483648").unwrap_err();
        assert_eq!(diag.code, DiagnosticCode::InvalidLiteral);
    }

    #[test]
    fn test_index_range() {
        let expr = parse_formula("policy.coverages[2147483647]").unwrap();
        assert_eq!(
            chain(&expr).segments[2].kind,
            SegmentKind::Index(2147483647)
        );
        let diag = parse_formula("policy.coverages[2147483648]").unwrap_err();
        assert_eq!(diag.code, DiagnosticCode::InvalidLiteral);
    }

    #[test]
    fn test_moderate_nesting_parses() {
        let input = format!("{}1{}", "(".repeat(32), ")".repeat(32));
        assert!(parse_formula(&input).is_ok());

        let input = format!("{}1{}", "ABS(".repeat(16), ")".repeat(16));
        assert!(parse_formula(&input).is_ok());
    }

    #[test]
    fn test_deep_parentheses_rejected() {
        let input = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        let diag = parse_formula(&input).unwrap_err();
        assert_eq!(diag.code, DiagnosticCode::SyntaxError);
        assert!(diag.message.contains("nested too deeply"), "{}", diag.message);
    }

    #[test]
    fn test_deep_prefix_operators_rejected() {
        let input = format!("{}true", "!".repeat(10_000));
        let diag = parse_formula(&input).unwrap_err();
        assert_eq!(diag.code, DiagnosticCode::SyntaxError);
        assert!(diag.message.contains("nested too deeply"), "{}", diag.message);
    }

    #[test]
    fn test_deep_calls_rejected() {
        let input = format!("{}1{}", "ABS(".repeat(10_000), ")".repeat(10_000));
        let diag = parse_formula(&input).unwrap_err();
        assert_eq!(diag.code, DiagnosticCode::SyntaxError);
    }

    #[test]
    fn test_long_operator_chain_rejected() {
        let input = vec!["1"; 10_001].join(" + ");
        let diag = parse_formula(&input).unwrap_err();
        assert_eq!(diag.code, DiagnosticCode::SyntaxError);
        assert!(diag.message.contains("nested too deeply"), "{}", diag.message);

        let input = vec!["1"; 100].join(" + ");
        assert!(parse_formula(&input).is_ok());
    }

    #[test]
    fn test_error_empty_input() {
        assert!(parse_formula("   ").is_err());
    }
}
