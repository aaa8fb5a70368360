//! Operators, functions, formulas and model loading

mod helpers;

use faktor_fl::{
    compile_formula, CompilerConfig, Datatype, DiagnosticCode, ExprCompiler, FormulaSignature,
    ModelLoader, Parameter, RoundingMode,
};
use helpers::compiler;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn error_codes(text: &str) -> Vec<DiagnosticCode> {
    compiler()
        .compile(text)
        .unwrap_err()
        .diagnostics()
        .iter()
        .map(|d| d.code)
        .collect()
}

// =============================================================================
// Operators
// =============================================================================

#[test]
fn decimal_plus_money_is_undefined() {
    let err = compiler().compile("policy.premium + 10.50EUR").unwrap_err();
    assert_eq!(err.diagnostics().len(), 1);
    let diagnostic = &err.diagnostics()[0];
    assert_eq!(diagnostic.code, DiagnosticCode::UndefinedOperator);
    assert_eq!(
        diagnostic.message,
        "operator '+' is not defined for operand types (Decimal, Money)"
    );
    let location = diagnostic.location.unwrap();
    assert_eq!((location.start_col, location.end_col), (1, 26));
}

#[test]
fn no_promotion_between_integer_and_decimal() {
    assert_eq!(
        error_codes("policy.startYear + policy.premium"),
        vec![DiagnosticCode::UndefinedOperator]
    );
}

#[test]
fn money_arithmetic() {
    let compiled = compiler()
        .compile("policy.coverage[0].sumInsured - 100.00EUR")
        .unwrap();
    assert_eq!(
        compiled.code.source(),
        "policy.getCoverages().get(0).getSumInsured().subtract(Money.valueOf(\"100.00EUR\"))"
    );
    assert_eq!(compiled.datatype, Datatype::Money);
    assert_eq!(
        compiled.code.imports().collect::<Vec<_>>(),
        vec!["org.faktorips.values.Money"]
    );
}

#[test]
fn comparison_and_logic() {
    let compiled = compiler()
        .compile("policy.startYear >= 2020 && !(policy.premium < 0.0)")
        .unwrap();
    assert_eq!(compiled.datatype, Datatype::Boolean);
    assert_eq!(
        compiled.code.source(),
        "Boolean.valueOf(Boolean.valueOf(policy.getStartYear().compareTo(Integer.valueOf(2020)) >= 0) \
         && Boolean.valueOf(!Boolean.valueOf(policy.getPremium().compareTo(Decimal.valueOf(\"0.0\")) < 0)))"
    );
}

#[test]
fn division_follows_config() {
    let compiler = compiler().with_config(CompilerConfig {
        division_scale: 2,
        rounding_mode: RoundingMode::Floor,
        ..CompilerConfig::default()
    });
    let compiled = compiler.compile("policy.premium / 12.0").unwrap();
    assert_eq!(
        compiled.code.source(),
        "policy.getPremium().divide(Decimal.valueOf(\"12.0\"), 2, RoundingMode.FLOOR)"
    );
    assert_eq!(
        compiled.code.imports().collect::<Vec<_>>(),
        vec!["java.math.RoundingMode", "org.faktorips.values.Decimal"]
    );
}

#[test]
fn operators_on_lists_are_undefined() {
    assert_eq!(
        error_codes("policy.coverages.premium + 1.0"),
        vec![DiagnosticCode::UndefinedOperator]
    );
}

// =============================================================================
// Functions
// =============================================================================

#[test]
fn aggregate_functions_over_lifted_lists() {
    let compiler = compiler();
    assert_eq!(
        compiler.compile("SUM(policy.coverages.premium)").unwrap().datatype,
        Datatype::Decimal
    );
    assert_eq!(
        compiler.compile("COUNT(policy.coverages.claims)").unwrap().datatype,
        Datatype::Integer
    );
    assert_eq!(
        compiler.compile("ISEMPTY(policy.notes)").unwrap().datatype,
        Datatype::Boolean
    );
}

#[test]
fn if_and_round() {
    let compiled = compiler()
        .compile("ROUND(IF(policy.startYear > 2020; policy.premium; 0.0); 2)")
        .unwrap();
    assert_eq!(compiled.datatype, Datatype::Decimal);
    assert!(compiled.code.source().ends_with(".setScale(Integer.valueOf(2), RoundingMode.HALF_UP)"));
}

#[test]
fn function_errors() {
    assert_eq!(error_codes("FOO(1)"), vec![DiagnosticCode::UndefinedFunction]);
    assert_eq!(error_codes("ABS(\"x\")"), vec![DiagnosticCode::WrongArgumentTypes]);
    assert_eq!(
        error_codes("IF(true; 1; 1.0)"),
        vec![DiagnosticCode::WrongArgumentTypes]
    );
    assert_eq!(
        error_codes("MAX(policy.nope; nobody)"),
        vec![
            DiagnosticCode::UnknownMember,
            DiagnosticCode::UndefinedIdentifier
        ]
    );
}

// =============================================================================
// Parse errors
// =============================================================================

#[test]
fn syntax_error_is_a_single_located_diagnostic() {
    let err = compiler().compile("policy.premium +").unwrap_err();
    assert_eq!(err.diagnostics().len(), 1);
    assert_eq!(err.diagnostics()[0].code, DiagnosticCode::SyntaxError);
    assert!(err.diagnostics()[0].location.is_some());
}

#[test]
fn integer_literals_are_limited_to_java_int() {
    assert_eq!(
        compiler().compile("2147483647").unwrap().code.source(),
        "Integer.valueOf(2147483647)"
    );
    assert_eq!(error_codes("2147483648 + 1"), vec![DiagnosticCode::InvalidLiteral]);
    assert_eq!(
        error_codes("policy.coverages[2147483648].premium"),
        vec![DiagnosticCode::InvalidLiteral]
    );
}

#[test]
fn deeply_nested_formula_is_one_syntax_error() {
    let text = format!("{}policy.premium{}", "(".repeat(10_000), ")".repeat(10_000));
    assert_eq!(error_codes(&text), vec![DiagnosticCode::SyntaxError]);
}

#[test]
fn recompiling_gives_identical_diagnostics() {
    let compiler = compiler();
    let first = compiler.compile("policy.nope * (1 +").unwrap_err();
    let second = compiler.compile("policy.nope * (1 +").unwrap_err();
    assert_eq!(first, second);
}

// =============================================================================
// Formulas
// =============================================================================

#[test]
fn formula_with_signature_parameters() {
    let signature = FormulaSignature::new("computeCoveragePremium", Datatype::Money).with_parameter(
        Parameter::new("coverage", Datatype::policy("Coverage")).unwrap(),
    );
    let formula = compile_formula(&compiler(), &signature, "coverage.sumInsured * 0.002").unwrap();
    assert_eq!(
        formula.body.source(),
        "return coverage.getSumInsured().multiply(Decimal.valueOf(\"0.002\"), RoundingMode.HALF_UP);"
    );
    assert_eq!(
        formula.body.imports().collect::<Vec<_>>(),
        vec!["java.math.RoundingMode", "org.faktorips.values.Decimal"]
    );
}

#[test]
fn formula_return_type_is_exact() {
    let signature = FormulaSignature::new("premiums", Datatype::Decimal).with_parameter(
        Parameter::new("policy", Datatype::policy("Policy")).unwrap(),
    );
    let err = compile_formula(&compiler(), &signature, "policy.coverages.premium").unwrap_err();
    assert_eq!(err.diagnostics()[0].code, DiagnosticCode::ResultTypeMismatch);
    assert!(err.diagnostics()[0].message.contains("List<Decimal>"));
}

// =============================================================================
// Model loading
// =============================================================================

const MODEL_YAML: &str = r#"
compiler:
  division_scale: 4
  rounding_mode: half_even
types:
  - name: Contract
    kind: policy
    attributes:
      - name: amount
        datatype: Decimal
    associations:
      - name: party
        plural: parties
        target: Party
        to_many: true
  - name: Party
    kind: policy
    attributes:
      - name: share
        datatype: Decimal
"#;

#[test]
fn compile_against_loaded_model() {
    helpers::init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("model.yaml"), MODEL_YAML).unwrap();
    let loaded = ModelLoader::new(dir.path()).load().unwrap();

    let compiler = ExprCompiler::new(Arc::new(loaded.model))
        .with_config(loaded.compiler)
        .with_parameters(vec![
            Parameter::new("contract", Datatype::policy("Contract")).unwrap()
        ]);

    let compiled = compiler
        .compile("contract.amount / SUM(contract.parties.share)")
        .unwrap();
    assert_eq!(
        compiled.code.source(),
        "contract.getAmount().divide(contract.getParties().stream().map(e$ -> e$.getShare())\
         .collect(Collectors.toList()).stream().reduce(Decimal.ZERO, Decimal::add), 4, RoundingMode.HALF_EVEN)"
    );
    assert_eq!(compiled.datatype, Datatype::Decimal);
}
