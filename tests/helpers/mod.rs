//! Shared fixtures: a small insurance type model
//!
//! ```text
//! Policy ──coverage*──▶ Coverage ──claim*──▶ Claim
//!   │  └──holder──▶ Person          ▲
//!   │                          HomeCoverage
//!   └ configured by PolicyProduct ──coverageProduct*──▶ CoverageProduct
//! ```

#![allow(dead_code)]

use faktor_fl::model::{EnumType, ModelAssociation, ModelAttribute, ModelType};
use faktor_fl::{Datatype, ExprCompiler, Parameter, TypeModel};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn insurance_model() -> TypeModel {
    let mut model = TypeModel::new();

    let mut gender = EnumType::new("Gender", &["male", "female"]);
    gender.package = Some("org.example.model".to_string());
    model.add_enum(gender).unwrap();
    model
        .add_enum(EnumType::new("PaymentMode", &["monthly", "annual"]).extensible())
        .unwrap();

    model
        .add_type(
            ModelType::policy("Policy")
                .configured_by("PolicyProduct")
                .with_attribute(ModelAttribute::new("premium", "Decimal").product_relevant())
                .with_attribute(ModelAttribute::new("startYear", "Integer"))
                .with_attribute(ModelAttribute::new("holderGender", "Gender"))
                .with_attribute(ModelAttribute::new("paymentMode", "PaymentMode"))
                .with_attribute(ModelAttribute::new("notes", "String").multi_valued())
                .with_association(ModelAssociation::to_many("coverage", "Coverage").qualified())
                .with_association(ModelAssociation::to_one("holder", "Person")),
        )
        .unwrap();
    model
        .add_type(
            ModelType::policy("Coverage")
                .configured_by("CoverageProduct")
                .with_attribute(ModelAttribute::new("premium", "Decimal"))
                .with_attribute(ModelAttribute::new("sumInsured", "Money"))
                .with_association(ModelAssociation::to_many("claim", "Claim")),
        )
        .unwrap();
    model
        .add_type(
            ModelType::policy("HomeCoverage")
                .with_supertype("Coverage")
                .with_attribute(ModelAttribute::new("floorArea", "Decimal")),
        )
        .unwrap();
    model
        .add_type(ModelType::policy("Claim").with_attribute(ModelAttribute::new("amount", "Money")))
        .unwrap();
    model
        .add_type(ModelType::policy("Person").with_attribute(ModelAttribute::new("age", "Integer")))
        .unwrap();

    model
        .add_type(
            ModelType::product("PolicyProduct")
                .with_attribute(ModelAttribute::new("productName", "String"))
                .with_attribute(ModelAttribute::new("rate", "Decimal").changing_over_time())
                .with_association(
                    ModelAssociation::to_many("coverageProduct", "CoverageProduct").changing_over_time(),
                ),
        )
        .unwrap();
    model
        .add_type(
            ModelType::product("CoverageProduct")
                .with_attribute(ModelAttribute::new("code", "String"))
                .with_attribute(ModelAttribute::new("maxSumInsured", "Money").changing_over_time()),
        )
        .unwrap();

    model.validate().unwrap();
    model
}

pub fn parameters() -> Vec<Parameter> {
    vec![
        Parameter::new("policy", Datatype::policy("Policy")).unwrap(),
        Parameter::new("home", Datatype::policy("HomeCoverage")).unwrap(),
        Parameter::new("product", Datatype::product("PolicyProduct")).unwrap(),
        Parameter::new("gen", Datatype::product_generation("PolicyProduct")).unwrap(),
    ]
}

pub fn compiler() -> ExprCompiler {
    init_tracing();
    ExprCompiler::new(Arc::new(insurance_model())).with_parameters(parameters())
}
