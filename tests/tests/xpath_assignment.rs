mod common;

use anyhow::Result;
use appschema::core::feature::Attribute;
use appschema::core::name::{QName, GML_NS};
use appschema::core::value::Value;
use appschema::core::xpath::{Content, SetRequest};
use appschema::XPathWriter;
use common::{Fixture, GSML};

fn feature(fixture: &Fixture) -> Attribute { Attribute::new(fixture.mapped_feature.target_feature().clone()).with_id("mf.1") }

fn set(fixture: &Fixture, feature: &mut Attribute, xpath: &str, value: impl Into<Content>) -> Result<()> {
    XPathWriter::new().set(feature, &fixture.path(xpath), SetRequest::new(value))?;
    Ok(())
}

#[test]
fn assigned_value_reads_back() -> Result<()> {
    let fixture = Fixture::new();
    let mut feature = feature(&fixture);
    set(&fixture, &mut feature, "gsml:observationMethod", Value::from("survey"))?;
    assert_eq!(feature.values_at(&fixture.path("gsml:observationMethod")), vec![Value::from("survey")]);

    // values are converted to the binding of the target attribute
    set(&fixture, &mut feature, "gsml:remarks", Value::from(12i64))?;
    assert_eq!(feature.values_at(&fixture.path("gsml:remarks")), vec![Value::from("12")]);
    Ok(())
}

#[test]
fn indexes_create_leaves_and_equal_values_reuse_them() -> Result<()> {
    let fixture = Fixture::new();
    let mut feature = feature(&fixture);
    let name = QName::new(GML_NS, "name");

    set(&fixture, &mut feature, "gml:name[1]", Value::from("Granite"))?;
    set(&fixture, &mut feature, "gml:name[2]", Value::from("Granite"))?;
    assert_eq!(feature.properties(&name).len(), 2);

    let mut feature = self::feature(&fixture);
    set(&fixture, &mut feature, "gml:name", Value::from("Granite"))?;
    set(&fixture, &mut feature, "gml:name", Value::from("Granite"))?;
    assert_eq!(feature.properties(&name).len(), 1);
    Ok(())
}

#[test]
fn nested_paths_build_intermediate_elements() -> Result<()> {
    let fixture = Fixture::new();
    let mut feature = feature(&fixture);
    set(&fixture, &mut feature, "gsml:specification/gsml:GeologicUnit/gsml:purpose", Value::from("typical"))?;
    set(&fixture, &mut feature, "gsml:specification/gsml:GeologicUnit/gml:name", Value::from("Granite"))?;

    assert_eq!(feature.properties(&QName::new(GSML, "specification")).len(), 1);
    assert_eq!(feature.values_at(&fixture.path("gsml:specification/gsml:GeologicUnit/gml:name")), vec![Value::from("Granite")]);
    assert_eq!(feature.values_at(&fixture.path("@gml:id")), vec![Value::from("mf.1")]);
    Ok(())
}

#[test]
fn undeclared_steps_are_rejected() -> Result<()> {
    let fixture = Fixture::new();
    let mut feature = feature(&fixture);
    let result = XPathWriter::new().set(&mut feature, &fixture.path("gsml:colour"), SetRequest::new(Value::from("red")));
    assert!(matches!(result, Err(appschema::Error::InvalidLocationPath { .. })));
    Ok(())
}
