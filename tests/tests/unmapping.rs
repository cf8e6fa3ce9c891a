mod common;

use anyhow::Result;
use appschema::core::name::GML_NS;
use appschema::{Error, Expr, FeatureTypeMappingBuilder, Filter, UnmappingVisitor};
use common::{filter, gml, gsml, string, Fixture};
use std::sync::Arc;

fn two_alternatives() -> Result<Arc<appschema::FeatureTypeMapping>> {
    let unit_type = Arc::new(appschema::core::feature::AttributeType::complex(
        appschema::core::name::QName::new(common::GSML, "GeologicUnitType"),
        vec![gml("name", string()).occurs(0, None), gsml("purpose", string())],
    ));
    let mapping = FeatureTypeMappingBuilder::new(gsml("GeologicUnit", unit_type), "GEOLOGIC_UNIT")
        .namespace("gml", GML_NS)
        .id("ID")
        .attribute("gml:name", "NAME")
        .attribute("gml:name", "LOCAL_NAME")
        .attribute("gsml:purpose", "PURPOSE")
        .build()?;
    Ok(Arc::new(mapping))
}

#[test]
fn two_alternatives_unmap_to_a_disjunction() -> Result<()> {
    let mapping = two_alternatives()?;
    let visitor = UnmappingVisitor::new(&mapping);
    for literal in ["'Granite'", "42", "2.5"] {
        let unmapped = visitor.unmap_filter(&filter(&format!("gml:name = {literal}")))?;
        let Filter::Or(children) = &unmapped else { panic!("expected a disjunction, got {unmapped:?}") };
        assert_eq!(children.len(), 2);
        assert_eq!(children[0], filter(&format!("NAME = {literal}")));
        assert_eq!(children[1], filter(&format!("LOCAL_NAME = {literal}")));
    }
    Ok(())
}

#[test]
fn structure_is_kept_around_alternatives() -> Result<()> {
    let mapping = two_alternatives()?;
    let unmapped = UnmappingVisitor::new(&mapping).unmap_filter(&filter("gsml:purpose = 'typical' AND NOT gml:name LIKE 'gran%'"))?;
    assert_eq!(unmapped, filter("PURPOSE = 'typical' AND NOT (NAME LIKE 'gran%' OR LOCAL_NAME LIKE 'gran%')"));
    Ok(())
}

#[test]
fn both_sides_fan_out() -> Result<()> {
    let mapping = two_alternatives()?;
    let unmapped = UnmappingVisitor::new(&mapping).unmap_filter(&filter("gml:name = gsml:purpose"))?;
    assert_eq!(unmapped, filter("NAME = PURPOSE OR LOCAL_NAME = PURPOSE"));

    let sum = UnmappingVisitor::new(&mapping).unmap_expr(&appschema::parse_expr("gml:name + 1")?)?;
    assert_eq!(sum, vec![appschema::parse_expr("NAME + 1")?, appschema::parse_expr("LOCAL_NAME + 1")?]);
    Ok(())
}

#[test]
fn identifiers_follow_the_id_mapping() -> Result<()> {
    let fixture = Fixture::new();
    let unmapped = UnmappingVisitor::new(&fixture.mapped_feature).unmap_filter(&filter("IN ('mf.1', 'mf.2')"))?;
    assert_eq!(unmapped, filter("MF_ID = 'mf.1' OR MF_ID = 'mf.2'"));
    Ok(())
}

#[test]
fn unmapped_and_unsupported() -> Result<()> {
    let fixture = Fixture::new();
    let visitor = UnmappingVisitor::new(&fixture.mapped_feature);
    assert!(matches!(visitor.unmap_filter(&filter("gsml:remarks = 'x'")), Err(Error::UnmappedAttribute(path)) if path == "gsml:remarks"));
    assert!(matches!(visitor.unmap_filter(&filter("gml:name AFTER '2001-01-01'")), Err(Error::Unsupported(_))));
    assert_eq!(visitor.unmap_expr(&Expr::Nil)?, vec![Expr::Nil]);
    Ok(())
}
