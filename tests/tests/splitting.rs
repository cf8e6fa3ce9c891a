mod common;

use anyhow::Result;
use appschema::core::name::QName;
use appschema::filter::ast::NestedAttribute;
use appschema::{ComplexFilterSplitter, Error, Expr, Filter, FeatureTypeMapping, FilterCapabilities, MappingRegistry, SplitFilter, SplitterConfig};
use common::{filter, Fixture};
use std::sync::Arc;

fn split_target(fixture: &Fixture, capabilities: &FilterCapabilities, text: &str) -> Result<SplitFilter> {
    let splitter = ComplexFilterSplitter::new(&fixture.mapped_feature, &fixture.registry, capabilities).with_config(SplitterConfig::new(true));
    Ok(splitter.split_target(&filter(text))?)
}

/// Non-logical nodes of `filter`, in order.
fn leaves(filter: &Filter) -> Vec<Filter> {
    match filter {
        Filter::And(children) | Filter::Or(children) => children.iter().flat_map(leaves).collect(),
        Filter::Not(inner) => leaves(inner),
        Filter::Include => Vec::new(),
        other => vec![other.clone()],
    }
}

#[test]
fn simple_property_goes_to_the_source() -> Result<()> {
    let fixture = Fixture::new();
    let caps = FilterCapabilities::simple_comparisons();
    let split = ComplexFilterSplitter::new(&fixture.mapped_feature, &fixture.registry, &caps).split(&filter("gml:name = 'X'"))?;
    assert_eq!(split.pre, filter("NAME = 'X'"));
    assert_eq!(split.post, Filter::Include);
    Ok(())
}

#[test]
fn every_leaf_lands_on_one_side() -> Result<()> {
    let fixture = Fixture::new();
    let caps = FilterCapabilities::simple_comparisons();
    for text in [
        "gml:name = 'a' AND INTERSECTS(gsml:shape, POINT(1 2)) AND gsml:observationMethod LIKE 'surv%'",
        "(gml:name = 'a' OR gsml:remarks = 'b') AND NOT gsml:observationMethod IS NULL",
        "gml:name = 'a' AND (gsml:remarks = 'b' OR gml:name = 'c') AND IN ('mf.1')",
        "NOT (gml:name = 'a' AND gsml:shape IS NULL)",
        "gsml:specification/gsml:GeologicUnit/gml:name = gsml:specification/gsml:GeologicUnit/gsml:purpose AND gml:name = 'a'",
    ] {
        let original = filter(text);
        let split = split_target(&fixture, &caps, text)?;
        let mut expected = leaves(&original);
        let mut found: Vec<Filter> = leaves(&split.pre).into_iter().chain(leaves(&split.post)).collect();
        let key = |f: &Filter| f.to_string();
        expected.sort_by_key(key);
        found.sort_by_key(key);
        assert_eq!(found, expected, "{text}");
    }
    Ok(())
}

#[test]
fn two_chained_attributes_in_one_comparison_are_residual() -> Result<()> {
    let fixture = Fixture::new();
    let text = "gsml:specification/gsml:GeologicUnit/gml:name = gsml:specification/gsml:GeologicUnit/gsml:purpose";
    let split = split_target(&fixture, &FilterCapabilities::all(), text)?;
    assert_eq!(split.pre, Filter::Include);
    assert_eq!(split.post, filter(text));
    Ok(())
}

#[test]
fn differently_indexed_instances_of_a_chained_type_are_residual() -> Result<()> {
    let fixture = Fixture::new();
    let text = "gsml:specification[1]/gsml:GeologicUnit/gml:name = gsml:specification[2]/gsml:GeologicUnit/gml:name";
    let split = split_target(&fixture, &FilterCapabilities::all(), text)?;
    assert_eq!(split.pre, Filter::Include);
    assert_eq!(split.post, filter(text));

    // an unindexed step is the first instance
    let text = "gsml:specification[1]/gsml:GeologicUnit/gml:name = gsml:specification/gsml:GeologicUnit/gml:name";
    let split = split_target(&fixture, &FilterCapabilities::all(), text)?;
    assert_eq!(split.pre, filter(text));
    Ok(())
}

/// Registry whose GeologicUnit backend cannot be reached.
struct UnreachableUnits(Fixture);

impl MappingRegistry for UnreachableUnits {
    fn mapping(&self, name: &QName) -> appschema::Result<Option<Arc<FeatureTypeMapping>>> {
        if name.local == "GeologicUnit" {
            return Err(Error::NestedTypeUnavailable { name: name.to_string(), source: "connection refused".into() });
        }
        self.0.registry.mapping(name)
    }
}

#[test]
fn unreachable_nested_type_falls_back_to_post() -> Result<()> {
    let fixture = Fixture::new();
    let mapping = fixture.mapped_feature.clone();
    let registry = UnreachableUnits(fixture);
    let caps = FilterCapabilities::simple_comparisons();
    let splitter = ComplexFilterSplitter::new(&mapping, &registry, &caps).with_config(SplitterConfig::new(true));

    let split = splitter.split_target(&filter("gsml:specification/gsml:GeologicUnit/gml:name = 'G' AND gml:name = 'a'"))?;
    assert_eq!(split.pre, filter("gml:name = 'a'"));
    assert_eq!(split.post, filter("gsml:specification/gsml:GeologicUnit/gml:name = 'G'"));

    let split = splitter.split(&filter("gsml:specification/gsml:GeologicUnit/gml:name = 'G' AND gml:name = 'a'"))?;
    assert_eq!(split.pre, filter("NAME = 'a'"));
    Ok(())
}

#[test]
fn temporal_operators_are_evaluated_after_retrieval() -> Result<()> {
    let fixture = Fixture::new();
    let caps = FilterCapabilities::all();
    let splitter = ComplexFilterSplitter::new(&fixture.mapped_feature, &fixture.registry, &caps);

    let split = splitter.split(&filter("gml:name AFTER '2020-01-01'"))?;
    assert_eq!(split.pre, Filter::Include);
    assert_eq!(split.post, filter("gml:name AFTER '2020-01-01'"));

    let split = splitter.split(&filter("gml:name = 'a' AND gml:name AFTER '2020-01-01'"))?;
    assert_eq!(split.pre, filter("NAME = 'a'"));
    assert_eq!(split.post, filter("gml:name AFTER '2020-01-01'"));

    // in target terms the source's capabilities decide
    let split = splitter.split_target(&filter("gml:name AFTER '2020-01-01'"))?;
    assert_eq!(split.pre, filter("gml:name AFTER '2020-01-01'"));
    Ok(())
}

#[test]
fn joining_chain_is_encoded_with_its_joins() -> Result<()> {
    let fixture = Fixture::new();
    let caps = FilterCapabilities::simple_comparisons();
    let splitter = ComplexFilterSplitter::new(&fixture.mapped_feature, &fixture.registry, &caps).with_config(SplitterConfig::new(true));
    let split = splitter.split(&filter("gsml:specification/gsml:GeologicUnit/gml:name = 'Granite'"))?;
    assert_eq!(split.post, Filter::Include);

    let Filter::Comparison { left, .. } = &split.pre else { panic!("expected a comparison, got {:?}", split.pre) };
    let Expr::NestedAttribute(NestedAttribute { nested_type, joins, leaf, .. }) = &**left else { panic!("expected a nested attribute, got {left:?}") };
    assert_eq!(nested_type.as_deref(), Some("gsml:GeologicUnit"));
    assert_eq!(joins.len(), 1);
    assert_eq!((&joins[0].parent, &joins[0].nested), (&Expr::property("UNIT_ID"), &Expr::property("ID")));
    assert_eq!(leaf, &vec![Expr::property("NAME")]);
    Ok(())
}

#[test]
fn nested_encoding_can_be_disabled() -> Result<()> {
    let fixture = Fixture::new();
    let caps = FilterCapabilities::simple_comparisons();
    let splitter = ComplexFilterSplitter::new(&fixture.mapped_feature, &fixture.registry, &caps).with_config(SplitterConfig::no_nested_encoding());
    let text = "gsml:specification/gsml:GeologicUnit/gml:name = 'Granite' AND gml:name = 'a'";
    let split = splitter.split_target(&filter(text))?;
    assert_eq!(split.pre, filter("gml:name = 'a'"));
    assert_eq!(split.post, filter("gsml:specification/gsml:GeologicUnit/gml:name = 'Granite'"));
    Ok(())
}

#[test]
fn non_joining_chain_is_residual() -> Result<()> {
    let fixture = Fixture::new();
    let text = "gsml:specification/gsml:GeologicUnit/gsml:composition/gsml:CompositionPart/gsml:proportion = 'major'";
    let split = split_target(&fixture, &FilterCapabilities::all(), text)?;
    assert_eq!(split.post, filter(text));
    Ok(())
}

#[test]
fn href_and_id_are_checked_through_their_element() -> Result<()> {
    let fixture = Fixture::new();
    let caps = FilterCapabilities::simple_comparisons();
    for text in [
        "gsml:specification/gsml:GeologicUnit/gsml:occurrence/@xlink:href = 'urn:occurrence:1'",
        "gsml:specification/gsml:GeologicUnit/@gml:id = 'gu.1'",
    ] {
        let split = split_target(&fixture, &caps, text)?;
        assert_eq!(split.pre, filter(text));
        assert_eq!(split.post, Filter::Include);
    }
    Ok(())
}

#[test]
fn chained_attribute_inside_a_function_is_residual() -> Result<()> {
    let fixture = Fixture::new();
    let text = "strToLowerCase(gsml:specification/gsml:GeologicUnit/gml:name) = 'granite'";
    let split = split_target(&fixture, &FilterCapabilities::all(), text)?;
    assert_eq!(split.post, filter(text));

    let split = split_target(&fixture, &FilterCapabilities::all(), "strToLowerCase(gml:name) = 'granite'")?;
    assert_eq!(split.pre, filter("strToLowerCase(gml:name) = 'granite'"));
    Ok(())
}

#[test]
fn spatial_filter_on_a_non_geometry_chained_attribute_is_rejected() -> Result<()> {
    let fixture = Fixture::new();
    let result = split_target(&fixture, &FilterCapabilities::all(), "INTERSECTS(gsml:specification/gsml:GeologicUnit/gml:name, POINT(1 2))");
    let error = result.unwrap_err();
    assert!(matches!(error.downcast_ref::<Error>(), Some(Error::InvalidNestedAttribute { .. })), "{error}");
    Ok(())
}

#[test]
fn bbox_on_the_default_geometry() -> Result<()> {
    let fixture = Fixture::new();
    let caps = FilterCapabilities::all();
    let split = ComplexFilterSplitter::new(&fixture.mapped_feature, &fixture.registry, &caps).split(&filter("BBOX(gsml:shape, 0, 0, 10, 10)"))?;
    assert_eq!(split.pre, filter("BBOX(SHAPE, 0, 0, 10, 10)"));

    let split = ComplexFilterSplitter::new(&fixture.mapped_feature, &fixture.registry, &caps).split(&filter("BBOX(\"\", 0, 0, 10, 10)"))?;
    assert_eq!(split.pre, filter("BBOX(\"\", 0, 0, 10, 10)"));
    Ok(())
}

#[test]
fn unknown_attribute_is_an_error() -> Result<()> {
    let fixture = Fixture::new();
    let result = split_target(&fixture, &FilterCapabilities::all(), "gsml:colour = 'red'");
    let error = result.unwrap_err();
    assert!(matches!(error.downcast_ref::<Error>(), Some(Error::AttributeNotFound { .. })), "{error}");
    Ok(())
}

#[test]
fn split_pre_filter_serializes() -> Result<()> {
    let fixture = Fixture::new();
    let caps = FilterCapabilities::simple_comparisons();
    let split = ComplexFilterSplitter::new(&fixture.mapped_feature, &fixture.registry, &caps).split(&filter("gml:name = 'a' AND gsml:observationMethod <> 'guess'"))?;
    let json = serde_json::to_string(&split.pre)?;
    let restored: Filter = serde_json::from_str(&json)?;
    assert_eq!(restored, filter("NAME = 'a' AND OBSERVATION_METHOD <> 'guess'"));
    Ok(())
}
