mod common;

use anyhow::Result;
use appschema::core::feature::{Attribute, FeatureView};
use appschema::core::value::Value;
use appschema::core::xpath::SetRequest;
use appschema::filter::{evaluate_filter, OperatorKind};
use appschema::{ComplexFilterSplitter, FilterCapabilities, SplitterConfig, XPathWriter};
use common::{filter, Fixture};

fn assemble(fixture: &Fixture, id: &str, values: &[(&str, &str)]) -> Result<Attribute> {
    let mut feature = Attribute::new(fixture.mapped_feature.target_feature().clone()).with_id(id);
    for (xpath, value) in values {
        XPathWriter::new().set(&mut feature, &fixture.path(xpath), SetRequest::new(Value::from(*value)))?;
    }
    Ok(feature)
}

#[test]
fn post_filter_is_evaluated_on_assembled_features() -> Result<()> {
    let fixture = Fixture::new();
    let caps = FilterCapabilities::simple_comparisons().without(OperatorKind::Like);
    let splitter = ComplexFilterSplitter::new(&fixture.mapped_feature, &fixture.registry, &caps).with_config(SplitterConfig::new(true));
    let split = splitter.split(&filter("gml:name = 'Granite' AND gsml:observationMethod LIKE 'surv%'"))?;
    assert_eq!(split.pre, filter("NAME = 'Granite'"));
    assert_eq!(split.post, filter("gsml:observationMethod LIKE 'surv%'"));

    let namespaces = fixture.mapped_feature.namespaces();
    let surveyed = assemble(&fixture, "mf.1", &[("gml:name", "Granite"), ("gsml:observationMethod", "survey")])?;
    let mapped = assemble(&fixture, "mf.2", &[("gml:name", "Granite"), ("gsml:observationMethod", "mapping")])?;
    assert!(evaluate_filter(&FeatureView::new(&surveyed, namespaces), &split.post)?);
    assert!(!evaluate_filter(&FeatureView::new(&mapped, namespaces), &split.post)?);
    Ok(())
}

#[test]
fn chained_values_are_visible_to_the_residual_filter() -> Result<()> {
    let fixture = Fixture::new();
    let caps = FilterCapabilities::simple_comparisons();
    let splitter = ComplexFilterSplitter::new(&fixture.mapped_feature, &fixture.registry, &caps).with_config(SplitterConfig::no_nested_encoding());
    let split = splitter.split(&filter("gsml:specification/gsml:GeologicUnit/gml:name = 'Granite'"))?;
    assert_eq!(split.pre, appschema::Filter::Include);

    let namespaces = fixture.mapped_feature.namespaces();
    let feature = assemble(&fixture, "mf.1", &[("gsml:specification/gsml:GeologicUnit/gml:name", "Granite")])?;
    assert!(evaluate_filter(&FeatureView::new(&feature, namespaces), &split.post)?);
    assert!(evaluate_filter(&FeatureView::new(&feature, namespaces), &filter("@gml:id = 'mf.1'"))?);
    Ok(())
}
