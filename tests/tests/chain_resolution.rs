mod common;

use anyhow::Result;
use appschema::core::feature::{Attribute, AttributeValue};
use appschema::core::value::Value;
use appschema::{Expr, FeatureChainResolver};
use common::{gsml, string, Fixture};

#[test]
fn first_link_is_always_the_root_mapping() -> Result<()> {
    let fixture = Fixture::new();
    let resolver = FeatureChainResolver::new(&fixture.registry);
    for xpath in [
        "gml:name",
        "gsml:specification/gsml:GeologicUnit/gml:name",
        "gsml:specification/gsml:GeologicUnit/@gml:id",
        "gsml:specification/gsml:GeologicUnit/gsml:occurrence/@xlink:href",
        "gsml:specification/gsml:GeologicUnit/gsml:composition/gsml:CompositionPart/gsml:proportion",
    ] {
        let resolution = resolver.resolve(&fixture.mapped_feature, &fixture.path(xpath), None)?;
        assert!(!resolution.attributes.is_empty(), "{xpath} should resolve");
        for attribute in &resolution.attributes {
            assert_eq!(attribute.first_link().mapping.name(), fixture.mapped_feature.name(), "{xpath}");
            assert_eq!(attribute.first_link().previous, None);
        }
    }
    Ok(())
}

#[test]
fn one_non_joining_hop_disables_joining() -> Result<()> {
    let fixture = Fixture::new();
    let resolver = FeatureChainResolver::new(&fixture.registry);

    let unit = resolver.resolve(&fixture.mapped_feature, &fixture.path("gsml:specification/gsml:GeologicUnit/gml:name"), None)?;
    let [unit] = unit.attributes.as_slice() else { panic!("expected one attribute") };
    assert_eq!(unit.chain_size(), 2);
    assert!(unit.is_joining_enabled());

    let part_path = fixture.path("gsml:specification/gsml:GeologicUnit/gsml:composition/gsml:CompositionPart/gsml:proportion");
    let part = resolver.resolve(&fixture.mapped_feature, &part_path, None)?;
    let [part] = part.attributes.as_slice() else { panic!("expected one attribute") };
    assert_eq!(part.chain_size(), 3);
    assert!(part.links().iter().filter(|l| l.has_nested_feature()).count() == 2);
    assert!(!part.is_joining_enabled());
    assert_eq!(part.leaf_sources(), vec![Expr::property("PROPORTION")]);
    Ok(())
}

#[test]
fn conditional_mapping_needs_a_feature() -> Result<()> {
    let fixture = Fixture::new();
    let resolver = FeatureChainResolver::new(&fixture.registry);
    let path = fixture.path("gsml:interpretation/gsml:GeologicUnit/gml:name");

    let resolution = resolver.resolve(&fixture.mapped_feature, &path, None)?;
    assert!(resolution.attributes.is_empty());
    assert!(resolution.conditional_mapping_was_found());

    let method = |value: &str| Attribute::new(gsml("observationMethod", string())).with_value(AttributeValue::Simple(Value::from(value)));
    let surveyed = Attribute::new(fixture.mapped_feature.target_feature().clone()).with_value(AttributeValue::Complex(vec![method("survey")]));
    let resolution = resolver.resolve(&fixture.mapped_feature, &path, Some(&surveyed))?;
    assert_eq!(resolution.attributes.len(), 1);
    assert_eq!(resolution.attributes[0].last_link().mapping.name(), fixture.geologic_unit.name());

    // the selector names a type nobody registered
    let guessed = Attribute::new(fixture.mapped_feature.target_feature().clone()).with_value(AttributeValue::Complex(vec![method("guess")]));
    let resolution = resolver.resolve(&fixture.mapped_feature, &path, Some(&guessed))?;
    assert!(resolution.attributes.is_empty());
    assert!(!resolution.conditional_mapping_was_found());
    Ok(())
}
