mod common;

use anyhow::Result;
use appschema::core::xpath::Step;
use common::Fixture;

#[test]
fn prefixes_of_a_path_are_prefixes() -> Result<()> {
    let fixture = Fixture::new();
    let path = fixture.path("gsml:specification/gsml:GeologicUnit/gsml:composition[2]/gsml:CompositionPart/@gml:id");
    assert_eq!(path.len(), 5);

    for k in 0..=path.len() {
        assert!(path.starts_with(&path.sub_list(0, k)), "prefix of length {k}");
    }
    // same length but different content
    for k in 1..path.len() {
        let shifted = path.sub_list(1, k + 1);
        assert!(!path.starts_with(&shifted), "{shifted} is not a prefix of {path}");
    }
    Ok(())
}

#[test]
fn indexes_only_matter_to_strict_comparison() -> Result<()> {
    let fixture = Fixture::new();
    let indexed = fixture.path("gml:name[2]");
    let plain = fixture.path("gml:name");
    let first = fixture.path("gml:name[1]");

    assert_ne!(indexed, plain);
    assert!(indexed.eq_ignore_index(&plain));
    // no index means the first occurrence
    assert_eq!(plain, first);
    assert_eq!(indexed.without_indexes(), plain);
    Ok(())
}

#[test]
fn rendering_uses_declared_prefixes() -> Result<()> {
    let fixture = Fixture::new();
    let path = fixture.path("gsml:specification/gsml:GeologicUnit/gsml:occurrence[3]/@xlink:href");
    assert_eq!(path.to_string(), "gsml:specification/gsml:GeologicUnit/gsml:occurrence[3]/@xlink:href");
    assert!(path.last().is_some_and(Step::is_xlink_href));
    assert!(fixture.mapped_feature.steps("geo:name").is_err());
    Ok(())
}

#[test]
fn namespace_declarations_survive_serialization() -> Result<()> {
    let namespaces = common::namespaces();
    let json = serde_json::to_string(&namespaces)?;
    let restored: appschema::core::name::Namespaces = serde_json::from_str(&json)?;
    assert_eq!(restored, namespaces);
    assert!(json.find("\"gml\"") < json.find("\"gsml\""), "{json}");
    Ok(())
}
