mod common;

use anyhow::Result;
use appschema::core::feature::AttributeType;
use appschema::core::name::{QName, GML_NS};
use appschema::{combine_with_id_filter, FeatureTypeMapping, FeatureTypeMappingBuilder, Filter, IndexedFilterDetector};
use common::{filter, gml, gsml, string, GSML};

fn indexed_mapping() -> Result<FeatureTypeMapping> {
    let unit_type = AttributeType::complex(QName::new(GSML, "GeologicUnitType"), vec![gml("name", string()), gsml("purpose", string()), gsml("rank", string())]);
    let mapping = FeatureTypeMappingBuilder::new(gsml("GeologicUnit", unit_type.into()), "GEOLOGIC_UNIT")
        .namespace("gml", GML_NS)
        .id("ID")
        .attribute("gml:name", "NAME")
        .configure("gml:name", |m| m.index_field("name_idx"))
        .attribute("gsml:rank", "RANK")
        .configure("gsml:rank", |m| m.index_field("rank_idx"))
        .attribute("gsml:purpose", "PURPOSE")
        .build()?;
    Ok(mapping)
}

#[test]
fn mapping_index_fields_drive_detection() -> Result<()> {
    let mapping = indexed_mapping()?;
    let detector = IndexedFilterDetector::new(&mapping);

    let original = filter("gml:name LIKE 'gran%' AND gsml:purpose = 'typical' AND gsml:rank = 'formation'");
    let detection = detector.detect(&original);
    assert_eq!(detection.parent_logic_filter.as_ref(), Some(&original));
    assert_eq!(detection.indexed_filter(), Some(filter("gml:name LIKE 'gran%' AND gsml:rank = 'formation'")));

    // the index answered with these identifiers
    let ids = vec!["gu.3".to_string(), "gu.7".to_string()];
    let rewritten = combine_with_id_filter(&original, &detection, ids.clone());
    assert_eq!(rewritten, Filter::And(vec![Filter::Id(ids), filter("gsml:purpose = 'typical'")]));
    Ok(())
}

#[test]
fn nested_parent_is_replaced_in_place() -> Result<()> {
    let mapping = indexed_mapping()?;
    let detector = IndexedFilterDetector::new(&mapping);

    let inner = filter("gml:name = 'Granite' OR gsml:purpose = 'typical'");
    let detection = detector.detect(&inner);
    let rewritten = combine_with_id_filter(&inner, &detection, vec!["gu.1".into()]);
    assert_eq!(rewritten, filter("IN ('gu.1') OR gsml:purpose = 'typical'"));

    let whole = filter("gml:name = 'Granite' AND gsml:rank = 'formation'");
    let detection = detector.detect(&whole);
    assert!(detection.parent_logic_filter.is_none());
    assert_eq!(combine_with_id_filter(&whole, &detection, vec!["gu.1".into()]), filter("IN ('gu.1')"));
    Ok(())
}

#[test]
fn unindexed_filter_is_left_alone() -> Result<()> {
    let mapping = indexed_mapping()?;
    let detection = IndexedFilterDetector::new(&mapping).detect(&filter("gsml:purpose = 'typical' OR gsml:purpose IS NULL"));
    assert!(detection.is_empty());
    assert_eq!(detection.indexed_filter(), None);
    Ok(())
}
