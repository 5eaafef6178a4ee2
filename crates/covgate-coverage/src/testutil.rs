use covgate_sfapi::{
    ApexCodeCoverage, LineCoverage, MetadataComponentDependency, NamedRecord, RecordAttributes,
    TypedRecord,
};

/// Build a raw coverage record: `test` is (id, name), `apex` is
/// (id, name, metadata type).
pub(crate) fn record(
    test: (&str, &str),
    apex: (&str, &str, &str),
    covered: Vec<u32>,
    uncovered: Vec<u32>,
) -> ApexCodeCoverage {
    ApexCodeCoverage {
        test_class: NamedRecord {
            id: test.0.to_string(),
            name: test.1.to_string(),
        },
        class_or_trigger: TypedRecord {
            attributes: RecordAttributes {
                record_type: apex.2.to_string(),
            },
            id: apex.0.to_string(),
            name: apex.1.to_string(),
        },
        coverage: LineCoverage {
            covered_lines: covered,
            uncovered_lines: uncovered,
        },
    }
}

/// Build a dependency edge: each side is (id, name, metadata type).
pub(crate) fn edge(
    component: (&str, &str, &str),
    reference: (&str, &str, &str),
) -> MetadataComponentDependency {
    MetadataComponentDependency {
        id: component.0.to_string(),
        name: component.1.to_string(),
        component_type: component.2.to_string(),
        ref_id: reference.0.to_string(),
        ref_name: reference.1.to_string(),
        ref_type: reference.2.to_string(),
    }
}

pub(crate) fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
