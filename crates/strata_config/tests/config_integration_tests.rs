//! Integration tests for configuration materialization.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;

use serde::{Deserialize, Serialize};
use tempfile::tempdir;

use strata_config::{ConfigError, Materializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum Capacity {
    OnDemand,
    Spot,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeGroup {
    name: String,
    capacity_type: Capacity,
    min_size: u32,
    max_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    desired_size: Option<u32>,
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Cluster {
    name: String,
    #[serde(default)]
    node_groups: Vec<NodeGroup>,
    #[serde(default)]
    logging_types: BTreeSet<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

/// The same cluster in JSON and YAML materializes to the same value.
#[test]
fn test_json_and_yaml_are_interchangeable() {
    let yaml = r#"
name: platform
nodeGroups:
  - name: core
    capacityType: on_demand
    minSize: 1
    maxSize: 3
loggingTypes: [api, audit]
"#;
    let json = r#"{
  "name": "platform",
  "nodeGroups": [
    {"name": "core", "capacityType": "ON_DEMAND", "minSize": 1, "maxSize": 3}
  ],
  "loggingTypes": ["audit", "api"]
}"#;

    let a: Cluster = Materializer::materialize("cluster.yaml", yaml).unwrap();
    let b: Cluster = Materializer::materialize("cluster.json", json).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.node_groups[0].capacity_type, Capacity::OnDemand);
}

/// Omitted and null collections both come back empty.
#[test]
fn test_collections_never_null() {
    let omitted: Cluster = Materializer::materialize("a.yaml", "name: a").unwrap();
    let nulled: Cluster = Materializer::materialize(
        "b.yaml",
        "name: b\nnodeGroups: null\nloggingTypes: ~\ntags: null",
    )
    .unwrap();

    for cluster in [&omitted, &nulled] {
        assert!(cluster.node_groups.is_empty());
        assert!(cluster.logging_types.is_empty());
        assert!(cluster.tags.is_empty());
    }
}

/// Enum values and property names are matched without regard to case.
#[test]
fn test_case_insensitive_matching() {
    let yaml = r#"
NAME: platform
NODE_GROUPS:
  - Name: batch
    CapacityType: Spot
    min-size: 0
    MAX_SIZE: 10
"#;
    let cluster: Cluster = Materializer::materialize("cluster.yaml", yaml).unwrap();
    assert_eq!(cluster.name, "platform");
    assert_eq!(cluster.node_groups[0].capacity_type, Capacity::Spot);
    assert_eq!(cluster.node_groups[0].max_size, 10);
}

/// A value outside an enum's members names the location and the valid set.
#[test]
fn test_unknown_enum_value() {
    let yaml = r#"
name: platform
nodeGroups:
  - name: core
    capacityType: on_demand
    minSize: 1
    maxSize: 3
  - name: gpu
    capacityType: reserved
    minSize: 1
    maxSize: 3
"#;
    let err = Materializer::materialize::<Cluster>("cluster.yaml", yaml).unwrap_err();
    match err {
        ConfigError::UnknownVariant {
            document,
            path,
            value,
            expected,
        } => {
            assert_eq!(document, "cluster.yaml");
            assert_eq!(path, "nodeGroups[1].capacityType");
            assert_eq!(value, "reserved");
            assert_eq!(expected, vec!["ON_DEMAND", "SPOT"]);
        }
        other => panic!("expected UnknownVariant, got {other}"),
    }
}

/// Malformed YAML surfaces as a parse error with a line number.
#[test]
fn test_malformed_yaml() {
    let err = Materializer::materialize::<Cluster>("broken.yaml", "name: [a\ntags: b").unwrap_err();
    match err {
        ConfigError::Parse { document, line, .. } => {
            assert_eq!(document, "broken.yaml");
            assert!(line.is_some());
        }
        other => panic!("expected Parse, got {other}"),
    }
}

/// Serialization omits null fields in both formats.
#[test]
fn test_serialization_omits_nulls() {
    let cluster = Cluster {
        name: "platform".to_string(),
        node_groups: vec![NodeGroup {
            name: "core".to_string(),
            capacity_type: Capacity::OnDemand,
            min_size: 1,
            max_size: 2,
            desired_size: None,
            labels: BTreeMap::new(),
        }],
        logging_types: BTreeSet::new(),
        tags: BTreeMap::new(),
    };

    let tree = Materializer::to_tree(&serde_json::json!({"a": null, "b": [{"c": null}]})).unwrap();
    assert_eq!(tree, serde_json::json!({"b": [{}]}));

    let yaml = Materializer::to_yaml(&cluster).unwrap();
    assert!(!yaml.contains("desiredSize"));
    assert!(!yaml.contains("null"));

    let back: Cluster = Materializer::materialize("round.yaml", &yaml).unwrap();
    assert_eq!(back, cluster);
}

/// Files are read from disk and errors carry the file name.
#[test]
fn test_read_path() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("cluster.json");
    fs::write(&path, r#"{"name": "disk"}"#).unwrap();

    let cluster: Cluster = Materializer::read_path(&path).unwrap();
    assert_eq!(cluster.name, "disk");

    let missing = temp.path().join("missing.yaml");
    let err = Materializer::read_path::<Cluster>(&missing).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("missing.yaml"));
}
