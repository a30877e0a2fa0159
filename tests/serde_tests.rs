#![cfg(all(feature = "serde", feature = "cow"))]

//! Integration tests for serde support in synchrony.
//!
//! The copy-on-write collections serialize as the collection they publish.

use rstest::rstest;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use synchrony::cow::{CopyOnWrite, CowMap, CowSet, CowSortedMap};

// =============================================================================
// CowMap Integration Tests
// =============================================================================

#[rstest]
fn test_cow_map_json_roundtrip() {
    let map = CowMap::new(HashMap::from([
        ("alpha".to_string(), 1),
        ("beta".to_string(), 2),
    ]));
    let json = serde_json::to_string(&map).unwrap();
    let restored: CowMap<HashMap<String, i32>> = serde_json::from_str(&json).unwrap();
    assert_eq!(map, restored);
    assert_eq!(restored.version(), 0);
}

#[rstest]
fn test_cow_sorted_map_serializes_in_key_order() {
    let map: CowSortedMap<u8, &str> = [(3, "c"), (1, "a"), (2, "b")].into_iter().collect();
    let json = serde_json::to_string(&map).unwrap();
    assert_eq!(json, r#"{"1":"a","2":"b","3":"c"}"#);
}

#[rstest]
fn test_cow_map_serializes_latest_snapshot() {
    let map: CowSortedMap<String, Vec<u8>> = CowMap::default();
    map.put("bytes".to_string(), vec![1, 2]);
    let value = serde_json::to_value(&map).unwrap();
    assert_eq!(value, serde_json::json!({ "bytes": [1, 2] }));
}

#[rstest]
fn test_cow_map_nested_in_struct() {
    #[derive(serde::Serialize, serde::Deserialize)]
    struct Routes {
        name: String,
        table: CowSortedMap<String, u16>,
    }

    let routes = Routes {
        name: "edge".to_string(),
        table: [("/api".to_string(), 8080), ("/static".to_string(), 8081)]
            .into_iter()
            .collect(),
    };
    let json = serde_json::to_string(&routes).unwrap();
    let restored: Routes = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.name, "edge");
    assert_eq!(restored.table, BTreeMap::from([("/api".to_string(), 8080), ("/static".to_string(), 8081)]));
}

// =============================================================================
// CowSet and CopyOnWrite Integration Tests
// =============================================================================

#[rstest]
fn test_cow_set_json_roundtrip() {
    let set = CowSet::new(BTreeSet::from([5_u32, 1, 3]));
    let json = serde_json::to_string(&set).unwrap();
    assert_eq!(json, "[1,3,5]");
    let restored: CowSet<BTreeSet<u32>> = serde_json::from_str(&json).unwrap();
    assert_eq!(set, restored);
}

#[rstest]
fn test_copy_on_write_json_roundtrip() {
    let cell = CopyOnWrite::new(vec!["x".to_string()]);
    cell.write(|items| items.push("y".to_string()));
    let json = serde_json::to_string(&cell).unwrap();
    assert_eq!(json, r#"["x","y"]"#);
    let restored: CopyOnWrite<Vec<String>> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, cell);
}

#[rstest]
fn test_cow_map_rejects_malformed_json() {
    let result: Result<CowMap<HashMap<String, i32>>, _> = serde_json::from_str(r#"{"a":"not a number"}"#);
    assert!(result.is_err());
}
