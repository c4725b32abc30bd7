//! Integration tests for the concurrent id hash map

mod common;

use graphr::runtime::cpu::{ClientConfig, CpuClient, IdHashMap};
use std::collections::HashSet;

#[test]
fn test_init_deduplicates_across_threads() {
    let client = CpuClient::with_config(
        ClientConfig::default()
            .with_num_threads(4)
            .with_hash_grain(16),
    )
    .unwrap();
    let ids: Vec<i64> = (0..20_000).map(|i| (i * 31) % 4099).collect();
    let (map, unique) = IdHashMap::init(&client, &ids).unwrap();

    let expected: HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(unique.len(), expected.len());
    assert_eq!(map.len(), expected.len());
    assert_eq!(unique.iter().copied().collect::<HashSet<_>>(), expected);

    let values = map.map_ids(&client, &unique, -1);
    assert_eq!(values, (0..unique.len() as i64).collect::<Vec<_>>());
    assert!(map.capacity() >= 2 * expected.len());
}

#[test]
fn test_missing_ids_map_to_default() {
    let client = common::create_cpu_client();
    let (map, _) = IdHashMap::init(&client, &[3i32, 1, 3]).unwrap();
    assert_eq!(map.map(2, -1), -1);
    assert_eq!(map.map(-1, 7), 7);
    assert!(map.contains(1));
    assert!(!map.contains(-1));
}

#[test]
fn test_leading_ids_map_in_order() {
    let client = common::create_cpu_client();
    let (map, fresh) = IdHashMap::init_with_leading(&client, &[50i64, 40], &[40, 60, 50, 70, 60]).unwrap();
    assert_eq!(map.map(50, -1), 0);
    assert_eq!(map.map(40, -1), 1);
    let mut fresh_sorted = fresh.clone();
    fresh_sorted.sort_unstable();
    assert_eq!(fresh_sorted, vec![60, 70]);
    for (i, id) in fresh.iter().enumerate() {
        assert_eq!(map.map(*id, -1), 2 + i as i64);
    }
    assert_eq!(map.len(), 4);
}

#[test]
fn test_empty_input() {
    let client = common::create_cpu_client();
    let (map, unique) = IdHashMap::<i64>::init(&client, &[]).unwrap();
    assert!(map.is_empty());
    assert!(unique.is_empty());
}
