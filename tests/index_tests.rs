//! Tests for the hash index
//!
//! These tests verify:
//! - Lookups stay correct under heavy interleaved insert/remove
//! - Capacity is enforced exactly
//! - Iteration covers every mapping once

use std::collections::HashMap;

use flashkv::index::{djb2, HashIndex};
use flashkv::StoreError;
use proptest::prelude::*;

// =============================================================================
// Hash Tests
// =============================================================================

#[test]
fn test_djb2_known_values() {
    assert_eq!(djb2(b""), 5381);
    assert_eq!(djb2(b"a"), 5381 * 33 + 97);
    assert_eq!(djb2(b"ab"), (5381 * 33 + 97) * 33 + 98);
}

// =============================================================================
// Churn Tests
// =============================================================================

proptest! {
    #[test]
    fn test_interleaved_insert_remove_matches_model(
        ops in prop::collection::vec((0usize..96, any::<bool>()), 1..2000)
    ) {
        let capacity = 64;
        let universe: Vec<Vec<u8>> = (0..96).map(|i| format!("key-{}", i).into_bytes()).collect();
        let mut index = HashIndex::with_capacity(capacity);
        let mut model: HashMap<Vec<u8>, u32> = HashMap::new();

        for (step, (slot, is_insert)) in ops.into_iter().enumerate() {
            let key = &universe[slot];
            let offset = step as u32;

            if is_insert {
                let result = index.insert(key, offset);
                if model.contains_key(key) || model.len() < capacity {
                    prop_assert_eq!(result.ok(), Some(model.insert(key.clone(), offset)));
                } else {
                    prop_assert!(matches!(result, Err(StoreError::HashFull)));
                }
            } else {
                prop_assert_eq!(index.remove(key), model.remove(key));
            }
        }

        prop_assert_eq!(index.len(), model.len());
        for key in &universe {
            prop_assert_eq!(index.get(key), model.get(key).copied());
        }
    }
}

#[test]
fn test_fill_drain_refill() {
    let capacity = 16;
    let mut index = HashIndex::with_capacity(capacity);
    let keys: Vec<Vec<u8>> = (0..capacity).map(|i| vec![b'k', i as u8]).collect();

    for round in 0..3u32 {
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(index.insert(key, round * 100 + i as u32).unwrap(), None);
        }
        assert!(index.is_full());
        assert!(matches!(index.insert(b"extra", 0), Err(StoreError::HashFull)));

        // Drain in a different order each round
        for i in 0..capacity {
            let key = &keys[(i * 7 + round as usize) % capacity];
            assert!(index.remove(key).is_some());
            for other in &keys {
                if index.contains(other) {
                    assert!(index.get(other).is_some());
                }
            }
        }
        assert!(index.is_empty());
    }
}

#[test]
fn test_iter_covers_every_mapping() {
    let mut index = HashIndex::with_capacity(32);
    for i in 0..20u32 {
        index.insert(format!("k{}", i).as_bytes(), i).unwrap();
    }
    for i in (0..20u32).step_by(3) {
        index.remove(format!("k{}", i).as_bytes());
    }

    let mut seen: Vec<u32> = index.iter().map(|(_, offset)| offset).collect();
    seen.sort_unstable();

    let expected: Vec<u32> = (0..20).filter(|i| i % 3 != 0).collect();
    assert_eq!(seen, expected);
}
