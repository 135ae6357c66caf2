//! Tests for the store's key-value operations
//!
//! These tests verify:
//! - set/get/delete/exists round trips
//! - Overwrite and delete semantics
//! - Parameter validation and capacity errors
//! - Space accounting
//! - Behavior after deinit
//! - Agreement with a HashMap model under random churn

use std::collections::HashMap;

use flashkv::{Config, Engine, MemFlash, StoreError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_engine() -> Engine<MemFlash> {
    let config = Config::default();
    let flash = MemFlash::new(config.total_size, config.block_size);
    Engine::open(flash, config).unwrap()
}

/// Two 4 KiB regions: 29 record slots each with the default geometry
fn small_config() -> Config {
    Config::builder().total_size(8192).block_size(1024).build()
}

fn setup_small_engine() -> Engine<MemFlash> {
    Engine::open(MemFlash::new(8192, 1024), small_config()).unwrap()
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_set_get() {
    let mut engine = setup_engine();

    engine.set(b"hello", b"world").unwrap();

    assert_eq!(&engine.get(b"hello").unwrap()[..], b"world");
    assert!(engine.exists(b"hello"));
    assert_eq!(engine.count(), 1);
}

#[test]
fn test_get_nonexistent_key() {
    let mut engine = setup_engine();

    assert!(matches!(engine.get(b"missing"), Err(StoreError::NotFound)));
    assert!(!engine.exists(b"missing"));
}

#[test]
fn test_value_with_trailing_nul() {
    let mut engine = setup_engine();

    engine.set(b"mcu", b"STM32F407VG\0").unwrap();

    let value = engine.get(b"mcu").unwrap();
    assert_eq!(value.len(), 12);
    assert_eq!(&value[..], b"STM32F407VG\0");
    assert_eq!(engine.count(), 1);
}

#[test]
fn test_empty_value() {
    let mut engine = setup_engine();

    engine.set(b"flag", b"").unwrap();

    assert!(engine.get(b"flag").unwrap().is_empty());
    assert!(engine.exists(b"flag"));
}

#[test]
fn test_binary_key_and_value() {
    let mut engine = setup_engine();
    let key = [0x00, 0xFF, 0x10];
    let value = [0xFFu8; 64];

    engine.set(&key, &value).unwrap();

    assert_eq!(&engine.get(&key).unwrap()[..], &value[..]);
}

#[test]
fn test_overwrite_returns_latest() {
    let mut engine = setup_engine();

    engine.set(b"key", b"v1").unwrap();
    engine.set(b"key", b"v2").unwrap();
    engine.set(b"key", b"v3").unwrap();

    assert_eq!(&engine.get(b"key").unwrap()[..], b"v3");
    assert_eq!(engine.count(), 1);
    // Each write consumed a slot
    assert_eq!(engine.status().used, 3 * 104);
}

#[test]
fn test_delete() {
    let mut engine = setup_engine();
    engine.set(b"key", b"value").unwrap();

    engine.delete(b"key").unwrap();

    assert!(matches!(engine.get(b"key"), Err(StoreError::NotFound)));
    assert!(!engine.exists(b"key"));
    assert_eq!(engine.count(), 0);
}

#[test]
fn test_delete_twice_is_not_found() {
    let mut engine = setup_engine();
    engine.set(b"key", b"value").unwrap();

    engine.delete(b"key").unwrap();

    assert!(matches!(engine.delete(b"key"), Err(StoreError::NotFound)));
    assert!(matches!(engine.delete(b"never"), Err(StoreError::NotFound)));
}

#[test]
fn test_set_after_delete() {
    let mut engine = setup_engine();
    engine.set(b"key", b"old").unwrap();
    engine.delete(b"key").unwrap();

    engine.set(b"key", b"new").unwrap();

    assert_eq!(&engine.get(b"key").unwrap()[..], b"new");
    assert_eq!(engine.count(), 1);
}

#[test]
fn test_count_tracks_live_keys() {
    let mut engine = setup_engine();

    for i in 0..10 {
        engine.set(format!("key{}", i).as_bytes(), b"v").unwrap();
    }
    engine.delete(b"key3").unwrap();
    engine.delete(b"key7").unwrap();
    engine.set(b"key0", b"again").unwrap();

    assert_eq!(engine.count(), 8);
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_empty_key_rejected() {
    let mut engine = setup_engine();

    assert!(matches!(engine.set(b"", b"v"), Err(StoreError::InvalidParameter(_))));
    assert!(matches!(engine.get(b""), Err(StoreError::InvalidParameter(_))));
    assert!(matches!(engine.delete(b""), Err(StoreError::InvalidParameter(_))));
}

#[test]
fn test_length_limits() {
    let mut engine = setup_engine();

    engine.set(&[b'k'; 32], &[b'v'; 64]).unwrap();

    assert!(matches!(
        engine.set(&[b'k'; 33], b"v"),
        Err(StoreError::InvalidParameter(_))
    ));
    assert!(matches!(
        engine.set(b"k", &[b'v'; 65]),
        Err(StoreError::InvalidParameter(_))
    ));
    assert_eq!(engine.count(), 1);
}

#[test]
fn test_open_rejects_bad_config() {
    let config = Config::builder().block_size(1000).build();

    let result = Engine::open(MemFlash::new(64 * 1024, 1000), config);

    assert!(matches!(result, Err(StoreError::InvalidParameter(_))));
}

// =============================================================================
// Capacity Tests
// =============================================================================

#[test]
fn test_hash_full() {
    let mut engine = setup_engine();

    for i in 0..128 {
        engine.set(format!("key{}", i).as_bytes(), b"v").unwrap();
    }

    assert!(matches!(engine.set(b"one-more", b"v"), Err(StoreError::HashFull)));

    // Existing keys can still be overwritten, and deleting frees a slot
    engine.set(b"key5", b"updated").unwrap();
    engine.delete(b"key6").unwrap();
    engine.set(b"one-more", b"v").unwrap();
    assert_eq!(engine.count(), 128);
}

#[test]
fn test_no_space_when_all_slots_live() {
    let mut engine = setup_small_engine();

    for i in 0..29 {
        engine.set(format!("key{}", i).as_bytes(), b"v").unwrap();
    }

    assert!(matches!(engine.set(b"key29", b"v"), Err(StoreError::NoSpace)));

    // Everything written before is intact
    assert_eq!(engine.count(), 29);
    for i in 0..29 {
        assert_eq!(&engine.get(format!("key{}", i).as_bytes()).unwrap()[..], b"v");
    }
}

#[test]
fn test_full_region_compacts_automatically() {
    let mut engine = setup_small_engine();
    let start_version = engine.version();

    for i in 0..100 {
        engine.set(b"counter", format!("{}", i).as_bytes()).unwrap();
    }

    assert_eq!(&engine.get(b"counter").unwrap()[..], b"99");
    assert_eq!(engine.count(), 1);
    assert!(engine.version() > start_version);
}

// =============================================================================
// Status Tests
// =============================================================================

#[test]
fn test_status_of_fresh_store() {
    let engine = setup_engine();
    let status = engine.status();

    // 32 KiB region, minus the header and the reserved 2 KiB block
    assert_eq!(status.total, 32 * 1024 - 24 - 2048);
    assert_eq!(status.used, 0);
    assert_eq!(engine.free_percent(), 100);
}

#[test]
fn test_status_counts_written_slots() {
    let mut engine = setup_engine();

    engine.set(b"a", b"1").unwrap();
    engine.set(b"b", b"2").unwrap();
    engine.delete(b"a").unwrap();

    // Deleted records keep their slot until compaction
    assert_eq!(engine.status().used, 2 * 104);
    assert_eq!(engine.free_percent(), 99);
}

#[test]
fn test_free_percent_drops_as_region_fills() {
    let mut engine = setup_small_engine();

    for i in 0..28 {
        engine.set(format!("key{}", i).as_bytes(), b"v").unwrap();
    }

    assert!(engine.free_percent() < 10);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_deinit_rejects_operations() {
    let mut engine = setup_engine();
    engine.set(b"key", b"value").unwrap();

    engine.deinit();

    assert!(!engine.is_initialized());
    assert!(!engine.exists(b"key"));
    assert!(matches!(engine.set(b"key", b"v"), Err(StoreError::NotInitialized)));
    assert!(matches!(engine.get(b"key"), Err(StoreError::NotInitialized)));
    assert!(matches!(engine.delete(b"key"), Err(StoreError::NotInitialized)));
    assert!(matches!(engine.gc(), Err(StoreError::NotInitialized)));
    assert!(matches!(engine.clear(), Err(StoreError::NotInitialized)));
    assert!(matches!(engine.tx_begin(), Err(StoreError::NotInitialized)));
    assert!(matches!(engine.iter(), Err(StoreError::NotInitialized)));
}

#[test]
fn test_deinit_reports_empty_status() {
    let mut engine = setup_small_engine();
    engine.set(b"a", b"1").unwrap();
    engine.set(b"b", b"2").unwrap();
    assert!(engine.free_percent() < 100);

    engine.deinit();

    assert_eq!(engine.count(), 0);
    assert_eq!(engine.status().used, 0);
    assert_eq!(engine.free_percent(), 100);
}

#[test]
fn test_deinit_keeps_data_on_flash() {
    let mut engine = setup_engine();
    engine.set(b"key", b"value").unwrap();
    engine.deinit();

    let mut reopened = Engine::open(engine.into_flash(), Config::default()).unwrap();

    assert_eq!(&reopened.get(b"key").unwrap()[..], b"value");
}

#[test]
fn test_independent_instances() {
    // Two stores side by side on one device
    let first = Config::builder().instance_id(1).start_addr(0).total_size(8192).block_size(1024).build();
    let second = Config::builder().instance_id(2).start_addr(8192).total_size(8192).block_size(1024).build();
    let mut flash = MemFlash::new(16 * 1024, 1024);

    {
        let mut a = Engine::open(&mut flash, first.clone()).unwrap();
        a.set(b"key", b"from-a").unwrap();
    }
    {
        let mut b = Engine::open(&mut flash, second.clone()).unwrap();
        b.set(b"key", b"from-b").unwrap();
        b.set(b"only-b", b"1").unwrap();
    }

    let mut a = Engine::open(&mut flash, first).unwrap();
    assert_eq!(&a.get(b"key").unwrap()[..], b"from-a");
    assert!(!a.exists(b"only-b"));
    drop(a);

    let mut b = Engine::open(&mut flash, second).unwrap();
    assert_eq!(&b.get(b"key").unwrap()[..], b"from-b");
    assert_eq!(b.count(), 2);
}

// =============================================================================
// Model Tests
// =============================================================================

#[test]
fn test_random_churn_matches_model() {
    let config = Config::builder()
        .total_size(8192)
        .block_size(1024)
        .index_capacity(32)
        .build();
    let mut engine = Engine::open(MemFlash::new(8192, 1024), config.clone()).unwrap();
    let mut model: HashMap<Vec<u8>, Vec<u8>> = HashMap::new();
    let mut rng = StdRng::seed_from_u64(0x9E37_79B9_7F4A_7C15);

    for step in 0..3000u32 {
        let key = format!("k{}", rng.gen_range(0..24)).into_bytes();

        if rng.gen_ratio(1, 3) {
            let result = engine.delete(&key);
            match model.remove(&key) {
                Some(_) => result.unwrap(),
                None => assert!(matches!(result, Err(StoreError::NotFound))),
            }
        } else {
            let value = format!("value-{}", step).into_bytes();
            engine.set(&key, &value).unwrap();
            model.insert(key, value);
        }

        // Reboot now and then
        if step % 500 == 499 {
            engine = Engine::open(engine.into_flash(), config.clone()).unwrap();
        }
    }

    assert_eq!(engine.count() as usize, model.len());
    for i in 0..24 {
        let key = format!("k{}", i).into_bytes();
        match model.get(&key) {
            Some(value) => assert_eq!(&engine.get(&key).unwrap()[..], &value[..]),
            None => assert!(matches!(engine.get(&key), Err(StoreError::NotFound))),
        }
    }
}
