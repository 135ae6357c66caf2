//! Tests for enumeration and snapshots
//!
//! These tests verify:
//! - iter() yields exactly the live pairs
//! - Iteration can be restarted and survives compaction
//! - Damaged records surface as CrcFailure
//! - Snapshots carry every live pair between stores

use std::collections::BTreeMap;

use flashkv::{Config, Engine, MemFlash, SharedFlash, Snapshot, StoreError};

// =============================================================================
// Helper Functions
// =============================================================================

fn small_config() -> Config {
    Config::builder().total_size(8192).block_size(1024).build()
}

fn setup_engine() -> Engine<MemFlash> {
    Engine::open(MemFlash::new(8192, 1024), small_config()).unwrap()
}

fn collect(engine: &mut Engine<impl flashkv::Flash>) -> BTreeMap<Vec<u8>, Vec<u8>> {
    engine
        .iter()
        .unwrap()
        .map(|item| {
            let (key, value) = item.unwrap();
            (key.to_vec(), value.to_vec())
        })
        .collect()
}

// =============================================================================
// Iteration Tests
// =============================================================================

#[test]
fn test_iter_empty_store() {
    let mut engine = setup_engine();

    assert_eq!(engine.iter().unwrap().count(), 0);
}

#[test]
fn test_iter_yields_live_pairs_only() {
    let mut engine = setup_engine();
    engine.set(b"a", b"1").unwrap();
    engine.set(b"b", b"2").unwrap();
    engine.set(b"c", b"3").unwrap();
    engine.delete(b"b").unwrap();
    engine.set(b"a", b"updated").unwrap();

    let pairs = collect(&mut engine);

    let expected: BTreeMap<Vec<u8>, Vec<u8>> = [
        (b"a".to_vec(), b"updated".to_vec()),
        (b"c".to_vec(), b"3".to_vec()),
    ]
    .into_iter()
    .collect();
    assert_eq!(pairs, expected);
}

#[test]
fn test_iter_is_restartable() {
    let mut engine = setup_engine();
    for i in 0..10 {
        engine.set(format!("key{}", i).as_bytes(), b"v").unwrap();
    }

    let first = collect(&mut engine);
    let second = collect(&mut engine);

    assert_eq!(first.len(), 10);
    assert_eq!(first, second);
}

#[test]
fn test_iter_after_gc_and_reopen() {
    let mut engine = setup_engine();
    for i in 0..8 {
        engine.set(format!("key{}", i).as_bytes(), format!("{}", i).as_bytes()).unwrap();
    }
    engine.delete(b"key2").unwrap();
    let before = collect(&mut engine);

    engine.gc().unwrap();
    assert_eq!(collect(&mut engine), before);

    let mut reopened = Engine::open(engine.into_flash(), small_config()).unwrap();
    assert_eq!(collect(&mut reopened), before);
}

#[test]
fn test_iter_reports_damaged_record() {
    let shared = SharedFlash::new(MemFlash::new(8192, 1024));
    let mut engine = Engine::open(shared.clone(), small_config()).unwrap();
    engine.set(b"good", b"1").unwrap();
    engine.set(b"bad", b"2").unwrap();

    // Second record's value byte
    let address = engine.region_base(engine.active_region()) + 24 + 104 + 34;
    shared.lock().corrupt(address, &[b'X']);

    let items: Vec<_> = engine.iter().unwrap().collect();

    assert_eq!(items.len(), 2);
    assert_eq!(items.iter().filter(|i| i.is_ok()).count(), 1);
    assert!(items
        .iter()
        .any(|i| matches!(i, Err(StoreError::CrcFailure { offset }) if *offset == 24 + 104)));
}

// =============================================================================
// Snapshot Tests
// =============================================================================

#[test]
fn test_snapshot_round_trip_between_geometries() {
    let mut source = setup_engine();
    for i in 0..12 {
        source.set(format!("key{:02}", i).as_bytes(), format!("value{}", i).as_bytes()).unwrap();
    }
    source.delete(b"key05").unwrap();

    let bytes = Snapshot::capture(&mut source).unwrap().to_bytes().unwrap();

    let mut target = Engine::open(MemFlash::new(64 * 1024, 2048), Config::default()).unwrap();
    let snapshot = Snapshot::from_bytes(&bytes).unwrap();
    assert_eq!(snapshot.len(), 11);
    snapshot.restore(&mut target).unwrap();

    assert_eq!(collect(&mut target), collect(&mut source));
}

#[test]
fn test_snapshot_restore_stops_on_full_index() {
    let mut source = setup_engine();
    for i in 0..5 {
        source.set(format!("key{}", i).as_bytes(), b"v").unwrap();
    }
    let snapshot = Snapshot::capture(&mut source).unwrap();

    let config = Config::builder()
        .total_size(8192)
        .block_size(1024)
        .index_capacity(4)
        .build();
    let mut target = Engine::open(MemFlash::new(8192, 1024), config).unwrap();

    assert!(matches!(snapshot.restore(&mut target), Err(StoreError::HashFull)));
    assert_eq!(target.count(), 4);
}
