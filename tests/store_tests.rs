//! Store Tests
//!
//! Tests verify:
//! - String table set/get/overwrite
//! - Lazy hash creation and field lookups
//! - Concurrent writers never interleave bytes of a value
//! - Concurrent readers alongside writers

use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use emberkv::store::Store;

fn b(text: &str) -> Bytes {
    Bytes::copy_from_slice(text.as_bytes())
}

// =============================================================================
// String Table Tests
// =============================================================================

#[test]
fn test_new_store_is_empty() {
    let store = Store::new();
    assert!(store.strings().is_empty());
    assert!(store.hashes().is_empty());
}

#[test]
fn test_set_and_get() {
    let store = Store::new();

    store.strings().set(b("k"), b("v"));

    assert_eq!(store.strings().get(b"k"), Some(b("v")));
    assert_eq!(store.strings().len(), 1);
}

#[test]
fn test_get_missing_key() {
    let store = Store::new();
    assert_eq!(store.strings().get(b"missing"), None);
}

#[test]
fn test_set_overwrites() {
    let store = Store::new();

    store.strings().set(b("k"), b("v1"));
    store.strings().set(b("k"), b("v2"));

    assert_eq!(store.strings().get(b"k"), Some(b("v2")));
    assert_eq!(store.strings().len(), 1);
}

// =============================================================================
// Hash Table Tests
// =============================================================================

#[test]
fn test_hash_created_on_first_write() {
    let store = Store::new();
    assert_eq!(store.hashes().get_all(b"users"), None);

    store.hashes().set(b("users"), b("u1"), b("Ahmed"));

    assert_eq!(store.hashes().len(), 1);
    assert_eq!(store.hashes().get(b"users", b"u1"), Some(b("Ahmed")));
    assert_eq!(
        store.hashes().get_all(b"users"),
        Some(vec![(b("u1"), b("Ahmed"))])
    );
}

#[test]
fn test_hash_get_missing() {
    let store = Store::new();
    store.hashes().set(b("users"), b("u1"), b("Ahmed"));

    assert_eq!(store.hashes().get(b"users", b"u2"), None);
    assert_eq!(store.hashes().get(b"nosuchhash", b"u1"), None);
}

#[test]
fn test_hash_get_all_is_unordered_set_of_pairs() {
    let store = Store::new();
    store.hashes().set(b("users"), b("u1"), b("Ahmed"));
    store.hashes().set(b("users"), b("u2"), b("Mohamed"));
    store.hashes().set(b("users"), b("u1"), b("Ali"));

    let mut pairs = store.hashes().get_all(b"users").unwrap();
    pairs.sort();

    assert_eq!(pairs, vec![(b("u1"), b("Ali")), (b("u2"), b("Mohamed"))]);
}

#[test]
fn test_partitions_are_independent() {
    let store = Store::new();
    store.strings().set(b("name"), b("string"));
    store.hashes().set(b("name"), b("field"), b("hash"));

    assert_eq!(store.strings().get(b"name"), Some(b("string")));
    assert_eq!(store.hashes().get(b"name", b"field"), Some(b("hash")));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers_last_write_wins_whole_value() {
    let store = Arc::new(Store::new());
    let v1 = Bytes::from(vec![b'1'; 4096]);
    let v2 = Bytes::from(vec![b'2'; 4096]);

    let handles: Vec<_> = [v1.clone(), v2.clone()]
        .into_iter()
        .map(|value| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..500 {
                    store.strings().set(b("k"), value.clone());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let stored = store.strings().get(b"k").unwrap();
    assert!(stored == v1 || stored == v2);
}

#[test]
fn test_concurrent_readers_and_writers() {
    let store = Arc::new(Store::new());
    store.hashes().set(b("h"), b("f"), b("initial"));

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..1000 {
                store.hashes().set(b("h"), b(&format!("f{}", i)), b("x"));
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..1000 {
                    assert_eq!(store.hashes().get(b"h", b"f"), Some(b("initial")));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(store.hashes().get_all(b"h").unwrap().len(), 1001);
}
