//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check capacity, eviction, exclusion and fingerprint properties.

use proptest::prelude::*;
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;

use crate::cache::{CachePolicy, CacheStore, DEFAULT_EXCLUDED_PATHS};
use crate::models::{ApiRequest, ApiResponse, Method};

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;
const TEST_TTL: Duration = Duration::from_secs(300);

// == Strategies ==
/// Generates path segments that never contain an excluded fragment
fn safe_path_strategy() -> impl Strategy<Value = String> {
    "/(reports|users|stats|rewards)/[0-9]{1,12}".prop_map(|s| s)
}

fn excluded_fragment_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(DEFAULT_EXCLUDED_PATHS.to_vec()).prop_map(|s| s.to_string())
}

fn method_strategy() -> impl Strategy<Value = Method> {
    prop_oneof![
        Just(Method::Get),
        Just(Method::Head),
        Just(Method::Post),
        Just(Method::Put),
        Just(Method::Patch),
        Just(Method::Delete),
    ]
}

fn payload(n: usize) -> ApiResponse {
    ApiResponse::ok(json!({ "n": n }))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // The store never holds more than its capacity, whatever the insert sequence.
    #[test]
    fn prop_capacity_enforcement(
        keys in prop::collection::vec("[a-z0-9]{1,8}", 1..300)
    ) {
        let max_entries = 50;
        let mut store = CacheStore::new(max_entries, TEST_TTL);

        for (i, key) in keys.into_iter().enumerate() {
            store.store(key, payload(i));
            prop_assert!(
                store.len() <= max_entries,
                "Cache size {} exceeds max {}",
                store.len(),
                max_entries
            );
        }
    }

    // Inserting one key past capacity evicts exactly the oldest insertion.
    #[test]
    fn prop_overflow_evicts_exactly_the_oldest(
        keys in prop::collection::hash_set("[a-z0-9]{1,12}", TEST_MAX_ENTRIES + 1)
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let mut store = CacheStore::new(TEST_MAX_ENTRIES, TEST_TTL);

        for (i, key) in keys.iter().take(TEST_MAX_ENTRIES).enumerate() {
            store.store(key.clone(), payload(i));
        }
        store.store(keys[TEST_MAX_ENTRIES].clone(), payload(TEST_MAX_ENTRIES));

        prop_assert_eq!(store.len(), TEST_MAX_ENTRIES);
        prop_assert!(!store.contains(&keys[0]), "oldest key should be evicted");
        for key in keys.iter().skip(1) {
            prop_assert!(store.contains(key), "key {} should survive", key);
        }
        prop_assert_eq!(store.stats().evictions, 1);
    }

    // A stored response is returned unchanged until it expires.
    #[test]
    fn prop_lookup_returns_stored_payload(path in safe_path_strategy(), n in 0usize..1000) {
        let mut store = CacheStore::new(TEST_MAX_ENTRIES, TEST_TTL);
        let key = ApiRequest::get(path).fingerprint();

        store.store(key.clone(), payload(n));

        prop_assert_eq!(store.lookup(&key), Some(payload(n)));
    }

    // Nothing under an excluded path is ever cacheable, regardless of method
    // or leading slash.
    #[test]
    fn prop_excluded_paths_never_cacheable(
        prefix in "[a-z]{0,6}",
        fragment in excluded_fragment_strategy(),
        suffix in "[a-z0-9]{0,6}",
        method in method_strategy(),
        leading_slash in any::<bool>()
    ) {
        let policy = CachePolicy::default();
        let body = format!("{}/{}{}", prefix, fragment.trim_start_matches('/'), suffix);
        let path = if leading_slash { format!("/{}", body.trim_start_matches('/')) } else { body };

        prop_assert!(!policy.is_cacheable(&ApiRequest::new(method, path)));
    }

    // Mutating requests are never cacheable.
    #[test]
    fn prop_mutations_never_cacheable(path in safe_path_strategy(), method in method_strategy()) {
        let policy = CachePolicy::default();
        let request = ApiRequest::new(method, path);
        prop_assert_eq!(policy.is_cacheable(&request), method.is_idempotent_read());
    }

    // Fingerprints are insensitive to query insertion order and leading slash.
    #[test]
    fn prop_fingerprint_stable(
        path in "[a-z]{1,10}",
        params in prop::collection::btree_map("[a-z]{1,5}", "[a-z0-9]{0,5}", 0..6)
    ) {
        let mut forward = ApiRequest::get(format!("/{}", path));
        for (k, v) in params.iter() {
            forward = forward.query(k.clone(), v);
        }
        let mut backward = ApiRequest::get(path);
        for (k, v) in params.iter().rev() {
            backward = backward.query(k.clone(), v);
        }

        prop_assert_eq!(forward.fingerprint(), backward.fingerprint());
    }

    // Distinct query values give distinct fingerprints.
    #[test]
    fn prop_fingerprint_distinguishes_queries(
        values in prop::collection::hash_set("[a-z0-9]{1,6}", 2..10)
    ) {
        let fingerprints: HashSet<String> = values
            .iter()
            .map(|v| ApiRequest::get("/users").query("page", v).fingerprint())
            .collect();
        prop_assert_eq!(fingerprints.len(), values.len());
    }
}
