// The shared fixture backs the engine, web and CLI tests; keep it loadable.

use std::sync::Arc;

use salesdash_storage::{load_dataset, DatasetCache};

fn fixture_path() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/sample/deals.csv")
}

#[test]
fn sample_fixture_loads_with_extra_columns_ignored() {
    let dataset = load_dataset(fixture_path()).expect("fixture loads");
    assert_eq!(dataset.len(), 20);
    assert_eq!(
        dataset.distinct_quarters(),
        vec!["Q1-FY25", "Q2-FY25", "Q3-FY25", "Q4-FY25"]
    );
    assert_eq!(dataset.distinct_regions(), vec!["EMEA", "Americas", "APAC"]);
    assert_eq!(dataset.distinct_product_categories().len(), 10);
}

#[test]
fn sample_fixture_cache_hands_out_one_table() {
    let cache = DatasetCache::new(fixture_path());
    let a = cache.get().expect("first");
    let b = cache.get().expect("second");
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn sample_fixture_cache_loads_once_under_concurrent_first_calls() {
    let cache = DatasetCache::new(fixture_path());
    let loaded = std::thread::scope(|scope| {
        let handles = (0..8)
            .map(|_| scope.spawn(|| cache.get().expect("load")))
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .collect::<Vec<_>>()
    });
    assert!(cache.is_loaded());
    let first = &loaded[0];
    assert!(loaded.iter().all(|d| Arc::ptr_eq(d, first)));
    assert!(Arc::ptr_eq(first, &cache.get().expect("cached")));
}
