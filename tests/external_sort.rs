//! External sorter tests
//!
//! - random keys come out in nondecreasing comparator order, all of them
//! - zero pairs sort to zero pairs without error
//! - ties keep insertion order

use std::cmp::Ordering;
use std::sync::Arc;

use quarry::config::CodecConfig;
use quarry::observability::CodecMetrics;
use quarry::sort::{ExternalSorter, SortOrder};
use quarry::value::{Record, Value};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// =============================================================================
// Helpers
// =============================================================================

fn quiet() -> CodecConfig {
    CodecConfig::default().quiet()
}

fn random_key(rng: &mut StdRng) -> Value {
    match rng.gen_range(0..4) {
        0 => Value::Long(rng.gen_range(-1000..1000)),
        1 => Value::Double(rng.gen_range(-10.0..10.0)),
        2 => Value::String((0..rng.gen_range(0..6)).map(|_| rng.gen_range(b'a'..=b'e') as char).collect()),
        _ => {
            let record: Record = vec![
                ("group", Value::Long(rng.gen_range(0..3))),
                ("name", Value::from("k")),
            ]
            .into_iter()
            .collect();
            Value::Record(record)
        }
    }
}

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn test_random_keys_sorted_and_complete() {
    let mut rng = StdRng::seed_from_u64(2024);
    let mut sorter = ExternalSorter::new(&quiet());
    let n = 1500;
    for i in 0..n {
        sorter.add(&random_key(&mut rng), &Value::Long(i)).unwrap();
    }
    sorter.sort().unwrap();

    let pairs: Vec<(Value, Value)> = sorter.iter().map(|p| p.decode().unwrap()).collect();
    assert_eq!(pairs.len(), n as usize);
    for window in pairs.windows(2) {
        assert_ne!(window[0].0.compare_to(&window[1].0), Ordering::Greater);
    }

    let mut seen: Vec<i64> = pairs.iter().map(|(_, v)| v.as_long().unwrap()).collect();
    seen.sort();
    assert_eq!(seen, (0..n).collect::<Vec<_>>());
}

#[test]
fn test_random_keys_descending() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut sorter = ExternalSorter::new(&quiet()).with_order(SortOrder::Desc);
    for _ in 0..300 {
        sorter.add(&random_key(&mut rng), &Value::Null).unwrap();
    }
    sorter.sort().unwrap();

    let keys: Vec<Value> = sorter.iter().map(|p| p.key().get().unwrap().clone()).collect();
    assert_eq!(keys.len(), 300);
    for window in keys.windows(2) {
        assert_ne!(window[0].compare_to(&window[1]), Ordering::Less);
    }
}

#[test]
fn test_zero_pairs() {
    let mut sorter = ExternalSorter::new(&quiet());
    assert!(sorter.is_empty());
    sorter.sort().unwrap();
    assert_eq!(sorter.iter().count(), 0);
}

#[test]
fn test_ties_keep_insertion_order() {
    let mut sorter = ExternalSorter::new(&quiet());
    for i in 0..50i64 {
        sorter.add(&Value::Long(i % 3), &Value::Long(i)).unwrap();
    }
    sorter.sort().unwrap();

    let mut last: Option<(i64, i64)> = None;
    for pair in &sorter {
        let key = pair.key().get().unwrap().as_long().unwrap();
        let value = pair.value().get().unwrap().as_long().unwrap();
        if let Some((prev_key, prev_value)) = last {
            assert!(prev_key <= key);
            if prev_key == key {
                assert!(prev_value < value);
            }
        }
        last = Some((key, value));
    }
}

// =============================================================================
// Lazy values and metrics
// =============================================================================

#[test]
fn test_values_decoded_only_when_read() {
    let metrics = Arc::new(CodecMetrics::new());
    let mut sorter = ExternalSorter::new(&quiet()).with_metrics(Arc::clone(&metrics));
    for i in 0..20i64 {
        sorter.add(&Value::Long(20 - i), &Value::Binary(vec![i as u8; 64])).unwrap();
    }
    sorter.sort().unwrap();
    assert_eq!(metrics.snapshot().values_decoded, 0);

    let third = sorter.iter().nth(2).unwrap();
    assert_eq!(third.key().get().unwrap(), &Value::Long(3));
    assert_eq!(metrics.snapshot().values_decoded, 1);
    assert!(!third.value().is_decoded());

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.pairs_sorted, 20);
    assert!(snapshot.bytes_written >= 20 * (9 + 66));
}

#[test]
fn test_sorter_with_logging_enabled() {
    let mut sorter = ExternalSorter::new(&CodecConfig {
        sort_buffer_initial_capacity: 64,
        ..CodecConfig::default()
    });
    for i in 0..40i64 {
        sorter.add(&Value::from(format!("key-{:03}", 40 - i)), &Value::Long(i)).unwrap();
    }
    sorter.sort().unwrap();
    assert!(sorter.metrics().snapshot().buffer_growths > 0);
    let first = sorter.iter().next().unwrap();
    assert_eq!(first.key().get().unwrap(), &Value::from("key-001"));
}
