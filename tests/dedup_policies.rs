// tests/dedup_policies.rs
mod common;

use common::{key_items, keys, ts_item};
use myfeeds::{CursorValue, DedupPolicy};

const THRESHOLDS: [DedupPolicy; 2] = [DedupPolicy::ThresholdSince, DedupPolicy::ThresholdSinceNonEmpty];
const ALL: [DedupPolicy; 3] = [
    DedupPolicy::ThresholdSince,
    DedupPolicy::ThresholdSinceNonEmpty,
    DedupPolicy::BoundaryScan,
];

#[test]
fn cold_start_yields_only_the_head() {
    for n in 1..=6 {
        let items: Vec<_> = (0..n).rev().map(|i| ts_item(100 + i)).collect();
        let head = items[0].clone();
        for policy in ALL {
            let out = policy.apply(items.clone(), None, 10_000);
            assert_eq!(out.new_items, vec![head.clone()], "{policy:?} with {n} items");
        }
    }
}

#[test]
fn threshold_keeps_strictly_newer_prefix() {
    let items = vec![ts_item(400), ts_item(300), ts_item(200), ts_item(100)];
    for policy in THRESHOLDS {
        let out = policy.apply(items.clone(), Some(&CursorValue::Timestamp(200)), 999);
        let ts: Vec<i64> = out.new_items.iter().map(|i| i.timestamp).collect();
        assert_eq!(ts, vec![400, 300]);
        assert_eq!(out.next_cursor, Some(CursorValue::Timestamp(999)));
    }
}

#[test]
fn threshold_at_or_above_head_is_empty_but_still_advances() {
    let items = vec![ts_item(300), ts_item(200)];
    for policy in THRESHOLDS {
        for cursor in [300, 301, 5_000] {
            let out = policy.apply(items.clone(), Some(&CursorValue::Timestamp(cursor)), 7_000);
            assert!(out.new_items.is_empty());
            // stamped with the wall clock, not the newest item
            assert_eq!(out.next_cursor, Some(CursorValue::Timestamp(7_000)));
        }
    }
}

#[test]
fn boundary_scan_stops_before_cursor_key() {
    let items = key_items(&["k1", "k2", "k3", "k4"]);
    let out = DedupPolicy::BoundaryScan.apply(items, Some(&CursorValue::Key("k3".into())), 0);
    assert_eq!(keys(&out.new_items), vec!["k1", "k2"]);
    assert_eq!(out.next_cursor, Some(CursorValue::Key("k1".into())));
}

#[test]
fn boundary_scan_at_head_finds_nothing_and_keeps_cursor() {
    let items = key_items(&["k1", "k2"]);
    let out = DedupPolicy::BoundaryScan.apply(items, Some(&CursorValue::Key("k1".into())), 0);
    assert!(out.new_items.is_empty());
    assert_eq!(out.next_cursor, None);
}

#[test]
fn boundary_scan_without_match_treats_all_as_new() {
    let items = key_items(&["k1", "k2", "k3"]);
    let out = DedupPolicy::BoundaryScan.apply(items, Some(&CursorValue::Key("gone".into())), 0);
    assert_eq!(keys(&out.new_items), vec!["k1", "k2", "k3"]);
    assert_eq!(out.next_cursor, Some(CursorValue::Key("k1".into())));
}

#[test]
fn empty_fetch_never_moves_cursor() {
    let cursors = [
        None,
        Some(CursorValue::Timestamp(5)),
        Some(CursorValue::Key("k".into())),
    ];
    for policy in ALL {
        for c in &cursors {
            let out = policy.apply(Vec::new(), c.as_ref(), 1_000);
            assert!(out.new_items.is_empty());
            assert_eq!(out.next_cursor, None, "{policy:?}");
        }
    }
}
