//! # Dedup Policies
//! Pure functions deciding which freshly fetched items are new relative to a
//! cursor, and what the cursor becomes next. No I/O.
//!
//! Every variant pushes only the newest item on a cold start (unset cursor),
//! so a restart never floods the channel with the whole backlog.

use crate::cursor::CursorValue;
use crate::ingest::types::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupPolicy {
    /// New = `timestamp > cursor`; cursor becomes wall-clock `now`
    /// whenever any items came back.
    ThresholdSince,
    /// Same as [`DedupPolicy::ThresholdSince`], but the poll loop skips the
    /// whole cycle when the fetch yields nothing.
    ThresholdSinceNonEmpty,
    /// New = every item before the one whose key equals the cursor.
    /// Cursor becomes the newest collected key, only if something was collected.
    BoundaryScan,
}

/// Result of applying a policy. `next_cursor == None` means leave the cursor alone.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupOutcome {
    pub new_items: Vec<Item>,
    pub next_cursor: Option<CursorValue>,
}

impl DedupOutcome {
    fn unchanged() -> Self {
        Self {
            new_items: Vec::new(),
            next_cursor: None,
        }
    }
}

impl DedupPolicy {
    /// Whether an empty fetch ends the cycle before dedup runs.
    pub fn skips_empty_fetch(self) -> bool {
        matches!(self, DedupPolicy::ThresholdSinceNonEmpty)
    }

    /// Threshold variants stamp the cursor as soon as items came back,
    /// independent of what happens to the digest afterwards.
    pub fn advances_on_fetch(self) -> bool {
        !matches!(self, DedupPolicy::BoundaryScan)
    }

    /// `items` are expected newest first. `now` is the wall clock in unix seconds.
    pub fn apply(self, items: Vec<Item>, cursor: Option<&CursorValue>, now: i64) -> DedupOutcome {
        if items.is_empty() {
            return DedupOutcome::unchanged();
        }
        match self {
            DedupPolicy::ThresholdSince | DedupPolicy::ThresholdSinceNonEmpty => {
                threshold_since(items, cursor, now)
            }
            DedupPolicy::BoundaryScan => boundary_scan(items, cursor),
        }
    }
}

fn threshold_since(mut items: Vec<Item>, cursor: Option<&CursorValue>, now: i64) -> DedupOutcome {
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let new_items = match cursor {
        Some(CursorValue::Timestamp(since)) => {
            items.retain(|it| it.timestamp > *since);
            items
        }
        // Unset (or foreign) cursor: cold start
        _ => {
            items.truncate(1);
            items
        }
    };

    // The push time, not the newest item time. Items reported with a
    // timestamp behind the poller's clock at the next cycle are skipped.
    DedupOutcome {
        new_items,
        next_cursor: Some(CursorValue::Timestamp(now)),
    }
}

fn boundary_scan(mut items: Vec<Item>, cursor: Option<&CursorValue>) -> DedupOutcome {
    let new_items = match cursor {
        Some(CursorValue::Key(boundary)) => {
            // No match: everything on the page counts as new.
            let end = items
                .iter()
                .position(|it| it.key.as_deref() == Some(boundary.as_str()))
                .unwrap_or(items.len());
            items.truncate(end);
            items
        }
        _ => {
            items.truncate(1);
            items
        }
    };

    let next_cursor = new_items
        .first()
        .and_then(|it| it.key.clone())
        .map(CursorValue::Key);

    DedupOutcome {
        new_items,
        next_cursor,
    }
}
