//! Priority suggestions. One-off recordings live in the band just below
//! `DEFAULT_PRIORITY`, series recordings in the band around
//! `DEFAULT_SERIES_PRIORITY`, so the two never collide.

use crate::model::*;

pub const DEFAULT_PRIORITY: i64 = i64::MAX >> 1;
pub const DEFAULT_SERIES_PRIORITY: i64 = DEFAULT_PRIORITY >> 1;
pub const PRIORITY_OFFSET: i64 = 1024;

/// One step above every priority in `priorities`, and never below `DEFAULT_PRIORITY`.
pub fn new_priority(priorities: impl IntoIterator<Item = i64>) -> i64 {
    priorities
        .into_iter()
        .fold(DEFAULT_PRIORITY - PRIORITY_OFFSET, i64::max)
        .saturating_add(PRIORITY_OFFSET)
}

/// One step above every series priority, and never below `DEFAULT_SERIES_PRIORITY`.
pub fn new_series_priority(priorities: impl IntoIterator<Item = i64>) -> i64 {
    priorities
        .into_iter()
        .fold(DEFAULT_SERIES_PRIORITY - PRIORITY_OFFSET, i64::max)
        .saturating_add(PRIORITY_OFFSET)
}

/// Priority for the series at position `order`; higher order ranks higher.
pub fn series_priority(order: i64) -> i64 {
    DEFAULT_SERIES_PRIORITY.saturating_add(order.saturating_mul(PRIORITY_OFFSET))
}

/// Lowest priority that outranks every schedule in `live` overlapping `span`.
///
/// `base` is returned unchanged when nothing overlapping reaches it. Ties are
/// bumped, since the simulator never lets a tie preempt.
pub fn highest_priority_over(
    live: &[ScheduleCandidate],
    exclude: Option<ScheduleId>,
    span: &Span,
    base: i64,
) -> i64 {
    let highest = live
        .iter()
        .filter(|s| Some(s.id) != exclude && s.span.overlaps(span))
        .map(|s| s.priority)
        .max();
    match highest {
        Some(h) if h >= base => h.saturating_add(PRIORITY_OFFSET),
        _ => base,
    }
}
