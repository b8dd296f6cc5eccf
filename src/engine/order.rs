//! Total orders over schedules. Every order ends on the schedule id, so no two
//! distinct schedules ever compare equal.

use std::cmp::Ordering;

use crate::model::ScheduleCandidate;

/// Order in which the simulator consumes candidates:
/// start ascending, priority descending, id ascending.
pub fn processing_order(a: &ScheduleCandidate, b: &ScheduleCandidate) -> Ordering {
    a.start()
        .cmp(&b.start())
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| a.id.cmp(&b.id))
}

/// Order in which active recordings are picked for eviction, first = evicted:
/// priority ascending, end ascending, id ascending.
pub fn preemption_order(a: &ScheduleCandidate, b: &ScheduleCandidate) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| a.end().cmp(&b.end()))
        .then_with(|| a.id.cmp(&b.id))
}

/// Order of a conflict list handed back to callers:
/// priority descending, start ascending, id descending.
pub fn result_order(a: &ScheduleCandidate, b: &ScheduleCandidate) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.start().cmp(&b.start()))
        .then_with(|| b.id.cmp(&a.id))
}
