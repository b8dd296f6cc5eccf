use crate::limits::*;
use crate::model::*;

use super::order::result_order;
use super::simulate::simulate;
use super::EngineError;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as Ms)
        .unwrap_or(0)
}

/// Check a requested recording window before it reaches the simulator.
pub(crate) fn validate_window(start: Ms, end: Ms) -> Result<Span, EngineError> {
    let span = Span::checked(start, end).ok_or(EngineError::InvalidSpan { start, end })?;
    if span.start < MIN_VALID_TIMESTAMP_MS || span.end > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    if span.duration_ms() > MAX_RECORDING_DURATION_MS {
        return Err(EngineError::LimitExceeded("recording window too long"));
    }
    Ok(span)
}

pub(crate) fn validate_channel(channel_id: ChannelId) -> Result<(), EngineError> {
    if channel_id == INVALID_CHANNEL_ID {
        return Err(EngineError::InvalidChannel(channel_id));
    }
    Ok(())
}

/// An input is only worth simulating if it can record on at least one tuner.
pub(crate) fn check_recordable(input: &InputInfo) -> Result<(), EngineError> {
    if !input.can_record || input.tuner_count == 0 {
        return Err(EngineError::InputCannotRecord(input.id.clone()));
    }
    if input.tuner_count > MAX_TUNER_COUNT {
        return Err(EngineError::LimitExceeded("too many tuners on input"));
    }
    Ok(())
}

/// Schedules only, probes removed, order kept.
pub(crate) fn reported(conflicts: Vec<ConflictInfo>) -> Vec<ScheduleCandidate> {
    conflicts
        .into_iter()
        .filter(|c| !c.schedule.is_unsaved())
        .map(|c| c.schedule)
        .collect()
}

/// `current` without anything `to_add` supersedes, followed by `to_add`.
pub fn merge_additions(
    to_add: &[ScheduleCandidate],
    current: &[ScheduleCandidate],
) -> Vec<ScheduleCandidate> {
    let mut merged: Vec<ScheduleCandidate> = current
        .iter()
        .filter(|cur| {
            !to_add
                .iter()
                .any(|add| cur.same_recording(add) || (!add.is_unsaved() && add.id == cur.id))
        })
        .cloned()
        .collect();
    merged.extend_from_slice(to_add);
    merged
}

/// Conflicts caused by adding `to_add` to `current`, restricted to the windows of `to_add`.
pub fn conflicting_with_additions(
    to_add: &[ScheduleCandidate],
    current: &[ScheduleCandidate],
    tuner_count: u32,
) -> Vec<ConflictInfo> {
    let merged = merge_additions(to_add, current);
    let periods: Vec<Span> = to_add.iter().map(|s| s.span).collect();
    simulate(&merged, tuner_count, Some(&periods))
}

/// What breaks if the live tuner grabs `channel_id` at `now`.
///
/// Only recordings already started compete. If none of them is on the channel a
/// 1 ms probe at `priority` stands for the tune request.
pub fn conflicting_schedules_for_tune_at(
    input_id: &str,
    channel_id: ChannelId,
    now: Ms,
    priority: i64,
    started: &[ScheduleCandidate],
    tuner_count: u32,
) -> Vec<ConflictInfo> {
    let mut schedules = started.to_vec();
    if !started.iter().any(|s| s.channel_id == channel_id) {
        schedules.push(
            ScheduleCandidate::timed(input_id, channel_id, Span::new(now, now.saturating_add(1)))
                .with_priority(priority),
        );
    }
    simulate(&schedules, tuner_count, None)
}

/// What breaks if the user keeps watching `channel_id` from `now` on.
///
/// Recordings of the watched channel share the viewer's tuner, so they are
/// simulated against a single tuner. Everything else competes with an unbounded
/// probe at `priority` for the full tuner count.
pub fn conflicting_schedules_for_watching_at(
    input_id: &str,
    channel_id: ChannelId,
    now: Ms,
    priority: i64,
    schedules: &[ScheduleCandidate],
    tuner_count: u32,
) -> Vec<ConflictInfo> {
    let (same_channel, mut others): (Vec<_>, Vec<_>) = schedules
        .iter()
        .cloned()
        .partition(|s| s.channel_id == channel_id);
    others.push(
        ScheduleCandidate::timed(input_id, channel_id, Span::new(now, Ms::MAX)).with_priority(priority),
    );

    let mut result = simulate(&same_channel, 1, None);
    result.extend(simulate(&others, tuner_count, None));
    result.sort_by(|a, b| result_order(&a.schedule, &b.schedule));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    const T0: Ms = 1_700_000_000_000;

    fn sched(id: u128, channel: ChannelId, priority: i64, start: Ms, end: Ms) -> ScheduleCandidate {
        ScheduleCandidate::timed("in", channel, Span::new(T0 + start, T0 + end))
            .with_id(Ulid::from(id))
            .with_priority(priority)
    }

    fn ids(conflicts: &[ConflictInfo]) -> Vec<u128> {
        conflicts.iter().map(|c| c.schedule.id.0).collect()
    }

    #[test]
    fn validate_window_rejects_empty_and_inverted() {
        assert!(matches!(validate_window(T0, T0), Err(EngineError::InvalidSpan { .. })));
        assert!(matches!(validate_window(T0 + 1, T0), Err(EngineError::InvalidSpan { .. })));
        assert_eq!(validate_window(T0, T0 + 1).unwrap(), Span::new(T0, T0 + 1));
    }

    #[test]
    fn validate_window_rejects_out_of_range() {
        assert!(matches!(validate_window(0, 100), Err(EngineError::LimitExceeded(_))));
        assert!(matches!(
            validate_window(T0, T0 + MAX_RECORDING_DURATION_MS + 1),
            Err(EngineError::LimitExceeded(_))
        ));
    }

    #[test]
    fn recordable_input_checks() {
        let ok = InputInfo { id: "a".into(), tuner_count: 2, can_record: true };
        assert!(check_recordable(&ok).is_ok());
        let no_tuners = InputInfo { tuner_count: 0, ..ok.clone() };
        assert!(matches!(check_recordable(&no_tuners), Err(EngineError::InputCannotRecord(_))));
        let cannot = InputInfo { can_record: false, ..ok };
        assert!(matches!(check_recordable(&cannot), Err(EngineError::InputCannotRecord(_))));
    }

    #[test]
    fn invalid_channel_rejected() {
        assert!(validate_channel(INVALID_CHANNEL_ID).is_err());
        assert!(validate_channel(3).is_ok());
    }

    #[test]
    fn merge_drops_duplicate_program() {
        let program = Program { id: 42, channel_id: 1, span: Span::new(T0, T0 + 100) };
        let existing = ScheduleCandidate::for_program("in", &program).with_id(Ulid::from(1)).with_priority(1);
        let other = sched(2, 2, 2, 0, 100);
        let to_add = ScheduleCandidate::for_program("in", &program).with_priority(10);

        let merged = merge_additions(&[to_add.clone()], &[existing, other.clone()]);
        assert_eq!(merged, vec![other, to_add]);
    }

    #[test]
    fn merge_drops_duplicate_window() {
        let existing = sched(1, 5, 1, 0, 100);
        let shifted = sched(2, 5, 1, 0, 101);
        let to_add = ScheduleCandidate::timed("in", 5, existing.span).with_priority(3);
        let merged = merge_additions(&[to_add], &[existing, shifted]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, Ulid::from(2));
    }

    #[test]
    fn duplicate_addition_never_conflicts_with_itself() {
        let program = Program { id: 7, channel_id: 1, span: Span::new(T0, T0 + 100) };
        let existing = ScheduleCandidate::for_program("in", &program).with_id(Ulid::from(1)).with_priority(5);
        let to_add = ScheduleCandidate::for_program("in", &program).with_priority(5);
        assert!(conflicting_with_additions(&[to_add], &[existing], 1).is_empty());
    }

    #[test]
    fn additions_only_report_overlapping_conflicts() {
        // 1 and 2 already clash; 3 is added later and clashes with nothing it overlaps.
        let current = vec![sched(1, 1, 1, 0, 100), sched(2, 2, 2, 0, 100)];
        let to_add = sched(3, 3, 3, 200, 300);
        assert!(conflicting_with_additions(&[to_add], &current, 1).is_empty());
    }

    #[test]
    fn additions_lowest_priority_added_conflicts() {
        let current = vec![sched(1, 1, 10, 0, 100)];
        let to_add = sched(2, 2, 1, 50, 100);
        assert_eq!(ids(&conflicting_with_additions(&[to_add], &current, 1)), vec![2]);
    }

    #[test]
    fn tune_can_tune_with_free_tuner() {
        let started = vec![sched(1, 1, 1, 0, 100)];
        assert!(conflicting_schedules_for_tune_at("in", 2, T0 + 50, 10, &started, 2).is_empty());
    }

    #[test]
    fn tune_cannot_tune_without_free_tuner() {
        let started = vec![sched(1, 1, 1, 0, 100)];
        let conflicts = conflicting_schedules_for_tune_at("in", 2, T0 + 50, 10, &started, 1);
        assert_eq!(ids(&conflicts), vec![1]);
    }

    #[test]
    fn tune_to_recorded_channel_is_free() {
        let started = vec![sched(1, 1, 1, 0, 100)];
        assert!(conflicting_schedules_for_tune_at("in", 1, T0 + 50, 10, &started, 1).is_empty());
    }

    #[test]
    fn watching_other_channels() {
        let schedules = vec![sched(1, 1, 1, 0, 100), sched(2, 2, 2, 50, 150)];
        let conflicts = conflicting_schedules_for_watching_at("in", 9, T0, 100, &schedules, 2);
        assert_eq!(ids(&conflicts), vec![1]);
    }

    #[test]
    fn watching_same_channel_shares_tuner() {
        let schedules = vec![sched(1, 9, 1, 0, 100), sched(2, 9, 2, 100, 200)];
        assert!(conflicting_schedules_for_watching_at("in", 9, T0, 100, &schedules, 1).is_empty());
    }

    #[test]
    fn watching_same_channel_overlap_conflicts() {
        let schedules = vec![sched(1, 9, 1, 0, 100), sched(2, 9, 2, 50, 150)];
        let conflicts = conflicting_schedules_for_watching_at("in", 9, T0, 100, &schedules, 1);
        assert_eq!(ids(&conflicts), vec![1]);
    }
}
