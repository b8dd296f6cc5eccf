use std::collections::{HashMap, HashSet, VecDeque};

use crate::model::*;

use super::order::{preemption_order, processing_order, result_order};

// ── Conflict Simulation ───────────────────────────────────────────

/// A stretch of time during which a schedule held a tuner in the simulated timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recorded {
    pub schedule_id: ScheduleId,
    pub span: Span,
}

#[derive(Debug, Clone, Default)]
pub struct Simulation {
    /// Schedules that lose some or all of their window, in result order.
    pub conflicts: Vec<ConflictInfo>,
    /// Every tuner allocation made by the simulation, sorted by start.
    pub recorded: Vec<Recorded>,
}

impl Simulation {
    /// Total simulated recording time granted to `id`.
    pub fn recorded_ms(&self, id: ScheduleId) -> Ms {
        self.recorded
            .iter()
            .filter(|r| r.schedule_id == id)
            .map(|r| r.span.duration_ms())
            .sum()
    }

    /// Highest number of tuners in use at any instant.
    pub fn peak_tuners(&self) -> u32 {
        let spans: Vec<Span> = self.recorded.iter().map(|r| r.span).collect();
        max_concurrency(&spans)
    }
}

/// Index of a work item. Originals use `0..n`; clipped copies get fresh keys.
type WorkKey = usize;

#[derive(Debug, Clone)]
struct Work {
    key: WorkKey,
    schedule: ScheduleCandidate,
}

#[derive(Debug)]
struct Active {
    key: WorkKey,
    schedule: ScheduleCandidate,
    since: Ms,
}

/// Conflicting schedules for `schedules` competing for `tuner_count` tuners.
///
/// With `periods`, only conflicts whose schedule overlaps one of the periods
/// are returned.
pub fn simulate(
    schedules: &[ScheduleCandidate],
    tuner_count: u32,
    periods: Option<&[Span]>,
) -> Vec<ConflictInfo> {
    run(schedules, tuner_count, periods).conflicts
}

/// Replay the recording order a tuner scheduler would follow.
///
/// 1. Pop the earliest candidate; retire recordings that ended by its start.
/// 2. A free tuner admits it.
/// 3. Otherwise evict the first active recording in preemption order whose
///    priority is strictly lower, if any.
/// 4. Otherwise the candidate conflicts. If some active recording ends before
///    the candidate does, a copy clipped to start at that moment is queued.
///
/// Clipped copies are tracked in a side table back to the schedule they came
/// from. A schedule is partially conflicting once it is evicted after starting,
/// or once one of its clipped copies is admitted.
pub fn run(schedules: &[ScheduleCandidate], tuner_count: u32, periods: Option<&[Span]>) -> Simulation {
    let originals = dedupe(schedules);
    let capacity = tuner_count as usize;

    let mut queue: VecDeque<Work> = {
        let mut v: Vec<Work> = originals
            .iter()
            .enumerate()
            .map(|(key, s)| Work { key, schedule: s.clone() })
            .collect();
        v.sort_by(|a, b| processing_order(&a.schedule, &b.schedule));
        v.into()
    };

    let mut derived_from: HashMap<WorkKey, WorkKey> = HashMap::new();
    let mut next_key: WorkKey = originals.len();
    let mut conflicts: HashMap<WorkKey, bool> = HashMap::new();
    let mut active: Vec<Active> = Vec::with_capacity(capacity);
    let mut recorded: Vec<(WorkKey, Span)> = Vec::new();

    let origin = |derived_from: &HashMap<WorkKey, WorkKey>, key: WorkKey| {
        derived_from.get(&key).copied().unwrap_or(key)
    };

    while let Some(work) = queue.pop_front() {
        let now = work.schedule.start();

        active.retain(|a| {
            if a.schedule.end() <= now {
                recorded.push((origin(&derived_from, a.key), Span::new(a.since, a.schedule.end())));
                false
            } else {
                true
            }
        });

        if active.len() < capacity {
            if let Some(&orig) = derived_from.get(&work.key) {
                conflicts.insert(orig, true);
            }
            active.push(Active { key: work.key, schedule: work.schedule, since: now });
            continue;
        }

        let victim = active
            .iter()
            .enumerate()
            .filter(|(_, a)| a.schedule.priority < work.schedule.priority)
            .min_by(|(_, a), (_, b)| preemption_order(&a.schedule, &b.schedule))
            .map(|(i, _)| i);

        if let Some(i) = victim {
            let evicted = active.swap_remove(i);
            if !derived_from.contains_key(&evicted.key) {
                conflicts.insert(evicted.key, true);
            }
            recorded.push((origin(&derived_from, evicted.key), Span { start: evicted.since, end: now }));
            if let Some(&orig) = derived_from.get(&work.key) {
                conflicts.insert(orig, true);
            }
            active.push(Active { key: work.key, schedule: work.schedule, since: now });
            continue;
        }

        // Already-clipped copies keep whatever state their original has.
        if !derived_from.contains_key(&work.key) {
            conflicts.insert(work.key, false);
        }
        let earliest_end = active.iter().map(|a| a.schedule.end()).min().unwrap_or(Ms::MAX);
        if earliest_end < work.schedule.end() {
            let mut clipped = work.schedule;
            clipped.span = Span::new(earliest_end, clipped.end());
            let key = next_key;
            next_key += 1;
            derived_from.insert(key, origin(&derived_from, work.key));
            let pos = queue
                .binary_search_by(|w| processing_order(&w.schedule, &clipped))
                .unwrap_or_else(|e| e);
            queue.insert(pos, Work { key, schedule: clipped });
        }
    }

    for a in active.drain(..) {
        recorded.push((origin(&derived_from, a.key), Span::new(a.since, a.schedule.end())));
    }

    let mut conflicts: Vec<ConflictInfo> = conflicts
        .into_iter()
        .map(|(key, partial)| ConflictInfo { schedule: originals[key].clone(), partial })
        .collect();

    if let Some(periods) = periods
        && !periods.is_empty()
    {
        conflicts.retain(|c| periods.iter().any(|p| c.schedule.span.overlaps(p)));
    }
    conflicts.sort_by(|a, b| result_order(&a.schedule, &b.schedule));

    let mut recorded: Vec<Recorded> = recorded
        .into_iter()
        .filter(|(_, span)| span.start < span.end)
        .map(|(key, span)| Recorded { schedule_id: originals[key].id, span })
        .collect();
    recorded.sort_by_key(|r| (r.span.start, r.schedule_id));

    debug_assert!(max_concurrency(&recorded.iter().map(|r| r.span).collect::<Vec<_>>()) <= tuner_count);

    Simulation { conflicts, recorded }
}

/// Drop repeated ids, keeping the first occurrence. Unsaved probes are all kept.
fn dedupe(schedules: &[ScheduleCandidate]) -> Vec<ScheduleCandidate> {
    let mut seen = HashSet::new();
    schedules
        .iter()
        .filter(|s| s.is_unsaved() || seen.insert(s.id))
        .cloned()
        .collect()
}

/// Sweep-line: the largest number of spans covering a single instant.
pub fn max_concurrency(spans: &[Span]) -> u32 {
    let mut events: Vec<(Ms, i32)> = Vec::with_capacity(spans.len() * 2);
    for s in spans {
        events.push((s.start, 1));
        events.push((s.end, -1));
    }
    // Ends sort before starts at the same instant: half-open spans.
    events.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut count: i32 = 0;
    let mut peak: i32 = 0;
    for (_, delta) in &events {
        count += delta;
        peak = peak.max(count);
    }
    peak as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    const H: Ms = 3_600_000;

    fn sched(id: u128, priority: i64, start: Ms, end: Ms) -> ScheduleCandidate {
        ScheduleCandidate::timed("in", id as i64, Span::new(start, end))
            .with_id(Ulid::from(id))
            .with_priority(priority)
    }

    fn ids(conflicts: &[ConflictInfo]) -> Vec<u128> {
        conflicts.iter().map(|c| c.schedule.id.0).collect()
    }

    fn find(conflicts: &[ConflictInfo], id: u128) -> Option<bool> {
        conflicts
            .iter()
            .find(|c| c.schedule.id == Ulid::from(id))
            .map(|c| c.partial)
    }

    // ── basic admission ─────────────────────────────────

    #[test]
    fn empty_input_no_conflicts() {
        assert!(simulate(&[], 1, None).is_empty());
        assert!(simulate(&[], 0, None).is_empty());
    }

    #[test]
    fn zero_tuners_everything_fully_conflicts() {
        let schedules = vec![sched(1, 1, 0, 200), sched(2, 2, 0, 100)];
        let conflicts = simulate(&schedules, 0, None);
        assert_eq!(ids(&conflicts), vec![2, 1]);
        assert!(conflicts.iter().all(|c| !c.partial));
    }

    #[test]
    fn higher_priority_later_start_clips_incumbent() {
        // 1 tuner: A(10, 00-02), B(20, 01-03). A records 00-01 then is evicted.
        let a = sched(1, 10, 0, 2 * H);
        let b = sched(2, 20, H, 3 * H);
        let sim = run(&[a, b], 1, None);
        assert_eq!(ids(&sim.conflicts), vec![1]);
        assert!(sim.conflicts[0].partial);
        assert_eq!(sim.recorded_ms(Ulid::from(1)), H);
        assert_eq!(sim.recorded_ms(Ulid::from(2)), 2 * H);
    }

    #[test]
    fn equal_priorities_highest_id_loses() {
        let schedules = vec![sched(1, 5, 0, H), sched(2, 5, 0, H), sched(3, 5, 0, H)];
        let conflicts = simulate(&schedules, 2, None);
        assert_eq!(ids(&conflicts), vec![3]);
        assert!(!conflicts[0].partial);
    }

    #[test]
    fn ties_favor_incumbent() {
        // B starts later with the same priority: no preemption, B waits for the tail.
        let a = sched(1, 5, 0, 100);
        let b = sched(2, 5, 50, 150);
        let sim = run(&[a, b], 1, None);
        assert_eq!(ids(&sim.conflicts), vec![2]);
        assert!(sim.conflicts[0].partial);
        assert_eq!(sim.recorded_ms(Ulid::from(2)), 50);
    }

    #[test]
    fn preemption_picks_lowest_priority_then_earliest_end() {
        let schedules = vec![
            sched(1, 5, 0, 300),
            sched(2, 5, 0, 200),
            sched(3, 9, 0, 300),
            sched(4, 10, 100, 300),
        ];
        let conflicts = simulate(&schedules, 3, None);
        // 2 ends first among the two priority-5 recordings.
        assert_eq!(ids(&conflicts), vec![2]);
        assert!(conflicts[0].partial);
    }

    #[test]
    fn preemption_equal_priority_equal_end_evicts_lower_id() {
        let schedules = vec![sched(7, 5, 0, 200), sched(3, 5, 0, 200), sched(9, 10, 100, 200)];
        let conflicts = simulate(&schedules, 2, None);
        assert_eq!(ids(&conflicts), vec![3]);
    }

    // ── clipping ─────────────────────────────────────────

    #[test]
    fn clipped_copy_records_tail() {
        let a = sched(1, 10, 0, 100);
        let b = sched(2, 5, 0, 300);
        let sim = run(&[a, b], 1, None);
        assert_eq!(find(&sim.conflicts, 2), Some(true));
        assert_eq!(sim.recorded_ms(Ulid::from(2)), 200);
    }

    #[test]
    fn no_tail_left_means_full_conflict() {
        let a = sched(1, 10, 0, 300);
        let b = sched(2, 5, 100, 200);
        let sim = run(&[a, b], 1, None);
        assert_eq!(find(&sim.conflicts, 2), Some(false));
        assert_eq!(sim.recorded_ms(Ulid::from(2)), 0);
    }

    #[test]
    fn clipped_copy_can_be_clipped_again() {
        // 2 waits for 1 (ends 100), then loses to 3 which starts at 100, then records after 200.
        let schedules = vec![sched(1, 10, 0, 100), sched(2, 1, 50, 400), sched(3, 10, 100, 200)];
        let sim = run(&schedules, 1, None);
        assert_eq!(ids(&sim.conflicts), vec![2]);
        assert!(sim.conflicts[0].partial);
        assert_eq!(sim.recorded_ms(Ulid::from(2)), 200);
    }

    #[test]
    fn evicted_clipped_copy_stays_partial() {
        // 2 is clipped to start at 100, then a higher priority 3 takes the tuner at 150.
        let schedules = vec![sched(1, 10, 0, 100), sched(2, 5, 50, 400), sched(3, 8, 150, 400)];
        let sim = run(&schedules, 1, None);
        assert_eq!(find(&sim.conflicts, 2), Some(true));
        assert_eq!(find(&sim.conflicts, 3), None);
        assert_eq!(sim.recorded_ms(Ulid::from(2)), 50);
    }

    #[test]
    fn start_early_and_fail() {
        let schedules = vec![sched(1, 1, 200, 300), sched(2, 2, 0, 400), sched(3, 3, 100, 200)];
        let conflicts = simulate(&schedules, 1, None);
        assert_eq!(ids(&conflicts), vec![2]);
    }

    #[test]
    fn start_late() {
        let schedules = vec![sched(1, 1, 200, 400), sched(2, 2, 100, 300), sched(3, 3, 0, 200)];
        let conflicts = simulate(&schedules, 1, None);
        assert_eq!(ids(&conflicts), vec![2, 1]);
    }

    #[test]
    fn partially_conflicting_ladder() {
        let windows = [
            (0, 400),
            (0, 200),
            (200, 500),
            (400, 600),
            (700, 800),
            (600, 900),
            (800, 900),
            (800, 900),
            (750, 850),
            (300, 450),
            (50, 900),
        ];
        let schedules: Vec<_> = windows
            .iter()
            .enumerate()
            .map(|(i, &(start, end))| sched(i as u128 + 1, 99 - i as i64, start, end))
            .collect();

        let check = |tuners: u32, full: &[u128], partial: &[u128]| {
            let conflicts = simulate(&schedules, tuners, None);
            for id in 1..=11u128 {
                let expected = if full.contains(&id) {
                    Some(false)
                } else if partial.contains(&id) {
                    Some(true)
                } else {
                    None
                };
                assert_eq!(find(&conflicts, id), expected, "tuners={tuners} id={id}");
            }
        };

        check(1, &[2, 8, 9, 10, 11], &[3, 4, 6]);
        check(2, &[8, 9, 10], &[11]);
        check(3, &[], &[9, 11]);
    }

    // ── periods of interest ──────────────────────────────

    #[test]
    fn periods_filter_by_half_open_overlap() {
        let schedules = vec![
            sched(1, 1, 0, 100),
            sched(2, 2, 100, 200),
            sched(3, 3, 0, 100),
            sched(4, 4, 100, 200),
        ];
        let early = [Span::new(10, 20)];
        assert_eq!(ids(&simulate(&schedules, 1, Some(&early[..]))), vec![1]);
        let late = [Span::new(110, 120)];
        assert_eq!(ids(&simulate(&schedules, 1, Some(&late[..]))), vec![2]);
        let both = [Span::new(50, 150)];
        assert_eq!(ids(&simulate(&schedules, 1, Some(&both[..]))), vec![2, 1]);
        let adjacent = [Span::new(200, 300)];
        assert!(simulate(&schedules, 1, Some(&adjacent[..])).is_empty());
    }

    #[test]
    fn empty_periods_means_no_filter() {
        let schedules = vec![sched(1, 1, 0, 100), sched(2, 2, 0, 100)];
        assert_eq!(ids(&simulate(&schedules, 1, Some(&[][..]))), vec![1]);
    }

    // ── misc ─────────────────────────────────────────────

    #[test]
    fn duplicate_ids_are_simulated_once() {
        let a = sched(1, 5, 0, 100);
        let conflicts = simulate(&[a.clone(), a], 1, None);
        assert!(conflicts.is_empty());
    }

    #[test]
    fn unbounded_probe_never_clips() {
        let watch = ScheduleCandidate::timed("in", 9, Span::new(0, Ms::MAX)).with_priority(100);
        let rec = sched(1, 1, 50, 150);
        let conflicts = simulate(&[watch, rec], 1, None);
        assert_eq!(ids(&conflicts), vec![1]);
        assert!(!conflicts[0].partial);
    }

    #[test]
    fn deterministic_across_runs() {
        let schedules = vec![
            sched(1, 3, 0, 400),
            sched(2, 3, 100, 300),
            sched(3, 2, 50, 250),
            sched(4, 1, 0, 500),
        ];
        let first = simulate(&schedules, 2, None);
        for _ in 0..5 {
            assert_eq!(simulate(&schedules, 2, None), first);
        }
        let mut reversed = schedules.clone();
        reversed.reverse();
        assert_eq!(simulate(&reversed, 2, None), first);
    }

    #[test]
    fn peak_never_exceeds_tuners() {
        let schedules: Vec<_> = (0..20)
            .map(|i| sched(i as u128 + 1, (i % 4) as i64, (i * 37 % 300) as Ms, (i * 37 % 300 + 120) as Ms))
            .collect();
        for tuners in 0..4 {
            assert!(run(&schedules, tuners, None).peak_tuners() <= tuners);
        }
    }

    // ── max_concurrency ──────────────────────────────────

    #[test]
    fn max_concurrency_adjacent_spans_do_not_stack() {
        let spans = vec![Span::new(0, 100), Span::new(100, 200)];
        assert_eq!(max_concurrency(&spans), 1);
    }

    #[test]
    fn max_concurrency_three_overlap() {
        let spans = vec![Span::new(0, 100), Span::new(25, 75), Span::new(50, 150)];
        assert_eq!(max_concurrency(&spans), 3);
    }

    #[test]
    fn max_concurrency_empty() {
        assert_eq!(max_concurrency(&[]), 0);
    }
}
