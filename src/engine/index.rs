use dashmap::DashMap;

use crate::limits::MAX_LIVE_SCHEDULES_PER_INPUT;
use crate::model::*;

use super::EngineError;

/// Live (not started or in progress) schedules, grouped by input.
pub struct ScheduleIndex {
    by_input: DashMap<InputId, Vec<ScheduleCandidate>>,
}

impl Default for ScheduleIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleIndex {
    pub fn new() -> Self {
        Self {
            by_input: DashMap::new(),
        }
    }

    /// Replace the whole index with the live subset of `schedules`.
    pub fn rebuild<'a>(&self, schedules: impl IntoIterator<Item = &'a ScheduleCandidate>) {
        self.by_input.clear();
        for schedule in schedules {
            if let Err(e) = self.add(schedule) {
                tracing::warn!(schedule = %schedule.id, "skipping schedule during rebuild: {e}");
            }
        }
    }

    // ── Patching ─────────────────────────────────────────────

    /// Index a live schedule. Returns `Ok(false)` for schedules that are not live.
    /// A schedule already present with the same id, or a program schedule with
    /// the same program id on this input, is replaced.
    pub fn add(&self, schedule: &ScheduleCandidate) -> Result<bool, EngineError> {
        if !schedule.is_live() {
            return Ok(false);
        }
        let Span { start, end } = schedule.span;
        if start >= end {
            return Err(EngineError::InvalidSpan { start, end });
        }
        let mut list = self.by_input.entry(schedule.input_id.clone()).or_default();
        let slot = list.iter().position(|s| s.id == schedule.id).or_else(|| {
            schedule
                .program_id
                .and_then(|program| list.iter().position(|s| s.program_id == Some(program)))
        });
        if let Some(i) = slot {
            list[i] = schedule.clone();
            return Ok(true);
        }
        if list.len() >= MAX_LIVE_SCHEDULES_PER_INPUT {
            return Err(EngineError::LimitExceeded("too many live schedules on input"));
        }
        list.push(schedule.clone());
        Ok(true)
    }

    /// Remove by id. The input's entry goes away when its list empties.
    pub fn remove(&self, schedule: &ScheduleCandidate) -> bool {
        let removed = match self.by_input.get_mut(&schedule.input_id) {
            Some(mut list) => {
                let before = list.len();
                list.retain(|s| s.id != schedule.id);
                list.len() != before
            }
            None => false,
        };
        self.by_input
            .remove_if(&schedule.input_id, |_, list| list.is_empty());
        removed
    }

    /// Swap the stale copy for `schedule`, or drop it if it is no longer live.
    pub fn update_status(&self, schedule: &ScheduleCandidate) -> Result<(), EngineError> {
        self.remove(schedule);
        self.add(schedule)?;
        Ok(())
    }

    pub fn drop_input(&self, input_id: &str) -> bool {
        self.by_input.remove(input_id).is_some()
    }

    // ── Reads ────────────────────────────────────────────────

    pub fn live(&self, input_id: &str) -> Vec<ScheduleCandidate> {
        self.by_input
            .get(input_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    pub fn started(&self, input_id: &str) -> Vec<ScheduleCandidate> {
        self.by_input
            .get(input_id)
            .map(|e| e.iter().filter(|s| s.is_in_progress()).cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains_input(&self, input_id: &str) -> bool {
        self.by_input.contains_key(input_id)
    }

    pub fn input_ids(&self) -> Vec<InputId> {
        self.by_input.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.by_input.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
