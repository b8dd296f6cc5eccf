use tracing::warn;

use crate::model::*;
use crate::observability as obs;

use super::conflict::{
    check_recordable, conflicting_schedules_for_tune_at, conflicting_schedules_for_watching_at,
    conflicting_with_additions, now_ms, reported, validate_channel, validate_window,
};
use super::priority::{self, DEFAULT_PRIORITY, DEFAULT_SERIES_PRIORITY};
use super::{EngineError, ScheduleManager};

impl ScheduleManager {
    // ── What-if previews ─────────────────────────────────────
    //
    // None of these touch the index: they simulate a copy of an input's live
    // list plus a synthetic request. Any precondition failure yields an empty
    // list, since the answer is only advisory.

    /// Schedules that would lose tuner time if `program` were recorded.
    pub fn conflicting_schedules_for_program(&self, program: &Program) -> Vec<ScheduleCandidate> {
        self.preview("program", || {
            self.ensure_initialized()?;
            validate_channel(program.channel_id)?;
            validate_window(program.span.start, program.span.end)?;
            let input = self.recordable_input_for_channel(program.channel_id)?;
            let to_add = ScheduleCandidate::for_program(input.id.clone(), program)
                .with_priority(self.suggest_new_priority());
            Ok(self.additions_preview(&input, &[to_add]))
        })
    }

    /// Conflicts involving the live schedules of one series.
    pub fn conflicting_schedules_for_series(&self, series: &SeriesRecording) -> Vec<ScheduleCandidate> {
        self.preview("series", || {
            self.ensure_initialized()?;
            let input = self
                .catalog
                .input(&series.input_id)
                .ok_or_else(|| EngineError::UnknownInput(series.input_id.clone()))?;
            check_recordable(&input)?;
            let live: Vec<ScheduleCandidate> = self
                .source
                .schedules_for_series(series.id)
                .into_iter()
                .filter(|s| s.is_live())
                .collect();
            if live.is_empty() {
                return Ok(vec![]);
            }
            Ok(self.additions_preview(&input, &live))
        })
    }

    /// Schedules that would lose tuner time if `channel_id` were recorded over `[start, end)`.
    pub fn conflicting_schedules_for_range(
        &self,
        channel_id: ChannelId,
        start: Ms,
        end: Ms,
    ) -> Vec<ScheduleCandidate> {
        self.preview("range", || {
            self.ensure_initialized()?;
            validate_channel(channel_id)?;
            let span = validate_window(start, end)?;
            let input = self.recordable_input_for_channel(channel_id)?;
            let to_add = ScheduleCandidate::timed(input.id.clone(), channel_id, span)
                .with_priority(self.suggest_new_priority());
            Ok(self.additions_preview(&input, &[to_add]))
        })
    }

    /// Recordings in progress that would stop if the live tuner took `channel_id` now.
    pub fn conflicting_schedules_for_tune(&self, channel_id: ChannelId) -> Vec<ScheduleCandidate> {
        self.preview("tune", || {
            self.ensure_initialized()?;
            validate_channel(channel_id)?;
            let input = self.input_for_channel(channel_id)?;
            let started = self.index.started(&input.id);
            Ok(reported(conflicting_schedules_for_tune_at(
                &input.id,
                channel_id,
                now_ms(),
                self.suggest_new_priority(),
                &started,
                input.tuner_count,
            )))
        })
    }

    /// Schedules that would not record if the user kept watching `channel_id` forever.
    pub fn conflicting_schedules_for_watching(&self, channel_id: ChannelId) -> Vec<ScheduleCandidate> {
        self.preview("watching", || {
            self.ensure_initialized()?;
            validate_channel(channel_id)?;
            let input = self.input_for_channel(channel_id)?;
            let live = self.index.live(&input.id);
            if live.is_empty() {
                return Ok(vec![]);
            }
            Ok(reported(conflicting_schedules_for_watching_at(
                &input.id,
                channel_id,
                now_ms(),
                self.suggest_new_priority(),
                &live,
                input.tuner_count,
            )))
        })
    }

    // ── Cached lookups ───────────────────────────────────────

    /// Whether an existing schedule is in its input's conflict set.
    pub fn is_conflicting(&self, schedule: &ScheduleCandidate) -> bool {
        self.cached_partial(schedule).is_some()
    }

    /// Whether an existing schedule conflicts but can still record part of its window.
    pub fn is_partially_conflicting(&self, schedule: &ScheduleCandidate) -> bool {
        self.cached_partial(schedule).unwrap_or(false)
    }

    fn cached_partial(&self, schedule: &ScheduleCandidate) -> Option<bool> {
        if !self.is_initialized() || self.catalog.input(&schedule.input_id).is_none() {
            return None;
        }
        self.conflicts
            .get(&schedule.input_id)
            .and_then(|m| m.get(&schedule.id).map(|c| c.partial))
    }

    // ── Priority suggestions ─────────────────────────────────

    /// A priority above every schedule the data manager knows about.
    pub fn suggest_new_priority(&self) -> i64 {
        if !self.is_initialized() {
            return DEFAULT_PRIORITY;
        }
        priority::new_priority(self.source.all_schedules().iter().map(|s| s.priority))
    }

    /// Just enough priority for `schedule` to outrank everything it overlaps.
    pub fn suggest_highest_priority(&self, schedule: &ScheduleCandidate) -> i64 {
        if !self.is_initialized() || !self.index.contains_input(&schedule.input_id) {
            return DEFAULT_PRIORITY;
        }
        let live = self.index.live(&schedule.input_id);
        let exclude = (!schedule.is_unsaved()).then_some(schedule.id);
        priority::highest_priority_over(&live, exclude, &schedule.span, schedule.priority)
    }

    /// Like `suggest_highest_priority`, for a bare window on an input.
    pub fn suggest_highest_priority_in(&self, input_id: &str, span: Span, base: i64) -> i64 {
        if !self.is_initialized() || !self.index.contains_input(input_id) {
            return DEFAULT_PRIORITY;
        }
        priority::highest_priority_over(&self.index.live(input_id), None, &span, base)
    }

    pub fn suggest_new_series_priority(&self) -> i64 {
        if !self.is_initialized() {
            return DEFAULT_SERIES_PRIORITY;
        }
        priority::new_series_priority(self.source.series_recordings().iter().map(|s| s.priority))
    }

    pub fn suggest_series_priority(order: i64) -> i64 {
        priority::series_priority(order)
    }

    // ── helpers ──────────────────────────────────────────────

    fn preview(
        &self,
        query: &'static str,
        run: impl FnOnce() -> Result<Vec<ScheduleCandidate>, EngineError>,
    ) -> Vec<ScheduleCandidate> {
        match run() {
            Ok(conflicts) => {
                metrics::counter!(obs::PREVIEWS_TOTAL, "query" => query, "status" => "ok").increment(1);
                conflicts
            }
            Err(e) => {
                metrics::counter!(obs::PREVIEWS_TOTAL, "query" => query, "status" => "rejected")
                    .increment(1);
                warn!(query, "conflict preview rejected: {e}");
                vec![]
            }
        }
    }

    fn ensure_initialized(&self) -> Result<(), EngineError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(EngineError::NotInitialized)
        }
    }

    fn input_for_channel(&self, channel_id: ChannelId) -> Result<InputInfo, EngineError> {
        self.catalog
            .input_for_channel(channel_id)
            .ok_or_else(|| EngineError::UnknownInput(format!("no input serves channel {channel_id}")))
    }

    fn recordable_input_for_channel(&self, channel_id: ChannelId) -> Result<InputInfo, EngineError> {
        let input = self.input_for_channel(channel_id)?;
        check_recordable(&input)?;
        Ok(input)
    }

    /// Preview against the input's live list. An input with nothing scheduled
    /// cannot conflict.
    fn additions_preview(&self, input: &InputInfo, to_add: &[ScheduleCandidate]) -> Vec<ScheduleCandidate> {
        let current = self.index.live(&input.id);
        if current.is_empty() {
            return vec![];
        }
        reported(conflicting_with_additions(to_add, &current, input.tuner_count))
    }
}
