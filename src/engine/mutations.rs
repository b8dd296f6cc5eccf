use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::model::*;
use crate::notify::Notification;

use super::ScheduleManager;

impl ScheduleManager {
    /// Index newly stored schedules and recompute their inputs.
    pub fn on_schedules_added(&self, schedules: &[ScheduleCandidate]) {
        if !self.is_initialized() {
            debug!(count = schedules.len(), "ignoring added schedules before initialization");
            return;
        }
        let mut touched = BTreeSet::new();
        for schedule in schedules {
            match self.index.add(schedule) {
                Ok(true) => {
                    touched.insert(schedule.input_id.clone());
                }
                Ok(false) => {}
                Err(e) => warn!(schedule = %schedule.id, input = %schedule.input_id, "not indexed: {e}"),
            }
        }
        self.recompute(touched, "added");
        self.notify.send(Notification::SchedulesAdded(schedules.to_vec()));
    }

    /// Unindex schedules that were deleted from the store.
    ///
    /// The cached conflict entry goes first, so a removed schedule is never
    /// reported as leaving the conflict set.
    pub fn on_schedules_removed(&self, schedules: &[ScheduleCandidate]) {
        if !self.is_initialized() {
            debug!(count = schedules.len(), "ignoring removed schedules before initialization");
            return;
        }
        let mut touched = BTreeSet::new();
        for schedule in schedules {
            self.index.remove(schedule);
            if let Some(mut cached) = self.conflicts.get_mut(&schedule.input_id) {
                cached.remove(&schedule.id);
            }
            self.conflicts
                .remove_if(&schedule.input_id, |_, cached| cached.is_empty());
            touched.insert(schedule.input_id.clone());
        }
        self.recompute(touched, "removed");
        self.notify.send(Notification::SchedulesRemoved(schedules.to_vec()));
    }

    /// Replace stale copies after a state transition. Schedules that left the
    /// live states drop out of the index.
    pub fn on_schedules_status_changed(&self, schedules: &[ScheduleCandidate]) {
        if !self.is_initialized() {
            debug!(count = schedules.len(), "ignoring status changes before initialization");
            return;
        }
        let mut touched = BTreeSet::new();
        for schedule in schedules {
            if let Err(e) = self.index.update_status(schedule) {
                warn!(schedule = %schedule.id, input = %schedule.input_id, "not re-indexed: {e}");
            }
            if let Some(mut cached) = self.conflicts.get_mut(&schedule.input_id)
                && let Some(info) = cached.get_mut(&schedule.id)
            {
                info.schedule = schedule.clone();
            }
            touched.insert(schedule.input_id.clone());
        }
        self.recompute(touched, "status_changed");
        self.notify.send(Notification::SchedulesStatusChanged(schedules.to_vec()));
    }

    /// The physical input went away. Its schedules and conflicts are forgotten
    /// without publishing conflict events.
    pub fn on_input_removed(&self, input_id: &str) {
        if !self.is_initialized() {
            return;
        }
        info!(input = %input_id, "input removed");
        self.drop_input_state(input_id);
        self.notify.remove(input_id);
    }

    pub fn on_channel_list_changed(&self) {
        if !self.is_initialized() {
            return;
        }
        self.rebuild();
    }
}
