mod conflict;
mod error;
mod index;
mod mutations;
pub mod order;
pub mod priority;
mod queries;
pub mod simulate;

pub use conflict::{
    conflicting_schedules_for_tune_at, conflicting_schedules_for_watching_at,
    conflicting_with_additions, merge_additions,
};
pub use error::EngineError;
pub use index::ScheduleIndex;
pub use priority::{DEFAULT_PRIORITY, DEFAULT_SERIES_PRIORITY, PRIORITY_OFFSET};
pub use simulate::{simulate, Simulation};

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::model::*;
use crate::notify::{Notification, NotifyHub};
use crate::observability as obs;

use order::result_order;

type ConflictMap = HashMap<ScheduleId, ConflictInfo>;

/// Keeps the per-input live index and the last computed conflict set of every
/// input, and publishes the difference whenever an input is recomputed.
pub struct ScheduleManager {
    source: Arc<dyn ScheduleSource>,
    catalog: Arc<dyn InputCatalog>,
    index: ScheduleIndex,
    conflicts: DashMap<InputId, ConflictMap>,
    initialized: AtomicBool,
    pub notify: Arc<NotifyHub>,
}

impl ScheduleManager {
    pub fn new(
        source: Arc<dyn ScheduleSource>,
        catalog: Arc<dyn InputCatalog>,
        notify: Arc<NotifyHub>,
    ) -> Self {
        Self {
            source,
            catalog,
            index: ScheduleIndex::new(),
            conflicts: DashMap::new(),
            initialized: AtomicBool::new(false),
            notify,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Build the index from the data manager and compute every input's conflicts.
    pub fn initialize(&self) {
        self.rebuild();
    }

    /// Throw the index away and rebuild it from scratch. Also the response to a
    /// channel-list change, since channels may have moved between inputs.
    pub fn rebuild(&self) {
        let schedules = self.source.all_schedules();
        self.index.rebuild(&schedules);
        let first = !self.initialized.swap(true, Ordering::AcqRel);
        info!(
            schedules = schedules.len(),
            live = self.index.len(),
            "schedule index rebuilt"
        );
        if first {
            self.notify.send(Notification::Initialized);
        }
        self.recompute(self.index.input_ids(), "rebuild");
    }

    pub fn started_recordings(&self, input_id: &str) -> Vec<ScheduleCandidate> {
        if !self.is_initialized() {
            return vec![];
        }
        self.index.started(input_id)
    }

    /// Cached conflicts of one input, in result order.
    pub fn cached_conflicts(&self, input_id: &str) -> Vec<ConflictInfo> {
        let mut list: Vec<ConflictInfo> = self
            .conflicts
            .get(input_id)
            .map(|e| e.values().cloned().collect())
            .unwrap_or_default();
        list.sort_by(|a, b| result_order(&a.schedule, &b.schedule));
        list
    }

    /// Inputs that currently have live schedules.
    pub fn input_ids(&self) -> Vec<InputId> {
        let mut ids = self.index.input_ids();
        ids.sort();
        ids
    }

    // ── Recompute + delta ────────────────────────────────────

    /// Recompute the given inputs, plus every input that still has cached
    /// conflicts, and publish what changed.
    pub(super) fn recompute(&self, inputs: impl IntoIterator<Item = InputId>, reason: &'static str) {
        let mut targets: BTreeSet<InputId> = inputs.into_iter().collect();
        targets.extend(
            self.conflicts
                .iter()
                .filter(|e| !self.index.contains_input(e.key()))
                .map(|e| e.key().clone()),
        );

        for input_id in targets {
            match self.catalog.input(&input_id) {
                Some(input) => self.recompute_input(&input, reason),
                None => {
                    warn!(input = %input_id, "input no longer resolves, dropping its schedules");
                    metrics::counter!(obs::INPUTS_DROPPED_TOTAL).increment(1);
                    self.drop_input_state(&input_id);
                }
            }
        }
        metrics::gauge!(obs::LIVE_SCHEDULES).set(self.index.len() as f64);
    }

    fn recompute_input(&self, input: &InputInfo, reason: &'static str) {
        let live = self.index.live(&input.id);
        let started = Instant::now();
        let fresh: ConflictMap = if live.is_empty() {
            HashMap::new()
        } else {
            simulate(&live, input.tuner_count, None)
                .into_iter()
                .map(|c| (c.schedule.id, c))
                .collect()
        };
        metrics::histogram!(obs::SIMULATION_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        metrics::counter!(obs::RECOMPUTES_TOTAL, "reason" => reason).increment(1);
        metrics::gauge!(obs::CONFLICTS_ACTIVE, "input" => input.id.clone()).set(fresh.len() as f64);

        let old = if fresh.is_empty() {
            self.conflicts.remove(&input.id).map(|(_, v)| v)
        } else {
            self.conflicts.insert(input.id.clone(), fresh.clone())
        }
        .unwrap_or_default();

        let mut removed: Vec<ScheduleCandidate> = old
            .iter()
            .filter(|(id, _)| !fresh.contains_key(id))
            .map(|(_, c)| c.schedule.clone())
            .collect();
        let mut added: Vec<ScheduleCandidate> = fresh
            .iter()
            .filter(|(id, _)| !old.contains_key(id))
            .map(|(_, c)| c.schedule.clone())
            .collect();
        removed.sort_by(result_order);
        added.sort_by(result_order);

        debug!(
            input = %input.id,
            live = live.len(),
            conflicts = fresh.len(),
            added = added.len(),
            removed = removed.len(),
            reason,
            "conflicts recomputed"
        );

        self.publish_conflicts(&input.id, false, removed);
        self.publish_conflicts(&input.id, true, added);
    }

    fn publish_conflicts(&self, input_id: &str, conflicting: bool, schedules: Vec<ScheduleCandidate>) {
        if schedules.is_empty() {
            return;
        }
        let direction = if conflicting { "added" } else { "removed" };
        metrics::counter!(obs::CONFLICT_EVENTS_TOTAL, "direction" => direction)
            .increment(schedules.len() as u64);
        self.notify.send(Notification::ConflictStateChanged {
            input_id: input_id.to_string(),
            conflicting,
            schedules,
        });
    }

    /// Forget an input entirely. No conflict events are published.
    fn drop_input_state(&self, input_id: &str) {
        self.index.drop_input(input_id);
        self.conflicts.remove(input_id);
        metrics::gauge!(obs::CONFLICTS_ACTIVE, "input" => input_id.to_string()).set(0.0);
    }
}
