use std::sync::Mutex;

use dashmap::DashMap;
use ulid::Generator;

use crate::engine::EngineError;
use crate::model::*;

/// In-memory data manager and input catalog.
pub struct MemoryStore {
    schedules: DashMap<ScheduleId, ScheduleCandidate>,
    series: DashMap<SeriesId, SeriesRecording>,
    inputs: DashMap<InputId, InputInfo>,
    channels: DashMap<ChannelId, InputId>,
    ids: Mutex<Generator>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            schedules: DashMap::new(),
            series: DashMap::new(),
            inputs: DashMap::new(),
            channels: DashMap::new(),
            ids: Mutex::new(Generator::new()),
        }
    }

    // ── Inputs and channels ──────────────────────────────────

    pub fn add_input(&self, input: InputInfo) {
        self.inputs.insert(input.id.clone(), input);
    }

    /// Forget an input and every channel routed to it.
    pub fn remove_input(&self, input_id: &str) -> Option<InputInfo> {
        self.channels.retain(|_, routed| routed.as_str() != input_id);
        self.inputs.remove(input_id).map(|(_, v)| v)
    }

    pub fn map_channel(&self, channel_id: ChannelId, input_id: impl Into<InputId>) {
        self.channels.insert(channel_id, input_id.into());
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    // ── Schedules ────────────────────────────────────────────

    /// Monotonic within this store, even inside one millisecond.
    pub fn next_id(&self) -> Result<ScheduleId, EngineError> {
        let mut ids = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        ids.generate()
            .map_err(|_| EngineError::LimitExceeded("schedule id space exhausted"))
    }

    /// Store a schedule, assigning an id to unsaved ones. Returns the stored copy.
    pub fn insert_schedule(&self, mut schedule: ScheduleCandidate) -> Result<ScheduleCandidate, EngineError> {
        if schedule.is_unsaved() {
            schedule.id = self.next_id()?;
        }
        self.schedules.insert(schedule.id, schedule.clone());
        Ok(schedule)
    }

    /// Replace a stored schedule. Returns the previous copy, if any.
    pub fn update_schedule(&self, schedule: ScheduleCandidate) -> Option<ScheduleCandidate> {
        self.schedules.insert(schedule.id, schedule)
    }

    pub fn remove_schedule(&self, id: &ScheduleId) -> Option<ScheduleCandidate> {
        self.schedules.remove(id).map(|(_, v)| v)
    }

    pub fn get_schedule(&self, id: &ScheduleId) -> Option<ScheduleCandidate> {
        self.schedules.get(id).map(|e| e.value().clone())
    }

    pub fn schedule_count(&self) -> usize {
        self.schedules.len()
    }

    // ── Series ───────────────────────────────────────────────

    pub fn add_series(&self, series: SeriesRecording) {
        self.series.insert(series.id, series);
    }
}

impl ScheduleSource for MemoryStore {
    fn all_schedules(&self) -> Vec<ScheduleCandidate> {
        let mut all: Vec<ScheduleCandidate> = self.schedules.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|s| s.id);
        all
    }

    fn schedules_for_series(&self, series_id: SeriesId) -> Vec<ScheduleCandidate> {
        let mut found: Vec<ScheduleCandidate> = self
            .schedules
            .iter()
            .filter(|e| e.series_id == Some(series_id))
            .map(|e| e.value().clone())
            .collect();
        found.sort_by_key(|s| s.id);
        found
    }

    fn series_recordings(&self) -> Vec<SeriesRecording> {
        let mut all: Vec<SeriesRecording> = self.series.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|s| s.id);
        all
    }
}

impl InputCatalog for MemoryStore {
    fn input(&self, input_id: &str) -> Option<InputInfo> {
        self.inputs.get(input_id).map(|e| e.value().clone())
    }

    fn input_for_channel(&self, channel_id: ChannelId) -> Option<InputInfo> {
        let input_id = self.channels.get(&channel_id)?.value().clone();
        self.input(&input_id)
    }
}
