use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::EngineError;
use crate::limits::*;
use crate::model::*;
use crate::store::MemoryStore;

/// A point-in-time dump of the data manager: inputs with their channels,
/// schedules and series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub inputs: Vec<InputEntry>,
    #[serde(default)]
    pub schedules: Vec<ScheduleCandidate>,
    #[serde(default)]
    pub series: Vec<SeriesRecording>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEntry {
    #[serde(flatten)]
    pub info: InputInfo,
    #[serde(default)]
    pub channels: Vec<ChannelId>,
}

impl Snapshot {
    pub fn from_json(text: &str) -> Result<Self, EngineError> {
        serde_json::from_str(text).map_err(|e| EngineError::Snapshot(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Snapshot(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        for entry in &self.inputs {
            if entry.info.tuner_count > MAX_TUNER_COUNT {
                return Err(EngineError::LimitExceeded("too many tuners on input"));
            }
            if let Some(&bad) = entry.channels.iter().find(|&&c| c == INVALID_CHANNEL_ID) {
                return Err(EngineError::InvalidChannel(bad));
            }
        }

        let mut live_per_input: HashMap<&str, usize> = HashMap::new();
        for s in &self.schedules {
            if s.span.start >= s.span.end {
                return Err(EngineError::InvalidSpan { start: s.span.start, end: s.span.end });
            }
            if s.channel_id == INVALID_CHANNEL_ID {
                return Err(EngineError::InvalidChannel(s.channel_id));
            }
            if s.is_live() {
                let count = live_per_input.entry(s.input_id.as_str()).or_default();
                *count += 1;
                if *count > MAX_LIVE_SCHEDULES_PER_INPUT {
                    return Err(EngineError::LimitExceeded("too many live schedules on input"));
                }
            }
        }
        Ok(())
    }

    /// Validate and load everything into a fresh store. Schedules without an id get one.
    pub fn into_store(self) -> Result<MemoryStore, EngineError> {
        self.validate()?;
        let store = MemoryStore::new();
        for entry in self.inputs {
            for channel in &entry.channels {
                store.map_channel(*channel, entry.info.id.clone());
            }
            store.add_input(entry.info);
        }
        for series in self.series {
            store.add_series(series);
        }
        for schedule in self.schedules {
            store.insert_schedule(schedule)?;
        }
        Ok(store)
    }
}
