use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::{InputId, ScheduleCandidate};

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The manager finished its first index build.
    Initialized,
    SchedulesAdded(Vec<ScheduleCandidate>),
    SchedulesRemoved(Vec<ScheduleCandidate>),
    SchedulesStatusChanged(Vec<ScheduleCandidate>),
    /// Schedules that entered (`conflicting == true`) or left the conflict set of an input.
    ConflictStateChanged {
        input_id: InputId,
        conflicting: bool,
        schedules: Vec<ScheduleCandidate>,
    },
}

/// Broadcast hub: one stream for everything, plus one conflict stream per input.
pub struct NotifyHub {
    all: broadcast::Sender<Notification>,
    inputs: DashMap<InputId, broadcast::Sender<Notification>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            all: broadcast::channel(CHANNEL_CAPACITY).0,
            inputs: DashMap::new(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.all.subscribe()
    }

    /// Conflict changes for one input only. Creates the channel if needed.
    pub fn subscribe_input(&self, input_id: &str) -> broadcast::Receiver<Notification> {
        let sender = self
            .inputs
            .entry(input_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send a notification. No-op if nobody is listening.
    pub fn send(&self, notification: Notification) {
        if let Notification::ConflictStateChanged { input_id, .. } = &notification
            && let Some(sender) = self.inputs.get(input_id)
        {
            let _ = sender.send(notification.clone());
        }
        let _ = self.all.send(notification);
    }

    /// Drop an input's channel (e.g. when the input is uninstalled).
    pub fn remove(&self, input_id: &str) {
        self.inputs.remove(input_id);
    }
}
