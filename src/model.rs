use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds. Every timestamp and duration uses it.
pub type Ms = i64;

pub type ScheduleId = Ulid;
pub type SeriesId = Ulid;
pub type ChannelId = i64;
pub type ProgramId = i64;
pub type InputId = String;

/// Channel id that never refers to a real channel.
pub const INVALID_CHANNEL_ID: ChannelId = -1;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// Like `new`, but returns `None` for empty or inverted windows.
    pub fn checked(start: Ms, end: Ms) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleState {
    NotStarted,
    InProgress,
    Finished,
    Failed,
    Clipped,
    Canceled,
    Deleted,
}

impl ScheduleState {
    /// Only live schedules compete for tuners.
    pub fn is_live(self) -> bool {
        matches!(self, ScheduleState::NotStarted | ScheduleState::InProgress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleKind {
    /// Bound to one EPG program; duplicates are matched by program id.
    Program,
    /// Raw channel + time range; duplicates are matched by channel and exact window.
    Timed,
}

/// One recording request competing for the tuners of a single input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleCandidate {
    pub id: ScheduleId,
    pub input_id: InputId,
    pub channel_id: ChannelId,
    #[serde(default)]
    pub program_id: Option<ProgramId>,
    pub span: Span,
    pub priority: i64,
    pub state: ScheduleState,
    #[serde(default)]
    pub series_id: Option<SeriesId>,
}

impl ScheduleCandidate {
    /// A channel/time-range request with no id assigned yet.
    pub fn timed(input_id: impl Into<InputId>, channel_id: ChannelId, span: Span) -> Self {
        Self {
            id: Ulid::nil(),
            input_id: input_id.into(),
            channel_id,
            program_id: None,
            span,
            priority: 0,
            state: ScheduleState::NotStarted,
            series_id: None,
        }
    }

    pub fn for_program(input_id: impl Into<InputId>, program: &Program) -> Self {
        Self {
            program_id: Some(program.id),
            ..Self::timed(input_id, program.channel_id, program.span)
        }
    }

    pub fn with_id(mut self, id: ScheduleId) -> Self {
        self.id = id;
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_state(mut self, state: ScheduleState) -> Self {
        self.state = state;
        self
    }

    pub fn with_series(mut self, series_id: SeriesId) -> Self {
        self.series_id = Some(series_id);
        self
    }

    pub fn kind(&self) -> ScheduleKind {
        if self.program_id.is_some() {
            ScheduleKind::Program
        } else {
            ScheduleKind::Timed
        }
    }

    pub fn start(&self) -> Ms {
        self.span.start
    }

    pub fn end(&self) -> Ms {
        self.span.end
    }

    pub fn is_live(&self) -> bool {
        self.state.is_live()
    }

    pub fn is_in_progress(&self) -> bool {
        self.state == ScheduleState::InProgress
    }

    /// True for probes built by preview queries that never reached the store.
    pub fn is_unsaved(&self) -> bool {
        self.id.is_nil()
    }

    /// Whether `other` is the same logical recording, so one supersedes the other.
    pub fn same_recording(&self, other: &ScheduleCandidate) -> bool {
        match self.kind() {
            ScheduleKind::Program => self.program_id == other.program_id,
            ScheduleKind::Timed => {
                self.channel_id == other.channel_id && self.span == other.span
            }
        }
    }
}

/// An EPG program that may be turned into a recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: ProgramId,
    pub channel_id: ChannelId,
    pub span: Span,
}

impl Program {
    pub fn is_valid(&self) -> bool {
        self.channel_id != INVALID_CHANNEL_ID && self.span.start < self.span.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRecording {
    pub id: SeriesId,
    pub input_id: InputId,
    pub priority: i64,
}

/// Capability of one physical input, as reported by the input catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputInfo {
    pub id: InputId,
    pub tuner_count: u32,
    #[serde(default = "default_can_record")]
    pub can_record: bool,
}

fn default_can_record() -> bool {
    true
}

/// Outcome for one schedule that cannot record its whole window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictInfo {
    pub schedule: ScheduleCandidate,
    /// `true` if a clipped part of the window can still be recorded.
    pub partial: bool,
}

// ── Collaborator seams ───────────────────────────────────────────

/// The canonical schedule store (the data manager).
pub trait ScheduleSource: Send + Sync {
    /// Every schedule regardless of state.
    fn all_schedules(&self) -> Vec<ScheduleCandidate>;

    fn schedules_for_series(&self, series_id: SeriesId) -> Vec<ScheduleCandidate>;

    fn series_recordings(&self) -> Vec<SeriesRecording>;
}

/// Lookup of physical inputs and the channels they serve.
pub trait InputCatalog: Send + Sync {
    fn input(&self, input_id: &str) -> Option<InputInfo>;

    fn input_for_channel(&self, channel_id: ChannelId) -> Option<InputInfo>;
}
