use crate::model::{ChannelId, Ms};

#[derive(Debug)]
pub enum EngineError {
    NotInitialized,
    InvalidSpan { start: Ms, end: Ms },
    InvalidChannel(ChannelId),
    UnknownInput(String),
    InputCannotRecord(String),
    LimitExceeded(&'static str),
    Snapshot(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotInitialized => write!(f, "schedule manager not initialized yet"),
            EngineError::InvalidSpan { start, end } => {
                write!(f, "invalid recording window [{start}, {end})")
            }
            EngineError::InvalidChannel(id) => write!(f, "invalid channel: {id}"),
            EngineError::UnknownInput(id) => write!(f, "unknown input: {id}"),
            EngineError::InputCannotRecord(id) => {
                write!(f, "input {id} cannot record or has no tuners")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Snapshot(e) => write!(f, "snapshot error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
