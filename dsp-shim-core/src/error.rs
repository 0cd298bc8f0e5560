use thiserror::Error;

use crate::component::{Command, LinkError, Status};

/// All errors produced by dsp-shim-core.
#[derive(Debug, Error)]
pub enum DspError {
    #[error("unknown component type: {id}")]
    UnknownComponent { id: String },

    #[error("failed to construct component {id}: {source}")]
    ComponentConstructionFailed {
        id: String,
        #[source]
        source: LinkError,
    },

    #[error("input buffer overflow: {requested} bytes requested, {available} available")]
    BufferOverflow { requested: usize, available: usize },

    #[error("input buffer underflow: consume of {requested} bytes with {available} pending")]
    Underflow { requested: usize, available: usize },

    #[error("decoder made no progress with {pending} bytes pending")]
    DecoderStalled { pending: usize },

    #[error("session is faulted; reset or close it")]
    SessionFaulted,

    #[error("session is closed")]
    SessionClosed,

    #[error("session is not initialized")]
    NotInitialized,

    #[error("input already ended; reset the session to feed a new stream")]
    InputEnded,

    #[error("failed to allocate a {bytes}-byte buffer")]
    AllocationFailed { bytes: usize },

    #[error("component rejected {command:?} with fatal status {status}")]
    Component { command: Command, status: Status },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DspError {
    /// Stable numeric code recorded alongside the message in a session's last error.
    pub fn code(&self) -> i32 {
        match self {
            DspError::UnknownComponent { .. } => 1,
            DspError::ComponentConstructionFailed { .. } => 2,
            DspError::BufferOverflow { .. } => 3,
            DspError::Underflow { .. } => 4,
            DspError::DecoderStalled { .. } => 5,
            DspError::SessionFaulted => 6,
            DspError::SessionClosed => 7,
            DspError::NotInitialized => 8,
            DspError::Component { .. } => 9,
            DspError::InvalidConfig(_) => 10,
            DspError::Json(_) => 11,
            DspError::AllocationFailed { .. } => 12,
            DspError::InputEnded => 13,
            DspError::Other(_) => 99,
        }
    }

    /// Whether this error moves a session into the faulted state.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DspError::DecoderStalled { .. }
                | DspError::Underflow { .. }
                | DspError::Component { .. }
                | DspError::ComponentConstructionFailed { .. }
                | DspError::UnknownComponent { .. }
                | DspError::AllocationFailed { .. }
                | DspError::Other(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DspError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let errors = [
            DspError::UnknownComponent { id: "x".into() },
            DspError::BufferOverflow {
                requested: 1,
                available: 0,
            },
            DspError::Underflow {
                requested: 1,
                available: 0,
            },
            DspError::DecoderStalled { pending: 3 },
            DspError::SessionFaulted,
            DspError::SessionClosed,
            DspError::NotInitialized,
            DspError::InvalidConfig("bad".into()),
            DspError::AllocationFailed { bytes: 1 },
            DspError::InputEnded,
        ];
        let mut codes: Vec<i32> = errors.iter().map(DspError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn overflow_is_recoverable() {
        let err = DspError::BufferOverflow {
            requested: 10,
            available: 2,
        };
        assert!(!err.is_fatal());
        assert!(DspError::DecoderStalled { pending: 1 }.is_fatal());
        assert!(!DspError::InputEnded.is_fatal());
        assert!(DspError::AllocationFailed { bytes: 1 }.is_fatal());
    }
}
