//! Observable session state: lifecycle, last error and counters.

use serde::{Deserialize, Serialize};

use crate::error::DspError;

/// Lifecycle of a `DecodeSession`.
///
/// ```text
/// Uninitialized ─► Ready ─► Decoding ─► Ready | Draining | Faulted
///                                                   │
///                              any state ─► Closed ◄┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Uninitialized,
    Ready,
    /// A dispatch call is in flight.
    Decoding,
    /// End of input signaled; decodes run below threshold until empty.
    Draining,
    /// A fatal error occurred; only `reset` or `close` are serviced.
    Faulted,
    Closed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        self == SessionState::Closed
    }
}

/// Diagnostic record of the most recent failing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastError {
    pub code: i32,
    pub message: String,
}

impl From<&DspError> for LastError {
    fn from(err: &DspError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Counters accumulated since initialization or the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// Decode calls that produced output.
    pub frame_count: u64,
    /// Input bytes the component reported consuming.
    pub total_consumed: u64,
    /// PCM bytes returned to the caller.
    pub total_produced: u64,
    /// Dispatch calls issued.
    pub decode_calls: u64,
    pub would_block: u64,
    /// Input buffer compactions since initialization or the last reset.
    pub compactions: u64,
}
