//! Narrow contract to the remote processing core.
//!
//! The physical transport (proxy, pipeline and queue primitives) lives
//! outside this crate. Everything the shim needs from it is expressed by
//! `CoreConnector` (bring a component up on the core) and `CoreLink` (drive
//! one component instance). Calls are synchronous and may block while the
//! remote core works; timeouts are the implementor's concern.

use thiserror::Error;

use super::{ComponentType, ParamId, Status};

/// Failures reported by the transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("processing core unavailable: {0}")]
    Unavailable(String),

    #[error("processing core rejected request with code {code:#x}")]
    Rejected { code: u32 },

    #[error("component init returned {0}")]
    InitFailed(Status),

    #[error("link to processing core lost")]
    Disconnected,
}

/// Byte counts reported by one unit of work on the core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transfer {
    pub consumed: usize,
    pub produced: usize,
}

impl Transfer {
    pub fn new(consumed: usize, produced: usize) -> Self {
        Self { consumed, produced }
    }
}

/// Creates component instances on the remote core.
pub trait CoreConnector: Send + Sync {
    /// Allocate core-side resources for a component of `kind`.
    ///
    /// # Errors
    /// Returns an error if the core cannot host another instance.
    fn connect(&self, kind: ComponentType) -> Result<Box<dyn CoreLink>, LinkError>;
}

/// One live component instance on the remote core.
pub trait CoreLink: Send {
    /// Run the component's init sequence.
    fn init(&mut self) -> Result<(), LinkError>;

    fn set_param(&mut self, id: ParamId, value: u32) -> Result<(), LinkError>;

    fn get_param(&mut self, id: ParamId) -> Result<u32, LinkError>;

    /// Hand opaque codec configuration (e.g. an AAC AudioSpecificConfig) to the core.
    fn set_codec_data(&mut self, data: &[u8]) -> Result<(), LinkError>;

    /// Submit one unit of work.
    ///
    /// # Returns
    /// How many bytes of `input` were consumed and how many bytes were
    /// written to the front of `output`.
    fn process(&mut self, input: &[u8], output: &mut [u8]) -> Result<Transfer, LinkError>;

    /// Flush decoder state on the core (e.g. after a seek).
    fn reset(&mut self) -> Result<(), LinkError>;

    /// Release core-side resources. Called exactly once per link.
    fn close(&mut self);
}
