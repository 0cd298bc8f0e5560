//! # dsp-shim-core
//!
//! Host-side shim that feeds compressed audio to a remote DSP component and
//! pulls decoded PCM back.
//!
//! ## Architecture
//!
//! ```text
//! caller ─ feed(bytes) ─► StreamBuffer ── threshold / drain gate ──┐
//!                                                                  │
//!   ComponentRegistry::resolve("audio-decoder/aac", 18)            ▼
//!        └─► FactoryFn ─► ComponentHandle ◄── decode() ── Process dispatch
//!                              │
//!                         CoreLink (transport, external) ─► remote core
//! ```
//!
//! The transport to the core is not part of this crate; implement
//! `CoreConnector` / `CoreLink` for it. `LoopbackConnector` is a host-side
//! stand-in for bring-up and tests.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod buffering;
pub mod component;
pub mod error;
pub mod registry;
pub mod session;

// Convenience re-exports for downstream crates
pub use buffering::{DecodedFrame, StreamBuffer};
pub use component::{
    ComponentHandle, ComponentType, CoreConnector, CoreLink, LinkError, LoopbackConnector, Param,
    ParamId, Status, Transfer,
};
pub use error::DspError;
pub use registry::{ComponentDescriptor, ComponentRegistry};
pub use session::{DecodeOutcome, DecodeSession, SessionConfig, SessionState};

/// Human-readable library version, e.g. for logging at startup.
pub fn version_info() -> &'static str {
    concat!("dsp-shim-core ", env!("CARGO_PKG_VERSION"))
}
