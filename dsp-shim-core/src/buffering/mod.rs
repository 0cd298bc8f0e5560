//! Input accumulation and decoded output types.
//!
//! `StreamBuffer` reconciles arbitrarily chunked input with a component that
//! can only be driven once a threshold of bytes is buffered. `DecodedFrame`
//! is what a successful decode hands back to the caller.

pub mod chunk;
pub mod stream;

pub use chunk::DecodedFrame;
pub use stream::StreamBuffer;

/// Default input accumulation size in bytes.
pub const DEFAULT_INPUT_SIZE: usize = 4096;

/// Default output scratch size in bytes.
pub const DEFAULT_OUTPUT_SIZE: usize = 16384;
