//! `DecodeSession`: push compressed bytes, pull decoded PCM.
//!
//! ## Lifecycle
//!
//! ```text
//! DecodeSession::new()          → Uninitialized
//!     └─► initialize()          → component resolved, buffer allocated, Ready
//!         ├─► feed()            → bytes buffered (refused once draining)
//!         ├─► decode()          → WouldBlock | Decoded | NeedMoreInput
//!         ├─► end_of_input()    → Draining: decode below threshold until empty
//!         ├─► reset()           → back to Ready (rebuilds a faulted component)
//!         └─► close()           → Closed, component and buffer released once
//! ```
//!
//! A fatal component status, a stall, or an inconsistent byte count moves
//! the session to `Faulted` and releases the component and buffer right
//! away. Every later `feed`/`decode` fails with `SessionFaulted` until
//! `reset` or `close`.
//!
//! ## Threading
//!
//! A session is not internally synchronized. `feed` and `decode` must be
//! serialized by the caller; the dispatch call underneath may block while
//! the remote core works.

pub mod config;
pub mod state;

pub use config::{CodecParams, SessionConfig};
pub use state::{LastError, SessionState, SessionStats};

use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, error, info, warn};

use crate::{
    buffering::{DecodedFrame, StreamBuffer},
    component::{
        Command, ComponentHandle, ComponentType, CoreConnector, Param, ParamId, Status,
    },
    error::{DspError, Result},
    registry::{ComponentDescriptor, ComponentRegistry},
};

/// Result of a `decode` call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeOutcome<'a> {
    /// The component ran and reported progress.
    Decoded(DecodedFrame<'a>),
    /// Not enough input buffered; feed more before retrying.
    WouldBlock,
    /// The component accepted the call but needs more input than is pending.
    NeedMoreInput,
    /// Drain mode and the buffer is empty.
    EndOfStream,
}

impl<'a> DecodeOutcome<'a> {
    pub fn frame(&self) -> Option<&DecodedFrame<'a>> {
        match self {
            DecodeOutcome::Decoded(frame) => Some(frame),
            _ => None,
        }
    }
}

/// Internal result of one decode step, free of borrows on the session.
enum Step {
    WouldBlock,
    NeedMoreInput,
    EndOfStream,
    Produced { consumed: usize, produced: usize },
}

/// One compressed stream being decoded by one remote component.
pub struct DecodeSession {
    config: SessionConfig,
    connector: Arc<dyn CoreConnector>,
    /// Set once resolution succeeds; used to rebuild after a fault.
    descriptor: Option<ComponentDescriptor>,
    component: Option<ComponentHandle>,
    input: Option<StreamBuffer>,
    output: Vec<u8>,
    state: SessionState,
    last_error: Option<LastError>,
    stats: SessionStats,
    /// Size of the last chunk `feed` refused for lack of space.
    rejected_chunk: Option<usize>,
}

impl DecodeSession {
    /// Create an uninitialized session. Call `initialize()` before feeding.
    ///
    /// # Errors
    /// `InvalidConfig` if the buffer sizes are zero.
    pub fn new(mut config: SessionConfig, connector: Arc<dyn CoreConnector>) -> Result<Self> {
        config.normalize()?;
        Ok(Self {
            config,
            connector,
            descriptor: None,
            component: None,
            input: None,
            output: Vec::new(),
            state: SessionState::Uninitialized,
            last_error: None,
            stats: SessionStats::default(),
            rejected_chunk: None,
        })
    }

    /// `new()` followed by `initialize()`.
    pub fn open(
        config: SessionConfig,
        connector: Arc<dyn CoreConnector>,
        registry: &ComponentRegistry,
        id: &str,
        id_length: usize,
    ) -> Result<Self> {
        let mut session = Self::new(config, connector)?;
        session.initialize(registry, id, id_length)?;
        Ok(session)
    }

    /// Resolve the component, push codec parameters, allocate buffers.
    ///
    /// On failure the session is `Faulted` and never reaches `Ready`.
    ///
    /// # Errors
    /// - `UnknownComponent` / `ComponentConstructionFailed` from the registry.
    /// - `Component` if the component rejects a parameter with a fatal status.
    /// - `SessionClosed` after `close()`.
    pub fn initialize(
        &mut self,
        registry: &ComponentRegistry,
        id: &str,
        id_length: usize,
    ) -> Result<()> {
        if self.state.is_terminal() {
            return Err(self.record(DspError::SessionClosed));
        }
        if self.descriptor.is_some() {
            debug!(id, "session already initialized");
            return Ok(());
        }

        match registry.resolve_descriptor(self.connector.as_ref(), id, id_length) {
            Ok((descriptor, handle)) => {
                self.descriptor = Some(descriptor);
                self.install(handle)
            }
            Err(e) => {
                self.state = SessionState::Faulted;
                Err(self.record(e))
            }
        }
    }

    /// Append compressed input. Returns the number of bytes accepted.
    ///
    /// # Errors
    /// - `BufferOverflow` if the chunk does not fit even after compaction; the
    ///   session stays usable, decode to make room and retry.
    /// - `InputEnded` after `end_of_input()`; only `reset()` reopens the
    ///   session for input.
    pub fn feed(&mut self, input: &[u8]) -> Result<usize> {
        self.ensure_active().map_err(|e| self.record(e))?;
        if self.state == SessionState::Draining {
            return Err(self.record(DspError::InputEnded));
        }

        let result = match self.input.as_mut() {
            Some(buffer) => {
                let appended = buffer.append(input);
                self.stats.compactions = buffer.compactions();
                appended
            }
            None => Err(DspError::NotInitialized),
        };
        match result {
            Ok(()) => {
                self.rejected_chunk = None;
                self.last_error = None;
                Ok(input.len())
            }
            Err(e) => {
                debug!(len = input.len(), "feed rejected: {e}");
                if let DspError::BufferOverflow { requested, .. } = e {
                    self.rejected_chunk = Some(requested);
                }
                Err(self.record(e))
            }
        }
    }

    /// Run the component once over the pending input window.
    ///
    /// # Errors
    /// - `DecoderStalled` if the component made no progress on a call it
    ///   should have been able to service.
    /// - `Component` on a fatal component status.
    /// - `SessionFaulted` / `SessionClosed` / `NotInitialized` on misuse.
    pub fn decode(&mut self) -> Result<DecodeOutcome<'_>> {
        let step = match self.step() {
            Ok(step) => step,
            Err(e) => {
                if e.is_fatal() {
                    self.fault(&e);
                }
                return Err(self.record(e));
            }
        };
        self.last_error = None;

        Ok(match step {
            Step::WouldBlock => DecodeOutcome::WouldBlock,
            Step::NeedMoreInput => DecodeOutcome::NeedMoreInput,
            Step::EndOfStream => DecodeOutcome::EndOfStream,
            Step::Produced { consumed, produced } => {
                let frames = u32::from(produced > 0);
                DecodeOutcome::Decoded(DecodedFrame::new(
                    &self.output[..produced],
                    frames,
                    consumed,
                ))
            }
        })
    }

    /// Declare that no further input will arrive.
    pub fn end_of_input(&mut self) -> Result<()> {
        self.ensure_active().map_err(|e| self.record(e))?;
        if let Some(buffer) = self.input.as_mut() {
            buffer.mark_end_of_stream();
        }
        self.state = SessionState::Draining;
        debug!("session draining");
        Ok(())
    }

    /// Discard buffered input and counters and return to `Ready`.
    ///
    /// A component released by a fault is rebuilt from the same descriptor;
    /// a live one receives a `Reset` command.
    pub fn reset(&mut self) -> Result<()> {
        if self.state.is_terminal() {
            return Err(self.record(DspError::SessionClosed));
        }
        let Some(descriptor) = self.descriptor else {
            self.state = SessionState::Uninitialized;
            self.last_error = None;
            return Ok(());
        };
        self.stats = SessionStats::default();
        self.rejected_chunk = None;

        match self.component.as_mut() {
            Some(component) => {
                let status = component.reset();
                if status.is_fatal() {
                    let err = DspError::Component {
                        command: Command::Reset,
                        status,
                    };
                    self.fault(&err);
                    return Err(self.record(err));
                }
                if let Some(buffer) = self.input.as_mut() {
                    buffer.reset();
                }
                self.state = SessionState::Ready;
                self.last_error = None;
                debug!("session reset");
                Ok(())
            }
            None => match descriptor.instantiate(self.connector.as_ref()) {
                Ok(handle) => {
                    info!(id = descriptor.identifier, "rebuilding component after reset");
                    self.install(handle)
                }
                Err(e) => {
                    self.state = SessionState::Faulted;
                    Err(self.record(e))
                }
            },
        }
    }

    /// Release the component and buffers. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.state.is_terminal() {
            return Ok(());
        }
        if let Some(mut component) = self.component.take() {
            component.release();
        }
        self.input = None;
        self.output = Vec::new();
        self.state = SessionState::Closed;
        info!(
            frames = self.stats.frame_count,
            consumed = self.stats.total_consumed,
            "session closed"
        );
        Ok(())
    }

    /// Set a codec parameter, forwarding it to the component when one is live.
    pub fn set_param(&mut self, param: Param) -> Result<()> {
        match self.state {
            SessionState::Closed => return Err(self.record(DspError::SessionClosed)),
            SessionState::Faulted => return Err(self.record(DspError::SessionFaulted)),
            _ => {}
        }

        if let Some(component) = self.component.as_mut() {
            let status = push_param(component, &param);
            if status.is_fatal() {
                let err = DspError::Component {
                    command: Command::SetParam,
                    status,
                };
                self.fault(&err);
                return Err(self.record(err));
            }
        }

        self.config.params.apply(&param);
        let threshold = self.config.effective_threshold();
        if let Some(buffer) = self.input.as_mut() {
            buffer.set_threshold(threshold);
        }
        Ok(())
    }

    /// Query a codec parameter from the component, falling back to the
    /// configured value when the component does not report it.
    pub fn get_param(&mut self, id: ParamId) -> Result<Param> {
        if self.state.is_terminal() {
            return Err(self.record(DspError::SessionClosed));
        }

        if id != ParamId::CodecData {
            if let Some(component) = self.component.as_mut() {
                let (status, value) = component.get_param(id);
                if status.is_fatal() {
                    let err = DspError::Component {
                        command: Command::GetParam,
                        status,
                    };
                    self.fault(&err);
                    return Err(self.record(err));
                }
                if status.is_ok() {
                    if let Some(param) = Param::from_scalar(id, value) {
                        return Ok(param);
                    }
                }
            }
        }
        Ok(self.config.params.get(id))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn last_error(&self) -> Option<&LastError> {
        self.last_error.as_ref()
    }

    pub fn last_error_message(&self) -> Option<&str> {
        self.last_error.as_ref().map(|e| e.message.as_str())
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn component_type(&self) -> Option<ComponentType> {
        self.descriptor.map(|d| d.kind)
    }

    pub fn is_initialized(&self) -> bool {
        self.component.is_some()
    }

    /// Input buffer, while one is allocated.
    pub fn buffer(&self) -> Option<&StreamBuffer> {
        self.input.as_ref()
    }

    pub fn ready_for_decode(&self) -> bool {
        self.input
            .as_ref()
            .is_some_and(StreamBuffer::ready_for_decode)
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    fn step(&mut self) -> Result<Step> {
        self.ensure_active()?;
        let (Some(buffer), Some(component)) = (self.input.as_mut(), self.component.as_mut())
        else {
            return Err(DspError::NotInitialized);
        };

        if !buffer.ready_for_decode() {
            if buffer.is_end_of_stream() && buffer.is_empty() {
                return Ok(Step::EndOfStream);
            }
            self.stats.would_block += 1;
            return Ok(Step::WouldBlock);
        }

        let draining = buffer.is_end_of_stream();
        let pending = buffer.pending_len();
        self.state = SessionState::Decoding;
        self.stats.decode_calls += 1;

        let (status, transfer) = component.process(buffer.pending(), &mut self.output);
        if status.is_fatal() {
            return Err(DspError::Component {
                command: Command::Process,
                status,
            });
        }
        if transfer.produced > self.output.len() {
            return Err(DspError::Other(anyhow!(
                "component reported {} output bytes into a {}-byte buffer",
                transfer.produced,
                self.output.len()
            )));
        }

        let resting = if draining {
            SessionState::Draining
        } else {
            SessionState::Ready
        };

        if transfer.consumed == 0 && transfer.produced == 0 {
            // A warning status may ask for more input, but only if more can still fit.
            let free = buffer.capacity() - pending;
            let starved = free == 0 || self.rejected_chunk.is_some_and(|n| n > free);
            if status.is_ok() || draining || starved {
                warn!(pending, %status, draining, "decoder stalled");
                return Err(DspError::DecoderStalled { pending });
            }
            self.state = resting;
            return Ok(Step::NeedMoreInput);
        }

        buffer.consume(transfer.consumed)?;
        self.stats.total_consumed += transfer.consumed as u64;
        self.stats.total_produced += transfer.produced as u64;
        if transfer.produced > 0 {
            self.stats.frame_count += 1;
        }
        self.state = resting;

        Ok(Step::Produced {
            consumed: transfer.consumed,
            produced: transfer.produced,
        })
    }

    fn install(&mut self, mut handle: ComponentHandle) -> Result<()> {
        for param in self.config.params.to_params() {
            let status = push_param(&mut handle, &param);
            if status.is_fatal() {
                handle.release();
                let err = DspError::Component {
                    command: Command::SetParam,
                    status,
                };
                self.fault(&err);
                return Err(self.record(err));
            }
        }

        let threshold = self.config.effective_threshold();
        let buffers = StreamBuffer::try_new(self.config.buf_size, threshold).and_then(|input| {
            zeroed(self.config.output_size).map(|output| (input, output))
        });
        let (input, output) = match buffers {
            Ok(buffers) => buffers,
            Err(e) => {
                handle.release();
                self.fault(&e);
                return Err(self.record(e));
            }
        };

        info!(
            kind = ?handle.kind(),
            buf_size = self.config.buf_size,
            threshold,
            "session ready"
        );
        self.component = Some(handle);
        self.input = Some(input);
        self.output = output;
        self.rejected_chunk = None;
        self.state = SessionState::Ready;
        self.last_error = None;
        Ok(())
    }

    fn ensure_active(&self) -> Result<()> {
        match self.state {
            SessionState::Closed => Err(DspError::SessionClosed),
            SessionState::Faulted => Err(DspError::SessionFaulted),
            SessionState::Uninitialized => Err(DspError::NotInitialized),
            SessionState::Ready | SessionState::Decoding | SessionState::Draining => Ok(()),
        }
    }

    /// Move to `Faulted`, releasing the component and buffers.
    fn fault(&mut self, err: &DspError) {
        error!(state = ?self.state, "session faulted: {err}");
        self.state = SessionState::Faulted;
        if let Some(mut component) = self.component.take() {
            component.release();
        }
        self.input = None;
    }

    fn record(&mut self, err: DspError) -> DspError {
        self.last_error = Some(LastError::from(&err));
        err
    }
}

impl Drop for DecodeSession {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl std::fmt::Debug for DecodeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeSession")
            .field("state", &self.state)
            .field("component", &self.component_type())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Zero-filled scratch buffer, allocated without aborting on failure.
fn zeroed(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| DspError::AllocationFailed { bytes: len })?;
    buf.resize(len, 0);
    Ok(buf)
}

fn push_param(handle: &mut ComponentHandle, param: &Param) -> Status {
    match param {
        Param::CodecData(data) => handle.set_codec_data(data),
        other => handle.set_param(other.id(), other.scalar().unwrap_or_default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::LoopbackConnector;

    fn loopback_session(frame: usize, threshold: usize) -> (DecodeSession, LoopbackConnector) {
        let connector = LoopbackConnector::new(frame);
        let config = SessionConfig {
            threshold,
            ..SessionConfig::default()
        };
        let session = DecodeSession::open(
            config,
            Arc::new(connector.clone()),
            &ComponentRegistry::builtin(),
            "audio-decoder/mp3",
            18,
        )
        .unwrap();
        (session, connector)
    }

    #[test]
    fn uninitialized_session_rejects_feed() {
        let connector = LoopbackConnector::new(8);
        let mut session =
            DecodeSession::new(SessionConfig::default(), Arc::new(connector)).unwrap();
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(matches!(session.feed(&[1, 2, 3]), Err(DspError::NotInitialized)));
        assert_eq!(session.last_error().unwrap().code, 8);
    }

    #[test]
    fn loopback_round_trip() {
        let (mut session, _) = loopback_session(4, 4);
        session.feed(&[1, 2, 3, 4, 5, 6]).unwrap();

        let outcome = session.decode().unwrap();
        let frame = outcome.frame().unwrap();
        assert_eq!(frame.pcm, &[1, 2, 3, 4]);
        assert_eq!(frame.consumed, 4);
        assert_eq!(session.stats().frame_count, 1);
    }

    #[test]
    fn success_clears_last_error() {
        let (mut session, _) = loopback_session(4, 4);
        let _ = session.feed(&[0u8; 8192]);
        assert!(session.last_error().is_some());

        session.feed(&[0u8; 4]).unwrap();
        assert!(session.last_error().is_none());
    }

    #[test]
    fn unknown_id_faults_session() {
        let connector = LoopbackConnector::new(8);
        let mut session =
            DecodeSession::new(SessionConfig::default(), Arc::new(connector)).unwrap();
        let err = session
            .initialize(&ComponentRegistry::builtin(), "video-decoder/h264", 19)
            .unwrap_err();
        assert!(matches!(err, DspError::UnknownComponent { .. }));
        assert_eq!(session.state(), SessionState::Faulted);
        assert!(matches!(session.decode(), Err(DspError::SessionFaulted)));
    }

    #[test]
    fn params_reach_the_component() {
        let (mut session, connector) = loopback_session(4, 4);
        session.set_param(Param::Bitrate(192_000)).unwrap();
        assert_eq!(
            session.get_param(ParamId::Bitrate).unwrap(),
            Param::Bitrate(192_000)
        );

        session.set_param(Param::CodecData(vec![0x12, 0x10])).unwrap();
        assert_eq!(connector.log().codec_data, vec![0x12, 0x10]);
    }

    #[test]
    fn framed_input_decodes_below_threshold() {
        let (mut session, _) = loopback_session(4, 1024);
        session.feed(&[9u8; 4]).unwrap();
        assert!(matches!(session.decode().unwrap(), DecodeOutcome::WouldBlock));

        session.set_param(Param::Framed(true)).unwrap();
        assert!(session.ready_for_decode());
        assert!(matches!(session.decode().unwrap(), DecodeOutcome::Decoded(_)));
    }

    #[test]
    fn failed_allocation_faults_instead_of_ready() {
        let huge = config::MAX_BUFFER_SIZE;
        for config in [
            SessionConfig {
                buf_size: huge,
                threshold: 1,
                ..SessionConfig::default()
            },
            SessionConfig {
                output_size: huge,
                ..SessionConfig::default()
            },
        ] {
            let connector = LoopbackConnector::new(8);
            let mut session = DecodeSession::new(config, Arc::new(connector.clone())).unwrap();
            let err = session
                .initialize(&ComponentRegistry::builtin(), "audio-decoder/aac", 18)
                .unwrap_err();

            assert!(matches!(err, DspError::AllocationFailed { bytes } if bytes == huge));
            assert_eq!(session.state(), SessionState::Faulted);
            assert!(!session.is_initialized());
            assert_eq!(session.last_error().unwrap().code, 12);
            assert_eq!(connector.log().closed, 1);
        }
    }

    #[test]
    fn feed_after_end_of_input_is_refused() {
        let (mut session, _) = loopback_session(4, 4);
        session.feed(&[1u8; 6]).unwrap();
        session.end_of_input().unwrap();

        assert!(matches!(session.feed(&[2u8; 2]), Err(DspError::InputEnded)));
        assert_eq!(session.state(), SessionState::Draining);
        assert_eq!(session.buffer().unwrap().pending_len(), 6);

        session.reset().unwrap();
        assert_eq!(session.feed(&[3u8; 2]).unwrap(), 2);
    }
}
