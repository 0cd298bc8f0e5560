//! Processing components and their uniform command-dispatch contract.
//!
//! A component is a codec or renderer running on the remote core. The host
//! drives every component through one four-argument call,
//! `dispatch(core, command, index, value) -> Status`, where `value` is a
//! typed payload rather than an untyped pointer.
//!
//! ```text
//! Registry::resolve ─► FactoryFn(connector, DispatchFn, ComponentType)
//!                          │
//!                          ▼
//!                   ComponentHandle ── DispatchFn ──► CoreLink ──► remote core
//! ```

pub mod dispatch;
pub mod link;
pub mod loopback;
pub mod param;

pub use link::{CoreConnector, CoreLink, LinkError, Transfer};
pub use loopback::{LoopbackConnector, LoopbackLog};
pub use param::{Param, ParamId, StreamType};

use std::fmt;

use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Component types
// ---------------------------------------------------------------------------

/// Type codes understood by the remote core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ComponentType {
    Mp3Dec = 1,
    AacDec = 2,
    BsacDec = 3,
    DabPlusDec = 4,
    Mp2Dec = 5,
    DrmDec = 6,
    SbcDec = 7,
    SbcEnc = 8,
    OpusDec = 9,
    OggDec = 10,
    Mp3ExtDec = 11,
    AacExtDec = 12,
    AacPlusDec = 13,
    Ac3Dec = 14,
    DdpDec = 15,
    NbAmrDec = 16,
    WbAmrDec = 17,
    WmaDec = 18,
    PcmDec = 19,
    EsaiRenderer = 20,
    SaiRenderer = 21,
}

impl ComponentType {
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn class(self) -> ComponentClass {
        match self {
            ComponentType::SbcEnc => ComponentClass::Encoder,
            ComponentType::EsaiRenderer | ComponentType::SaiRenderer => ComponentClass::Renderer,
            _ => ComponentClass::Decoder,
        }
    }
}

/// Broad role of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentClass {
    Decoder,
    Encoder,
    Renderer,
}

// ---------------------------------------------------------------------------
// Dispatch contract
// ---------------------------------------------------------------------------

/// Commands accepted by every dispatch function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Command {
    Init = 0x01,
    SetParam = 0x02,
    GetParam = 0x03,
    Process = 0x04,
    Reset = 0x05,
    Teardown = 0x06,
}

impl Command {
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Dispatch status word. Bit 31 marks a fatal status; `0` is success and
/// any other value is a non-fatal warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status(pub u32);

impl Status {
    const FATAL_BIT: u32 = 0x8000_0000;

    pub const OK: Status = Status(0);
    /// Not enough input for a unit of work; feed more and retry.
    pub const NEED_MORE_INPUT: Status = Status(0x0000_0001);
    /// Parameter not known to this component.
    pub const UNKNOWN_PARAM: Status = Status(0x0000_0002);
    /// Payload variant does not fit the command.
    pub const BAD_PAYLOAD: Status = Status(Self::FATAL_BIT | 0x01);
    /// The transport to the core failed.
    pub const LINK_FAILURE: Status = Status(Self::FATAL_BIT | 0x02);
    /// Output layout makes processing impossible (e.g. zero channels).
    pub const BAD_CONFIG: Status = Status(Self::FATAL_BIT | 0x03);
    /// Handle was already torn down.
    pub const RELEASED: Status = Status(Self::FATAL_BIT | 0x04);

    pub fn is_ok(self) -> bool {
        self.0 == 0
    }

    pub fn is_fatal(self) -> bool {
        self.0 & Self::FATAL_BIT != 0
    }

    /// Translate a transport error into a status word.
    pub fn from_link_error(err: &LinkError) -> Status {
        match err {
            LinkError::Rejected { code } => Status(*code),
            LinkError::InitFailed(status) => *status,
            LinkError::Unavailable(_) | LinkError::Disconnected => Status::LINK_FAILURE,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// In/out payload of a `Process` command.
#[derive(Debug)]
pub struct ProcessArgs<'a> {
    pub input: &'a [u8],
    pub output: &'a mut [u8],
    /// Written by the component: bytes of `input` used.
    pub consumed: usize,
    /// Written by the component: bytes of `output` filled.
    pub produced: usize,
}

impl<'a> ProcessArgs<'a> {
    pub fn new(input: &'a [u8], output: &'a mut [u8]) -> Self {
        Self {
            input,
            output,
            consumed: 0,
            produced: 0,
        }
    }
}

/// Typed payload carried by a dispatch call.
#[derive(Debug)]
pub enum CommandValue<'a> {
    None,
    /// Scalar parameter; `GetParam` writes the result into `value`.
    Param { id: ParamId, value: u32 },
    /// Opaque codec configuration blob.
    CodecData(&'a [u8]),
    Process(ProcessArgs<'a>),
}

/// Per-instance state seen by a dispatch function.
pub struct ComponentCore {
    pub kind: ComponentType,
    pub link: Box<dyn CoreLink>,
    /// Output layout cached from `SetParam`, needed by host-side processing.
    pub channels: u32,
    pub depth: u32,
}

impl ComponentCore {
    pub fn new(kind: ComponentType, link: Box<dyn CoreLink>) -> Self {
        Self {
            kind,
            link,
            channels: 2,
            depth: 16,
        }
    }
}

impl fmt::Debug for ComponentCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentCore")
            .field("kind", &self.kind)
            .field("channels", &self.channels)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

/// Uniform command entry point of a component class.
pub type DispatchFn = fn(&mut ComponentCore, Command, u32, &mut CommandValue<'_>) -> Status;

/// Class constructor: connect, wire the dispatch function, run init.
pub type FactoryFn =
    fn(&dyn CoreConnector, DispatchFn, ComponentType) -> Result<ComponentHandle, LinkError>;

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Exclusive capability to drive one component instance.
///
/// Released exactly once, either explicitly via `release()` or on drop.
pub struct ComponentHandle {
    core: ComponentCore,
    class: ComponentClass,
    dispatch: DispatchFn,
    released: bool,
}

impl ComponentHandle {
    pub fn new(
        kind: ComponentType,
        class: ComponentClass,
        dispatch: DispatchFn,
        link: Box<dyn CoreLink>,
    ) -> Self {
        Self {
            core: ComponentCore::new(kind, link),
            class,
            dispatch,
            released: false,
        }
    }

    pub fn kind(&self) -> ComponentType {
        self.core.kind
    }

    pub fn class(&self) -> ComponentClass {
        self.class
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Issue a raw command through this component's dispatch function.
    pub fn command(
        &mut self,
        command: Command,
        index: u32,
        value: &mut CommandValue<'_>,
    ) -> Status {
        if self.released {
            return Status::RELEASED;
        }
        (self.dispatch)(&mut self.core, command, index, value)
    }

    /// Run one unit of work, returning the status and the reported byte counts.
    pub fn process(&mut self, input: &[u8], output: &mut [u8]) -> (Status, Transfer) {
        let mut value = CommandValue::Process(ProcessArgs::new(input, output));
        let status = self.command(Command::Process, 0, &mut value);
        match value {
            CommandValue::Process(args) => (status, Transfer::new(args.consumed, args.produced)),
            _ => (status, Transfer::default()),
        }
    }

    pub fn set_param(&mut self, id: ParamId, value: u32) -> Status {
        self.command(Command::SetParam, id.code(), &mut CommandValue::Param { id, value })
    }

    pub fn get_param(&mut self, id: ParamId) -> (Status, u32) {
        let mut value = CommandValue::Param { id, value: 0 };
        let status = self.command(Command::GetParam, id.code(), &mut value);
        match value {
            CommandValue::Param { value, .. } => (status, value),
            _ => (status, 0),
        }
    }

    pub fn set_codec_data(&mut self, data: &[u8]) -> Status {
        self.command(
            Command::SetParam,
            ParamId::CodecData.code(),
            &mut CommandValue::CodecData(data),
        )
    }

    pub fn reset(&mut self) -> Status {
        self.command(Command::Reset, 0, &mut CommandValue::None)
    }

    /// Tear the component down. Returns `true` only for the call that did it.
    pub fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        let status = (self.dispatch)(&mut self.core, Command::Teardown, 0, &mut CommandValue::None);
        self.released = true;
        debug!(kind = ?self.core.kind, %status, "component released");
        true
    }

    fn init(&mut self) -> Result<(), LinkError> {
        let status = self.command(Command::Init, 0, &mut CommandValue::None);
        if status.is_fatal() {
            self.release();
            return Err(LinkError::InitFailed(status));
        }
        Ok(())
    }
}

impl Drop for ComponentHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHandle")
            .field("kind", &self.core.kind)
            .field("class", &self.class)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Class factories
// ---------------------------------------------------------------------------

/// Factory for decoder and encoder components.
pub fn audio_codec_factory(
    connector: &dyn CoreConnector,
    dispatch: DispatchFn,
    kind: ComponentType,
) -> Result<ComponentHandle, LinkError> {
    build(connector, dispatch, kind, kind.class())
}

/// Factory for output renderers.
pub fn renderer_factory(
    connector: &dyn CoreConnector,
    dispatch: DispatchFn,
    kind: ComponentType,
) -> Result<ComponentHandle, LinkError> {
    build(connector, dispatch, kind, ComponentClass::Renderer)
}

fn build(
    connector: &dyn CoreConnector,
    dispatch: DispatchFn,
    kind: ComponentType,
    class: ComponentClass,
) -> Result<ComponentHandle, LinkError> {
    let link = connector.connect(kind)?;
    let mut handle = ComponentHandle::new(kind, class, dispatch, link);
    handle.init()?;
    info!(?kind, ?class, "component constructed");
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_bit_classification() {
        assert!(Status::OK.is_ok());
        assert!(!Status::NEED_MORE_INPUT.is_fatal());
        assert!(Status::LINK_FAILURE.is_fatal());
        assert!(Status(0x8000_1234).is_fatal());
    }

    #[test]
    fn link_errors_map_to_status() {
        assert_eq!(
            Status::from_link_error(&LinkError::Disconnected),
            Status::LINK_FAILURE
        );
        assert_eq!(
            Status::from_link_error(&LinkError::Rejected { code: 0x1 }),
            Status::NEED_MORE_INPUT
        );
    }

    #[test]
    fn renderer_types_classify() {
        assert_eq!(ComponentType::SaiRenderer.class(), ComponentClass::Renderer);
        assert_eq!(ComponentType::SbcEnc.class(), ComponentClass::Encoder);
        assert_eq!(ComponentType::AacDec.class(), ComponentClass::Decoder);
        assert_eq!(ComponentType::AacDec.code(), 2);
    }

    #[test]
    fn release_runs_once() {
        let connector = LoopbackConnector::new(16);
        let mut handle =
            audio_codec_factory(&connector, dispatch::unia_codec, ComponentType::Mp3Dec).unwrap();
        assert!(handle.release());
        assert!(!handle.release());
        drop(handle);
        assert_eq!(connector.log().closed, 1);
    }

    #[test]
    fn released_handle_rejects_commands() {
        let connector = LoopbackConnector::new(16);
        let mut handle =
            audio_codec_factory(&connector, dispatch::unia_codec, ComponentType::Mp3Dec).unwrap();
        handle.release();
        assert_eq!(handle.reset(), Status::RELEASED);
    }
}
