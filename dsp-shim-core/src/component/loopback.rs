//! `LoopbackConnector`: host-side stand-in for the remote core.
//!
//! Used for bring-up before a real transport is wired in, and in tests.
//! Every `process` call consumes at most one fixed-size frame and echoes it
//! back, so the full feed → buffer → dispatch path can be exercised
//! deterministically.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::link::{CoreConnector, CoreLink, LinkError, Transfer};
use super::{ComponentType, ParamId, Status};

/// Counters shared by a connector and every link it created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopbackLog {
    pub opened: usize,
    pub closed: usize,
    pub inits: usize,
    pub resets: usize,
    pub bytes_processed: usize,
    pub codec_data: Vec<u8>,
}

/// Connector producing `LoopbackLink`s.
#[derive(Debug, Clone)]
pub struct LoopbackConnector {
    frame_size: usize,
    max_links: Option<usize>,
    log: Arc<Mutex<LoopbackLog>>,
}

impl LoopbackConnector {
    /// `frame_size`: bytes consumed (and echoed) per unit of work.
    pub fn new(frame_size: usize) -> Self {
        Self {
            frame_size,
            max_links: None,
            log: Arc::new(Mutex::new(LoopbackLog::default())),
        }
    }

    /// Refuse new links once `max_links` are open at the same time.
    pub fn with_link_limit(mut self, max_links: usize) -> Self {
        self.max_links = Some(max_links);
        self
    }

    /// Snapshot of the shared counters.
    pub fn log(&self) -> LoopbackLog {
        self.log.lock().clone()
    }
}

impl CoreConnector for LoopbackConnector {
    fn connect(&self, kind: ComponentType) -> Result<Box<dyn CoreLink>, LinkError> {
        let mut log = self.log.lock();
        let live = log.opened - log.closed;
        if let Some(max) = self.max_links {
            if live >= max {
                return Err(LinkError::Unavailable(format!(
                    "loopback core full ({live}/{max} components)"
                )));
            }
        }
        log.opened += 1;
        debug!(?kind, live = live + 1, "loopback link opened");

        Ok(Box::new(LoopbackLink {
            frame_size: self.frame_size,
            params: HashMap::new(),
            log: Arc::clone(&self.log),
            closed: false,
        }))
    }
}

/// Echoing link produced by `LoopbackConnector`.
pub struct LoopbackLink {
    frame_size: usize,
    params: HashMap<ParamId, u32>,
    log: Arc<Mutex<LoopbackLog>>,
    closed: bool,
}

impl LoopbackLink {
    fn ensure_open(&self) -> Result<(), LinkError> {
        if self.closed {
            return Err(LinkError::Disconnected);
        }
        Ok(())
    }
}

impl CoreLink for LoopbackLink {
    fn init(&mut self) -> Result<(), LinkError> {
        self.ensure_open()?;
        self.log.lock().inits += 1;
        Ok(())
    }

    fn set_param(&mut self, id: ParamId, value: u32) -> Result<(), LinkError> {
        self.ensure_open()?;
        self.params.insert(id, value);
        Ok(())
    }

    fn get_param(&mut self, id: ParamId) -> Result<u32, LinkError> {
        self.ensure_open()?;
        self.params.get(&id).copied().ok_or(LinkError::Rejected {
            code: Status::UNKNOWN_PARAM.0,
        })
    }

    fn set_codec_data(&mut self, data: &[u8]) -> Result<(), LinkError> {
        self.ensure_open()?;
        self.log.lock().codec_data = data.to_vec();
        Ok(())
    }

    fn process(&mut self, input: &[u8], output: &mut [u8]) -> Result<Transfer, LinkError> {
        self.ensure_open()?;
        let consumed = input.len().min(self.frame_size);
        let produced = consumed.min(output.len());
        output[..produced].copy_from_slice(&input[..produced]);
        self.log.lock().bytes_processed += consumed;
        Ok(Transfer::new(consumed, produced))
    }

    fn reset(&mut self) -> Result<(), LinkError> {
        self.ensure_open()?;
        self.log.lock().resets += 1;
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.log.lock().closed += 1;
        }
    }
}
