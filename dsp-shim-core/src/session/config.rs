//! Session configuration (buffer sizing and codec parameters).
//!
//! Serialized as camelCase JSON; every field has a default so partial
//! documents are accepted:
//!
//! ```json
//! { "bufSize": 8192, "threshold": 2048, "params": { "channels": 2 } }
//! ```

use serde::{Deserialize, Serialize};

use crate::buffering::{DEFAULT_INPUT_SIZE, DEFAULT_OUTPUT_SIZE};
use crate::component::{ComponentType, Param, ParamId, StreamType};
use crate::error::{DspError, Result};

/// Largest 6-channel AAC frame the core accepts in one unit of work.
pub const AAC_6CH_FRAME_MAXLEN: usize = 6 * 768;

/// Push size the MP3 decoder is tuned for.
pub const MP3_INPUT_PUSH_SIZE: usize = 2048 * 4;

/// Largest buffer size `normalize()` accepts; no allocation can exceed it.
pub const MAX_BUFFER_SIZE: usize = isize::MAX as usize;

/// Codec parameters pushed to the component at initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct CodecParams {
    /// Output sample rate in Hz; `0` lets the component detect it.
    pub sample_rate: u32,
    pub channels: u32,
    /// Bits per output sample.
    pub depth: u32,
    /// Every fed chunk is exactly one frame; decode as soon as data arrives.
    pub framed: bool,
    pub downmix: bool,
    /// Bits per second; `0` when unknown.
    pub bitrate: u32,
    pub stream_type: StreamType,
    /// Opaque codec configuration, sent only when non-empty.
    pub codec_data: Vec<u8>,
}

impl Default for CodecParams {
    fn default() -> Self {
        Self {
            sample_rate: 0,
            channels: 2,
            depth: 16,
            framed: false,
            downmix: false,
            bitrate: 0,
            stream_type: StreamType::Unknown,
            codec_data: Vec::new(),
        }
    }
}

impl CodecParams {
    /// Parameters worth sending to a freshly built component.
    pub fn to_params(&self) -> Vec<Param> {
        let mut out = Vec::with_capacity(8);
        if self.sample_rate != 0 {
            out.push(Param::SampleRate(self.sample_rate));
        }
        out.push(Param::Channels(self.channels));
        out.push(Param::Depth(self.depth));
        out.push(Param::Framed(self.framed));
        out.push(Param::Downmix(self.downmix));
        if self.bitrate != 0 {
            out.push(Param::Bitrate(self.bitrate));
        }
        if self.stream_type != StreamType::Unknown {
            out.push(Param::StreamType(self.stream_type));
        }
        if !self.codec_data.is_empty() {
            out.push(Param::CodecData(self.codec_data.clone()));
        }
        out
    }

    /// Record a parameter value.
    pub fn apply(&mut self, param: &Param) {
        match param {
            Param::SampleRate(v) => self.sample_rate = *v,
            Param::Channels(v) => self.channels = *v,
            Param::Depth(v) => self.depth = *v,
            Param::Framed(b) => self.framed = *b,
            Param::Downmix(b) => self.downmix = *b,
            Param::Bitrate(v) => self.bitrate = *v,
            Param::StreamType(t) => self.stream_type = *t,
            Param::CodecData(d) => self.codec_data = d.clone(),
        }
    }

    /// Cached value of a parameter.
    pub fn get(&self, id: ParamId) -> Param {
        match id {
            ParamId::SampleRate => Param::SampleRate(self.sample_rate),
            ParamId::Channels => Param::Channels(self.channels),
            ParamId::Depth => Param::Depth(self.depth),
            ParamId::Framed => Param::Framed(self.framed),
            ParamId::Downmix => Param::Downmix(self.downmix),
            ParamId::Bitrate => Param::Bitrate(self.bitrate),
            ParamId::StreamType => Param::StreamType(self.stream_type),
            ParamId::CodecData => Param::CodecData(self.codec_data.clone()),
        }
    }
}

/// Configuration for `DecodeSession`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct SessionConfig {
    /// Input accumulation capacity in bytes. Default: 4096.
    pub buf_size: usize,
    /// Pending bytes required before a decode outside drain mode. Default: 1024.
    pub threshold: usize,
    /// Output scratch size in bytes. Default: 16384.
    pub output_size: usize,
    pub params: CodecParams,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            buf_size: DEFAULT_INPUT_SIZE,
            threshold: 1024,
            output_size: DEFAULT_OUTPUT_SIZE,
            params: CodecParams::default(),
        }
    }
}

impl SessionConfig {
    /// Buffer sizing tuned for a component type.
    pub fn for_component(kind: ComponentType) -> Self {
        let (buf_size, threshold) = match kind {
            ComponentType::Mp3Dec | ComponentType::Mp3ExtDec | ComponentType::Mp2Dec => {
                (MP3_INPUT_PUSH_SIZE, 2048)
            }
            ComponentType::AacDec
            | ComponentType::AacExtDec
            | ComponentType::AacPlusDec
            | ComponentType::BsacDec => (2 * AAC_6CH_FRAME_MAXLEN, AAC_6CH_FRAME_MAXLEN),
            _ => (DEFAULT_INPUT_SIZE, 1024),
        };
        Self {
            buf_size,
            threshold,
            ..Self::default()
        }
    }

    /// Parse a JSON document and normalize it.
    ///
    /// # Errors
    /// `Json` on malformed input, `InvalidConfig` on zero-sized buffers.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: SessionConfig = serde_json::from_str(json)?;
        config.normalize()?;
        Ok(config)
    }

    /// Reject zero or unaddressable buffer sizes and clamp the threshold
    /// into `[1, buf_size]`.
    pub fn normalize(&mut self) -> Result<()> {
        if self.buf_size == 0 {
            return Err(DspError::InvalidConfig("bufSize must be non-zero".into()));
        }
        if self.output_size == 0 {
            return Err(DspError::InvalidConfig("outputSize must be non-zero".into()));
        }
        if self.buf_size > MAX_BUFFER_SIZE || self.output_size > MAX_BUFFER_SIZE {
            return Err(DspError::InvalidConfig(format!(
                "buffer sizes must not exceed {MAX_BUFFER_SIZE} bytes"
            )));
        }
        self.threshold = self.threshold.clamp(1, self.buf_size);
        Ok(())
    }

    /// Threshold the input buffer actually uses.
    pub fn effective_threshold(&self) -> usize {
        if self.params.framed {
            1
        } else {
            self.threshold
        }
    }
}
