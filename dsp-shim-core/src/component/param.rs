//! Codec parameters exchanged through `SetParam` / `GetParam`.

use serde::{Deserialize, Serialize};

/// Parameter identifiers; the code travels as the dispatch `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ParamId {
    SampleRate = 0x10,
    Channels = 0x11,
    Depth = 0x12,
    Framed = 0x13,
    Downmix = 0x14,
    Bitrate = 0x15,
    StreamType = 0x16,
    CodecData = 0x17,
}

impl ParamId {
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Container framing of the compressed input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    #[default]
    Unknown,
    Adts,
    Adif,
    Raw,
}

impl StreamType {
    pub fn code(self) -> u32 {
        match self {
            StreamType::Unknown => 0,
            StreamType::Adts => 1,
            StreamType::Adif => 2,
            StreamType::Raw => 3,
        }
    }

    pub fn from_code(code: u32) -> Self {
        match code {
            1 => StreamType::Adts,
            2 => StreamType::Adif,
            3 => StreamType::Raw,
            _ => StreamType::Unknown,
        }
    }
}

/// A single typed parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    SampleRate(u32),
    Channels(u32),
    Depth(u32),
    Framed(bool),
    Downmix(bool),
    Bitrate(u32),
    StreamType(StreamType),
    CodecData(Vec<u8>),
}

impl Param {
    pub fn id(&self) -> ParamId {
        match self {
            Param::SampleRate(_) => ParamId::SampleRate,
            Param::Channels(_) => ParamId::Channels,
            Param::Depth(_) => ParamId::Depth,
            Param::Framed(_) => ParamId::Framed,
            Param::Downmix(_) => ParamId::Downmix,
            Param::Bitrate(_) => ParamId::Bitrate,
            Param::StreamType(_) => ParamId::StreamType,
            Param::CodecData(_) => ParamId::CodecData,
        }
    }

    /// Scalar wire value, or `None` for blob parameters.
    pub fn scalar(&self) -> Option<u32> {
        match self {
            Param::SampleRate(v) | Param::Channels(v) | Param::Depth(v) | Param::Bitrate(v) => {
                Some(*v)
            }
            Param::Framed(b) | Param::Downmix(b) => Some(u32::from(*b)),
            Param::StreamType(t) => Some(t.code()),
            Param::CodecData(_) => None,
        }
    }

    /// Rebuild a typed value from a scalar reply.
    pub fn from_scalar(id: ParamId, value: u32) -> Option<Self> {
        Some(match id {
            ParamId::SampleRate => Param::SampleRate(value),
            ParamId::Channels => Param::Channels(value),
            ParamId::Depth => Param::Depth(value),
            ParamId::Framed => Param::Framed(value != 0),
            ParamId::Downmix => Param::Downmix(value != 0),
            ParamId::Bitrate => Param::Bitrate(value),
            ParamId::StreamType => Param::StreamType(StreamType::from_code(value)),
            ParamId::CodecData => return None,
        })
    }
}
