//! Built-in component table.
//!
//! Identifiers are an external contract: callers select components by these
//! exact strings. Order matters for prefix lookups, append new entries at
//! the end.

use super::ComponentDescriptor;
use crate::component::dispatch::{pcm_codec, renderer, unia_codec};
use crate::component::{audio_codec_factory, renderer_factory, ComponentType as T};

pub static BUILTIN_COMPONENTS: [ComponentDescriptor; 21] = [
    codec("audio-decoder/mp3", T::Mp3Dec),
    codec("audio-decoder/aac", T::AacDec),
    codec("audio-decoder/bsac", T::BsacDec),
    codec("audio-decoder/dabplus", T::DabPlusDec),
    codec("audio-decoder/mp2", T::Mp2Dec),
    codec("audio-decoder/drm", T::DrmDec),
    codec("audio-decoder/sbc", T::SbcDec),
    codec("audio-encoder/sbc", T::SbcEnc),
    codec("audio-decoder/opus", T::OpusDec),
    codec("audio-decoder/ogg", T::OggDec),
    codec("audio-decoder/mp3ext", T::Mp3ExtDec),
    codec("audio-decoder/aacext", T::AacExtDec),
    codec("audio-decoder/nxpaacplus", T::AacPlusDec),
    codec("audio-decoder/ac3", T::Ac3Dec),
    codec("audio-decoder/ddp", T::DdpDec),
    codec("audio-decoder/nbamr", T::NbAmrDec),
    codec("audio-decoder/wbamr", T::WbAmrDec),
    codec("audio-decoder/wma", T::WmaDec),
    ComponentDescriptor::new("audio-decoder/pcm", T::PcmDec, audio_codec_factory, pcm_codec),
    sink("renderer/esai", T::EsaiRenderer),
    sink("renderer/sai", T::SaiRenderer),
];

const fn codec(identifier: &'static str, kind: T) -> ComponentDescriptor {
    ComponentDescriptor::new(identifier, kind, audio_codec_factory, unia_codec)
}

const fn sink(identifier: &'static str, kind: T) -> ComponentDescriptor {
    ComponentDescriptor::new(identifier, kind, renderer_factory, renderer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_unique() {
        let mut ids: Vec<&str> = BUILTIN_COMPONENTS.iter().map(|d| d.identifier).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), BUILTIN_COMPONENTS.len());
    }

    #[test]
    fn renderers_use_renderer_dispatch() {
        for d in BUILTIN_COMPONENTS.iter().filter(|d| d.identifier.starts_with("renderer/")) {
            assert_eq!(d.kind.class(), crate::component::ComponentClass::Renderer);
        }
    }
}
