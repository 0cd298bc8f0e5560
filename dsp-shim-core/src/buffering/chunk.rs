//! Decoded PCM handed back from a single decode call.

/// PCM bytes produced by one component invocation.
///
/// Borrows the session's output scratch; copy it out before the next decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFrame<'a> {
    /// Interleaved PCM in the component's output format.
    pub pcm: &'a [u8],
    /// Frames produced by this call (0 or 1 for a frame-at-a-time core).
    pub frames: u32,
    /// Input bytes the component reported consuming.
    pub consumed: usize,
}

impl<'a> DecodedFrame<'a> {
    pub fn new(pcm: &'a [u8], frames: u32, consumed: usize) -> Self {
        Self {
            pcm,
            frames,
            consumed,
        }
    }

    /// Returns true if the call produced no PCM.
    pub fn is_empty(&self) -> bool {
        self.pcm.is_empty()
    }

    /// Number of samples per channel, given the output layout.
    ///
    /// Returns 0 for a degenerate layout (no channels or a sub-byte depth).
    pub fn samples_per_channel(&self, channels: u32, depth: u32) -> usize {
        let frame_bytes = channels as usize * (depth as usize / 8);
        if frame_bytes == 0 {
            return 0;
        }
        self.pcm.len() / frame_bytes
    }

    /// Duration of this PCM block in seconds.
    pub fn duration_secs(&self, sample_rate: u32, channels: u32, depth: u32) -> f64 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.samples_per_channel(channels, depth) as f64 / sample_rate as f64
    }
}
