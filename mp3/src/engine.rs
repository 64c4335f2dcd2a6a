//! Capability interface of the native codec engine.
//!
//! [`CodecEngine`] mirrors the subset of LAME's C API the sessions use: one
//! handle-based encoder (`lame_*`) and one handle-based decoder (`hip_*`).
//! Every buffer argument is a [`Ptr`] into the engine's own [`Arena`], and
//! every status is returned as the raw C integer so the sessions decide what
//! a negative value means.

use crate::arena::{Arena, Ptr};

/// Opaque LAME encoder handle (`lame_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LameHandle(usize);

impl LameHandle {
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> usize {
        self.0
    }
}

/// Opaque hip decoder handle (`hip_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HipHandle(usize);

impl HipHandle {
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> usize {
        self.0
    }
}

/// LAME channel mode (`MPEG_mode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Mode {
    Stereo = 0,
    JointStereo = 1,
    DualChannel = 2,
    Mono = 3,
    NotSet = 4,
}

/// LAME VBR mode (`vbr_mode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum VbrMode {
    Off = 0,
    Mt = 1,
    Rh = 2,
    Abr = 3,
    Mtrh = 4,
}

impl VbrMode {
    /// LAME's `vbr_default`.
    pub const DEFAULT: VbrMode = VbrMode::Mtrh;
}

/// Native MP3 codec engine.
///
/// Implementations own the linear memory that [`Ptr`] arguments point into.
/// Calls are synchronous and bounded by the capacities passed in; none of
/// them may retain a pointer past the call.
pub trait CodecEngine: Arena {
    /// `lame_init`: creates an encoder handle.
    fn lame_init(&mut self) -> Option<LameHandle>;

    fn lame_set_mode(&mut self, lame: LameHandle, mode: Mode) -> i32;

    fn lame_set_num_channels(&mut self, lame: LameHandle, channels: i32) -> i32;

    fn lame_set_in_samplerate(&mut self, lame: LameHandle, sample_rate: i32) -> i32;

    fn lame_set_vbr(&mut self, lame: LameHandle, mode: VbrMode) -> i32;

    fn lame_set_vbr_quality(&mut self, lame: LameHandle, quality: f32) -> i32;

    /// `lame_init_params`: commits the parameters; negative on failure.
    fn lame_init_params(&mut self, lame: LameHandle) -> i32;

    /// Encodes `nsamples` frames of planar `f32` PCM from `pcm_l`/`pcm_r` into
    /// at most `mp3buf_size` bytes at `mp3buf`. Returns the number of bytes
    /// written, or a negative status.
    fn lame_encode_buffer_ieee_float(
        &mut self,
        lame: LameHandle,
        pcm_l: Ptr,
        pcm_r: Ptr,
        nsamples: i32,
        mp3buf: Ptr,
        mp3buf_size: i32,
    ) -> i32;

    /// Emits the encoder's trailing frames. Returns bytes written or a
    /// negative status.
    fn lame_encode_flush(&mut self, lame: LameHandle, mp3buf: Ptr, mp3buf_size: i32) -> i32;

    fn lame_close(&mut self, lame: LameHandle) -> i32;

    /// `hip_decode_init`: creates a decoder handle.
    fn hip_decode_init(&mut self) -> Option<HipHandle>;

    /// Feeds `len` bytes at `mp3buf` (0 to continue with buffered input) and
    /// decodes at most one frame into `pcm_l`/`pcm_r`. Returns the number of
    /// samples per channel, 0 when no frame is ready, or a negative status.
    fn hip_decode1(&mut self, hip: HipHandle, mp3buf: Ptr, len: usize, pcm_l: Ptr, pcm_r: Ptr) -> i32;

    fn hip_decode_exit(&mut self, hip: HipHandle) -> i32;
}

impl<E: CodecEngine + ?Sized> CodecEngine for &mut E {
    fn lame_init(&mut self) -> Option<LameHandle> {
        (**self).lame_init()
    }

    fn lame_set_mode(&mut self, lame: LameHandle, mode: Mode) -> i32 {
        (**self).lame_set_mode(lame, mode)
    }

    fn lame_set_num_channels(&mut self, lame: LameHandle, channels: i32) -> i32 {
        (**self).lame_set_num_channels(lame, channels)
    }

    fn lame_set_in_samplerate(&mut self, lame: LameHandle, sample_rate: i32) -> i32 {
        (**self).lame_set_in_samplerate(lame, sample_rate)
    }

    fn lame_set_vbr(&mut self, lame: LameHandle, mode: VbrMode) -> i32 {
        (**self).lame_set_vbr(lame, mode)
    }

    fn lame_set_vbr_quality(&mut self, lame: LameHandle, quality: f32) -> i32 {
        (**self).lame_set_vbr_quality(lame, quality)
    }

    fn lame_init_params(&mut self, lame: LameHandle) -> i32 {
        (**self).lame_init_params(lame)
    }

    fn lame_encode_buffer_ieee_float(
        &mut self,
        lame: LameHandle,
        pcm_l: Ptr,
        pcm_r: Ptr,
        nsamples: i32,
        mp3buf: Ptr,
        mp3buf_size: i32,
    ) -> i32 {
        (**self).lame_encode_buffer_ieee_float(lame, pcm_l, pcm_r, nsamples, mp3buf, mp3buf_size)
    }

    fn lame_encode_flush(&mut self, lame: LameHandle, mp3buf: Ptr, mp3buf_size: i32) -> i32 {
        (**self).lame_encode_flush(lame, mp3buf, mp3buf_size)
    }

    fn lame_close(&mut self, lame: LameHandle) -> i32 {
        (**self).lame_close(lame)
    }

    fn hip_decode_init(&mut self) -> Option<HipHandle> {
        (**self).hip_decode_init()
    }

    fn hip_decode1(&mut self, hip: HipHandle, mp3buf: Ptr, len: usize, pcm_l: Ptr, pcm_r: Ptr) -> i32 {
        (**self).hip_decode1(hip, mp3buf, len, pcm_l, pcm_r)
    }

    fn hip_decode_exit(&mut self, hip: HipHandle) -> i32 {
        (**self).hip_decode_exit(hip)
    }
}

/// Handle types a session can own and tear down.
pub(crate) trait SessionHandle: Copy + std::fmt::Debug {
    /// Name of the teardown call, for logs and errors.
    const TEARDOWN: &'static str;

    fn teardown<E: CodecEngine + ?Sized>(self, engine: &mut E) -> i32;
}

impl SessionHandle for LameHandle {
    const TEARDOWN: &'static str = "lame_close";

    fn teardown<E: CodecEngine + ?Sized>(self, engine: &mut E) -> i32 {
        engine.lame_close(self)
    }
}

impl SessionHandle for HipHandle {
    const TEARDOWN: &'static str = "hip_decode_exit";

    fn teardown<E: CodecEngine + ?Sized>(self, engine: &mut E) -> i32 {
        engine.hip_decode_exit(self)
    }
}
