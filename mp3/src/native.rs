//! [`CodecEngine`] backed by the system libmp3lame.

use std::os::raw::{c_float, c_short, c_uchar};

use tracing::warn;

use crate::arena::{Arena, LinearMemory, Ptr};
use crate::engine::{CodecEngine, HipHandle, LameHandle, Mode, VbrMode};
use crate::ffi;

/// Upper bound of samples per channel `hip_decode1` writes in one call.
const HIP_MAX_FRAME: usize = 1152;

/// libmp3lame engine with its own linear scratch memory.
///
/// Every pointer argument is range-checked against the live allocations
/// before it reaches C; a bad range is reported as status -1 instead of
/// letting the codec write out of bounds.
#[derive(Debug, Default)]
pub struct NativeEngine {
    memory: LinearMemory,
}

impl NativeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scratch memory bounded by `limit` bytes.
    pub fn with_memory_limit(limit: usize) -> Self {
        Self {
            memory: LinearMemory::with_limit(limit),
        }
    }

    /// Number of scratch regions not yet freed.
    pub fn outstanding_allocations(&self) -> usize {
        self.memory.outstanding()
    }

    fn region(&mut self, ptr: Ptr, len: usize) -> Option<*mut u8> {
        if !self.memory.contains(ptr, len) {
            warn!("mp3: region {:?}+{} outside scratch memory", ptr, len);
            return None;
        }
        // SAFETY: the range was just checked against a live allocation.
        Some(unsafe { self.memory.as_mut_ptr().add(ptr.offset()) })
    }
}

fn lame(handle: LameHandle) -> *mut ffi::LameGlobalFlags {
    handle.raw() as *mut ffi::LameGlobalFlags
}

fn hip(handle: HipHandle) -> *mut ffi::HipGlobalFlags {
    handle.raw() as *mut ffi::HipGlobalFlags
}

impl Arena for NativeEngine {
    fn malloc(&mut self, size: usize) -> Option<Ptr> {
        self.memory.malloc(size)
    }

    fn free(&mut self, ptr: Ptr) {
        self.memory.free(ptr)
    }

    fn bytes(&self, ptr: Ptr, len: usize) -> &[u8] {
        self.memory.bytes(ptr, len)
    }

    fn bytes_mut(&mut self, ptr: Ptr, len: usize) -> &mut [u8] {
        self.memory.bytes_mut(ptr, len)
    }
}

impl CodecEngine for NativeEngine {
    fn lame_init(&mut self) -> Option<LameHandle> {
        let gf = unsafe { ffi::lame_init() };
        if gf.is_null() {
            return None;
        }
        Some(LameHandle::from_raw(gf as usize))
    }

    fn lame_set_mode(&mut self, handle: LameHandle, mode: Mode) -> i32 {
        unsafe { ffi::lame_set_mode(lame(handle), mode as i32) }
    }

    fn lame_set_num_channels(&mut self, handle: LameHandle, channels: i32) -> i32 {
        unsafe { ffi::lame_set_num_channels(lame(handle), channels) }
    }

    fn lame_set_in_samplerate(&mut self, handle: LameHandle, sample_rate: i32) -> i32 {
        unsafe { ffi::lame_set_in_samplerate(lame(handle), sample_rate) }
    }

    fn lame_set_vbr(&mut self, handle: LameHandle, mode: VbrMode) -> i32 {
        unsafe { ffi::lame_set_VBR(lame(handle), mode as i32) }
    }

    fn lame_set_vbr_quality(&mut self, handle: LameHandle, quality: f32) -> i32 {
        unsafe { ffi::lame_set_VBR_quality(lame(handle), quality) }
    }

    fn lame_init_params(&mut self, handle: LameHandle) -> i32 {
        unsafe { ffi::lame_init_params(lame(handle)) }
    }

    fn lame_encode_buffer_ieee_float(
        &mut self,
        handle: LameHandle,
        pcm_l: Ptr,
        pcm_r: Ptr,
        nsamples: i32,
        mp3buf: Ptr,
        mp3buf_size: i32,
    ) -> i32 {
        let pcm_bytes = nsamples.max(0) as usize * std::mem::size_of::<c_float>();
        let (Some(l), Some(r), Some(out)) = (
            self.region(pcm_l, pcm_bytes),
            self.region(pcm_r, pcm_bytes),
            self.region(mp3buf, mp3buf_size.max(0) as usize),
        ) else {
            return -1;
        };
        unsafe {
            ffi::lame_encode_buffer_ieee_float(
                lame(handle),
                l.cast::<c_float>(),
                r.cast::<c_float>(),
                nsamples,
                out.cast::<c_uchar>(),
                mp3buf_size,
            )
        }
    }

    fn lame_encode_flush(&mut self, handle: LameHandle, mp3buf: Ptr, mp3buf_size: i32) -> i32 {
        let Some(out) = self.region(mp3buf, mp3buf_size.max(0) as usize) else {
            return -1;
        };
        unsafe { ffi::lame_encode_flush(lame(handle), out.cast::<c_uchar>(), mp3buf_size) }
    }

    fn lame_close(&mut self, handle: LameHandle) -> i32 {
        unsafe { ffi::lame_close(lame(handle)) }
    }

    fn hip_decode_init(&mut self) -> Option<HipHandle> {
        let gfp = unsafe { ffi::hip_decode_init() };
        if gfp.is_null() {
            return None;
        }
        Some(HipHandle::from_raw(gfp as usize))
    }

    fn hip_decode1(&mut self, handle: HipHandle, mp3buf: Ptr, len: usize, pcm_l: Ptr, pcm_r: Ptr) -> i32 {
        let pcm_bytes = HIP_MAX_FRAME * std::mem::size_of::<c_short>();
        let (Some(input), Some(l), Some(r)) = (
            self.region(mp3buf, len),
            self.region(pcm_l, pcm_bytes),
            self.region(pcm_r, pcm_bytes),
        ) else {
            return -1;
        };
        unsafe {
            ffi::hip_decode1(
                hip(handle),
                input.cast::<c_uchar>(),
                len,
                l.cast::<c_short>(),
                r.cast::<c_short>(),
            )
        }
    }

    fn hip_decode_exit(&mut self, handle: HipHandle) -> i32 {
        unsafe { ffi::hip_decode_exit(hip(handle)) }
    }
}
