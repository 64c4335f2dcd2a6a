//! FFI bindings for libmp3lame's encoder and hip decoder.

use std::os::raw::{c_float, c_int, c_short, c_uchar};

/// Opaque LAME global flags (`lame_global_flags`).
pub enum LameGlobalFlags {}

/// Opaque hip decoder state (`hip_global_flags`).
pub enum HipGlobalFlags {}

unsafe extern "C" {
    pub fn lame_init() -> *mut LameGlobalFlags;
    pub fn lame_close(gf: *mut LameGlobalFlags) -> c_int;

    pub fn lame_set_in_samplerate(gf: *mut LameGlobalFlags, rate: c_int) -> c_int;
    pub fn lame_set_num_channels(gf: *mut LameGlobalFlags, channels: c_int) -> c_int;
    pub fn lame_set_mode(gf: *mut LameGlobalFlags, mode: c_int) -> c_int;
    pub fn lame_set_VBR(gf: *mut LameGlobalFlags, vbr_mode: c_int) -> c_int;
    pub fn lame_set_VBR_quality(gf: *mut LameGlobalFlags, quality: c_float) -> c_int;

    pub fn lame_init_params(gf: *mut LameGlobalFlags) -> c_int;

    pub fn lame_encode_buffer_ieee_float(
        gf: *mut LameGlobalFlags,
        pcm_l: *const c_float,
        pcm_r: *const c_float,
        nsamples: c_int,
        mp3buf: *mut c_uchar,
        mp3buf_size: c_int,
    ) -> c_int;

    pub fn lame_encode_flush(
        gf: *mut LameGlobalFlags,
        mp3buf: *mut c_uchar,
        mp3buf_size: c_int,
    ) -> c_int;
}

unsafe extern "C" {
    pub fn hip_decode_init() -> *mut HipGlobalFlags;
    pub fn hip_decode_exit(gfp: *mut HipGlobalFlags) -> c_int;

    pub fn hip_decode1(
        gfp: *mut HipGlobalFlags,
        mp3buf: *const c_uchar,
        len: usize,
        pcm_l: *mut c_short,
        pcm_r: *mut c_short,
    ) -> c_int;
}
