//! In-memory codec engine for tests.
//!
//! Tracks allocations and open handles, lets tests script the statuses of
//! the bounded calls, and otherwise runs a toy frame codec: the encoder
//! emits one fixed-size frame per 1152 buffered frames, the decoder buffers
//! input across calls and returns at most one frame per `hip_decode1` call,
//! like LAME's hip decoder.

use std::collections::{HashMap, VecDeque};

use crate::arena::{Arena, LinearMemory, Ptr};
use crate::engine::{CodecEngine, HipHandle, LameHandle, Mode, VbrMode};
use crate::scratch::Sample;

pub(crate) const TOY_FRAME_SAMPLES: usize = 1152;
const TOY_STRIDE: usize = 6;
const TOY_KEPT: usize = TOY_FRAME_SAMPLES / TOY_STRIDE;
const TOY_SYNC: [u8; 2] = [0xFF, 0xFB];
pub(crate) const TOY_FRAME_BYTES: usize = TOY_SYNC.len() + 2 * TOY_KEPT;

/// Parameters recorded for the most recent encoder handle.
#[derive(Debug, Clone, Default)]
pub(crate) struct EncoderParams {
    pub mode: Option<Mode>,
    pub channels: i32,
    pub sample_rate: i32,
    pub vbr: Option<VbrMode>,
    pub quality: f32,
    pub initialized: bool,
}

#[derive(Default)]
struct ToyEncoder {
    params: EncoderParams,
    pending_left: Vec<f32>,
    pending_right: Vec<f32>,
}

impl ToyEncoder {
    fn take_frames(&mut self, pad: bool) -> Vec<u8> {
        if pad && !self.pending_left.is_empty() {
            let target = self.pending_left.len().next_multiple_of(TOY_FRAME_SAMPLES);
            self.pending_left.resize(target, 0.0);
            self.pending_right.resize(target, 0.0);
        }

        let mut out = Vec::new();
        while self.pending_left.len() >= TOY_FRAME_SAMPLES {
            out.extend_from_slice(&TOY_SYNC);
            for channel in [&mut self.pending_left, &mut self.pending_right] {
                let frame: Vec<f32> = channel.drain(..TOY_FRAME_SAMPLES).collect();
                out.extend(frame.iter().step_by(TOY_STRIDE).map(|&s| quantize(s)));
            }
        }
        out
    }
}

#[derive(Default)]
struct ToyDecoder {
    buffered: Vec<u8>,
}

impl ToyDecoder {
    fn next_frame(&mut self) -> Option<(Vec<i16>, Vec<i16>)> {
        match self.buffered.windows(2).position(|w| w == TOY_SYNC) {
            Some(pos) => {
                self.buffered.drain(..pos);
            }
            None => {
                let keep = usize::from(self.buffered.last() == Some(&TOY_SYNC[0]));
                let cut = self.buffered.len() - keep;
                self.buffered.drain(..cut);
                return None;
            }
        }
        if self.buffered.len() < TOY_FRAME_BYTES {
            return None;
        }

        let frame: Vec<u8> = self.buffered.drain(..TOY_FRAME_BYTES).collect();
        let (left, right) = frame[TOY_SYNC.len()..].split_at(TOY_KEPT);
        Some((expand(left), expand(right)))
    }
}

fn quantize(sample: f32) -> u8 {
    (sample.clamp(-1.0, 1.0) * 127.0).round() as i8 as u8
}

fn expand(quantized: &[u8]) -> Vec<i16> {
    quantized
        .iter()
        .flat_map(|&q| std::iter::repeat_n(i16::from(q as i8) * 256, TOY_STRIDE))
        .collect()
}

/// Encodes planar PCM with the toy codec, flushing the tail.
pub(crate) fn toy_encode(left: &[f32], right: &[f32]) -> Vec<u8> {
    let mut encoder = ToyEncoder::default();
    encoder.pending_left.extend_from_slice(left);
    encoder.pending_right.extend_from_slice(right);
    encoder.take_frames(true)
}

fn read_samples<T: Sample>(memory: &LinearMemory, ptr: Ptr, count: usize) -> Vec<T> {
    memory
        .bytes(ptr, count * T::SIZE)
        .chunks_exact(T::SIZE)
        .map(T::read_ne)
        .collect()
}

fn write_samples<T: Sample>(memory: &mut LinearMemory, ptr: Ptr, samples: &[T]) {
    let dst = memory.bytes_mut(ptr, samples.len() * T::SIZE);
    for (chunk, &sample) in dst.chunks_exact_mut(T::SIZE).zip(samples) {
        sample.write_ne(chunk);
    }
}

/// Scripted engine over a [`LinearMemory`].
#[derive(Default)]
pub(crate) struct MockEngine {
    memory: LinearMemory,
    next_handle: usize,
    handles_created: usize,
    encoders: HashMap<usize, ToyEncoder>,
    decoders: HashMap<usize, ToyDecoder>,
    last_params: Option<EncoderParams>,

    encode_script: VecDeque<i32>,
    decode_script: VecDeque<i32>,
    alloc_budget: Option<usize>,
    fail_init_params: bool,
    fail_flush: bool,
    fail_teardown: bool,
    refuse_handles: bool,

    allocation_sizes: Vec<usize>,
    encode_calls: Vec<usize>,
    decode_calls: Vec<usize>,
    last_pcm: (Vec<f32>, Vec<f32>),
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statuses returned by the next encode calls, in order. Positive values
    /// produce that many filler bytes.
    pub fn script_encode(&mut self, statuses: impl IntoIterator<Item = i32>) {
        self.encode_script.extend(statuses);
    }

    /// Statuses returned by the next `hip_decode1` calls, in order. Positive
    /// values produce that many samples per channel.
    pub fn script_decode(&mut self, statuses: impl IntoIterator<Item = i32>) {
        self.decode_script.extend(statuses);
    }

    /// Lets `count` more allocations succeed, then refuses the rest.
    pub fn fail_alloc_after(&mut self, count: usize) {
        self.alloc_budget = Some(count);
    }

    pub fn fail_init_params(&mut self) {
        self.fail_init_params = true;
    }

    pub fn fail_flush(&mut self) {
        self.fail_flush = true;
    }

    pub fn fail_teardown(&mut self) {
        self.fail_teardown = true;
    }

    pub fn refuse_handles(&mut self) {
        self.refuse_handles = true;
    }

    pub fn outstanding_allocations(&self) -> usize {
        self.memory.outstanding()
    }

    pub fn open_handles(&self) -> usize {
        self.encoders.len() + self.decoders.len()
    }

    pub fn handles_created(&self) -> usize {
        self.handles_created
    }

    /// Requested sizes of every allocation so far, in bytes.
    pub fn allocation_sizes(&self) -> Vec<usize> {
        self.allocation_sizes.clone()
    }

    /// `nsamples` of every encode call.
    pub fn encode_calls(&self) -> Vec<usize> {
        self.encode_calls.clone()
    }

    /// `len` of every `hip_decode1` call.
    pub fn decode_calls(&self) -> Vec<usize> {
        self.decode_calls.clone()
    }

    pub fn last_encoder_params(&self) -> Option<EncoderParams> {
        self.last_params.clone()
    }

    /// PCM seen by the most recent encode call.
    pub fn last_encoded_pcm(&self) -> (Vec<f32>, Vec<f32>) {
        self.last_pcm.clone()
    }

    fn new_handle(&mut self) -> Option<usize> {
        if self.refuse_handles {
            return None;
        }
        self.next_handle += 1;
        self.handles_created += 1;
        Some(self.next_handle)
    }

    fn set_param(&mut self, lame: LameHandle, update: impl FnOnce(&mut EncoderParams) -> i32) -> i32 {
        let Some(encoder) = self.encoders.get_mut(&lame.raw()) else {
            return -1;
        };
        let status = update(&mut encoder.params);
        self.last_params = Some(encoder.params.clone());
        status
    }

    fn write_output(&mut self, bytes: &[u8], mp3buf: Ptr, mp3buf_size: i32) -> i32 {
        if bytes.len() > mp3buf_size.max(0) as usize {
            return -1;
        }
        self.memory.bytes_mut(mp3buf, bytes.len()).copy_from_slice(bytes);
        bytes.len() as i32
    }
}

impl Arena for MockEngine {
    fn malloc(&mut self, size: usize) -> Option<Ptr> {
        if let Some(budget) = self.alloc_budget {
            if budget == 0 {
                return None;
            }
            self.alloc_budget = Some(budget - 1);
        }
        self.allocation_sizes.push(size);
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

impl CodecEngine for MockEngine {
    fn lame_init(&mut self) -> Option<LameHandle> {
        let id = self.new_handle()?;
        self.encoders.insert(id, ToyEncoder::default());
        self.last_params = Some(EncoderParams::default());
        Some(LameHandle::from_raw(id))
    }

    fn lame_set_mode(&mut self, lame: LameHandle, mode: Mode) -> i32 {
        self.set_param(lame, |p| {
            p.mode = Some(mode);
            0
        })
    }

    fn lame_set_num_channels(&mut self, lame: LameHandle, channels: i32) -> i32 {
        self.set_param(lame, |p| {
            p.channels = channels;
            0
        })
    }

    fn lame_set_in_samplerate(&mut self, lame: LameHandle, sample_rate: i32) -> i32 {
        self.set_param(lame, |p| {
            p.sample_rate = sample_rate;
            0
        })
    }

    fn lame_set_vbr(&mut self, lame: LameHandle, mode: VbrMode) -> i32 {
        self.set_param(lame, |p| {
            p.vbr = Some(mode);
            0
        })
    }

    fn lame_set_vbr_quality(&mut self, lame: LameHandle, quality: f32) -> i32 {
        // LAME clamps out-of-range qualities and reports -1.
        self.set_param(lame, |p| {
            p.quality = quality.clamp(0.0, 9.999);
            if (0.0..10.0).contains(&quality) { 0 } else { -1 }
        })
    }

    fn lame_init_params(&mut self, lame: LameHandle) -> i32 {
        let fail = self.fail_init_params;
        self.set_param(lame, |p| {
            if fail || p.sample_rate <= 0 || !(1..=2).contains(&p.channels) {
                return -1;
            }
            p.initialized = true;
            0
        })
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
        let count = nsamples.max(0) as usize;
        self.encode_calls.push(count);
        let left: Vec<f32> = read_samples(&self.memory, pcm_l, count);
        let right: Vec<f32> = read_samples(&self.memory, pcm_r, count);
        self.last_pcm = (left.clone(), right.clone());

        if let Some(status) = self.encode_script.pop_front() {
            if status > 0 {
                let filler = vec![0xAB; status as usize];
                return self.write_output(&filler, mp3buf, mp3buf_size);
            }
            return status;
        }

        let Some(encoder) = self.encoders.get_mut(&lame.raw()) else {
            return -1;
        };
        if !encoder.params.initialized {
            return -1;
        }
        encoder.pending_left.extend(left);
        encoder.pending_right.extend(right);
        let bytes = encoder.take_frames(false);
        self.write_output(&bytes, mp3buf, mp3buf_size)
    }

    fn lame_encode_flush(&mut self, lame: LameHandle, mp3buf: Ptr, mp3buf_size: i32) -> i32 {
        if self.fail_flush {
            return -1;
        }
        let Some(encoder) = self.encoders.get_mut(&lame.raw()) else {
            return -1;
        };
        let bytes = encoder.take_frames(true);
        self.write_output(&bytes, mp3buf, mp3buf_size)
    }

    fn lame_close(&mut self, lame: LameHandle) -> i32 {
        let closed = self.encoders.remove(&lame.raw()).is_some();
        if !closed || self.fail_teardown { -1 } else { 0 }
    }

    fn hip_decode_init(&mut self) -> Option<HipHandle> {
        let id = self.new_handle()?;
        self.decoders.insert(id, ToyDecoder::default());
        Some(HipHandle::from_raw(id))
    }

    fn hip_decode1(&mut self, hip: HipHandle, mp3buf: Ptr, len: usize, pcm_l: Ptr, pcm_r: Ptr) -> i32 {
        self.decode_calls.push(len);

        if let Some(status) = self.decode_script.pop_front() {
            if status > 0 {
                let count = status as usize;
                write_samples(&mut self.memory, pcm_l, &vec![7i16; count]);
                write_samples(&mut self.memory, pcm_r, &vec![-7i16; count]);
            }
            return status;
        }

        let Some(decoder) = self.decoders.get_mut(&hip.raw()) else {
            return -1;
        };
        decoder.buffered.extend_from_slice(self.memory.bytes(mp3buf, len));
        match decoder.next_frame() {
            Some((left, right)) => {
                write_samples(&mut self.memory, pcm_l, &left);
                write_samples(&mut self.memory, pcm_r, &right);
                left.len() as i32
            }
            None => 0,
        }
    }

    fn hip_decode_exit(&mut self, hip: HipHandle) -> i32 {
        let closed = self.decoders.remove(&hip.raw()).is_some();
        if !closed || self.fail_teardown { -1 } else { 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toy_codec_frames() {
        let pcm = vec![0.5f32; TOY_FRAME_SAMPLES * 2 + 10];
        let encoded = toy_encode(&pcm, &pcm);
        assert_eq!(encoded.len(), 3 * TOY_FRAME_BYTES);

        let mut decoder = ToyDecoder::default();
        decoder.buffered = encoded;
        let mut frames = 0;
        while let Some((left, right)) = decoder.next_frame() {
            assert_eq!(left.len(), TOY_FRAME_SAMPLES);
            assert_eq!(right.len(), TOY_FRAME_SAMPLES);
            assert_eq!(left[0], 64 * 256);
            frames += 1;
        }
        assert_eq!(frames, 3);
    }

    #[test]
    fn test_toy_decoder_resyncs() {
        let pcm = vec![0.0f32; TOY_FRAME_SAMPLES];
        let mut decoder = ToyDecoder::default();
        decoder.buffered = vec![1, 2, 3];
        decoder.buffered.extend(toy_encode(&pcm, &pcm));

        assert!(decoder.next_frame().is_some());
        assert!(decoder.buffered.is_empty());
    }
}
