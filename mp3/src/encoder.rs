//! MP3 encoder session over LAME.

use std::iter::FusedIterator;
use std::ops::Range;

use tracing::{debug, trace, warn};

use crate::config::EncoderConfig;
use crate::engine::{CodecEngine, LameHandle, Mode, VbrMode};
use crate::error::{Error, Result};
use crate::scratch::SessionScratch;
use crate::session::Session;
use crate::window::Windows;

/// Maximum frames per channel passed to LAME in one call.
pub const MAX_SAMPLES: usize = 65536;

/// Size in bytes of each PCM scratch region (`MAX_SAMPLES` `f32` samples).
pub const PCM_BUF_SIZE: usize = MAX_SAMPLES * 4;

/// Size in bytes of the compressed scratch region. LAME's worst case is
/// `1.25 * nsamples + 7200`.
pub const BUF_SIZE: usize = MAX_SAMPLES * 5 / 4 + 7200;

const CHANNELS: i32 = 2;

/// Streaming stereo MP3 encoder.
///
/// Owns one LAME handle and three scratch regions: the compressed output
/// buffer and one `f32` input buffer per channel. The regions are reused on
/// every window.
///
/// Call [`Encoder::flush`] once at the end of the stream, then
/// [`Encoder::close`]. Encoding after a flush is not supported. A session that
/// is dropped without `close` still releases its handle and scratch.
pub struct Encoder<E: CodecEngine> {
    session: Session<E, LameHandle, f32>,
    config: EncoderConfig,
}

impl<E: CodecEngine> Encoder<E> {
    /// Creates a stereo VBR encoder.
    ///
    /// Returns [`Error::Initialization`] if LAME rejects a parameter (for
    /// example a quality outside its VBR range) or fails `lame_init_params`.
    /// Nothing stays allocated on failure.
    pub fn new(mut engine: E, config: EncoderConfig) -> Result<Self> {
        config.validate()?;

        let handle = engine
            .lame_init()
            .ok_or(Error::HandleCreate("lame_init"))?;
        let session = Session::open(engine, handle, BUF_SIZE, PCM_BUF_SIZE / 4)?;

        // From here on a failure drops `encoder`, which releases the session.
        let mut encoder = Self { session, config };
        encoder.configure()?;

        debug!(
            "mp3: encoder {:?} ready: {} Hz, quality {}",
            handle, encoder.config.sample_rate, encoder.config.quality
        );
        Ok(encoder)
    }

    fn configure(&mut self) -> Result<()> {
        let Self { session, config } = self;
        let Session { engine, handle, .. } = session;
        let lame = *handle;

        // validate() guarantees the rate fits.
        let sample_rate = config.sample_rate as i32;

        check_init("lame_set_mode", engine.lame_set_mode(lame, Mode::Stereo))?;
        check_init("lame_set_num_channels", engine.lame_set_num_channels(lame, CHANNELS))?;
        check_init("lame_set_in_samplerate", engine.lame_set_in_samplerate(lame, sample_rate))?;
        check_init("lame_set_VBR", engine.lame_set_vbr(lame, VbrMode::DEFAULT))?;
        check_init(
            "lame_set_VBR_quality",
            engine.lame_set_vbr_quality(lame, config.quality as f32),
        )?;
        check_init("lame_init_params", engine.lame_init_params(lame))
    }

    /// Returns the configuration the session was created with.
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encodes planar stereo PCM.
    ///
    /// Both channels must have the same length. The returned stream encodes
    /// one window of at most [`MAX_SAMPLES`] frames per pull and yields the
    /// bytes LAME produced for it, which may be empty.
    pub fn encode<'a>(&'a mut self, left: &'a [f32], right: &'a [f32]) -> Result<EncodeStream<'a, E>> {
        if left.len() != right.len() {
            return Err(Error::ChannelMismatch {
                left: left.len(),
                right: right.len(),
            });
        }

        Ok(EncodeStream::new(
            &mut self.session,
            PcmInput::Planar { left, right },
            left.len(),
        ))
    }

    /// Encodes interleaved stereo PCM (`L R L R ...`).
    pub fn encode_interleaved<'a>(&'a mut self, pcm: &'a [f32]) -> Result<EncodeStream<'a, E>> {
        if pcm.len() % 2 != 0 {
            return Err(Error::ChannelMismatch {
                left: pcm.len() / 2 + 1,
                right: pcm.len() / 2,
            });
        }

        Ok(EncodeStream::new(
            &mut self.session,
            PcmInput::Interleaved(pcm),
            pcm.len() / 2,
        ))
    }

    /// Flushes the encoder's trailing frames.
    ///
    /// Call at most once, after the last encode stream has been consumed.
    pub fn flush(&mut self) -> Result<Vec<u8>> {
        let Session { engine, handle, scratch, .. } = &mut self.session;

        let status = engine.lame_encode_flush(*handle, scratch.stream.ptr(), capacity_i32(scratch.stream.capacity()));
        if status < 0 {
            warn!("mp3: lame_encode_flush returned {}", status);
            return Err(Error::CodecCall {
                op: "lame_encode_flush",
                status,
            });
        }

        trace!("mp3: flushed {} bytes", status);
        Ok(scratch.stream.load(engine, status as usize))
    }

    /// Closes the LAME handle and frees the scratch regions.
    pub fn close(mut self) -> Result<()> {
        self.session.release()
    }
}

fn check_init(stage: &'static str, status: i32) -> Result<()> {
    if status < 0 {
        warn!("mp3: {} returned {}", stage, status);
        return Err(Error::Initialization { stage, status });
    }
    Ok(())
}

fn capacity_i32(capacity: usize) -> i32 {
    i32::try_from(capacity).unwrap_or(i32::MAX)
}

/// Caller PCM being windowed.
enum PcmInput<'a> {
    Planar { left: &'a [f32], right: &'a [f32] },
    Interleaved(&'a [f32]),
}

impl PcmInput<'_> {
    /// Copies the frames in `window` into the per-channel scratch regions.
    fn store<E: CodecEngine>(&self, engine: &mut E, scratch: &SessionScratch<f32>, window: Range<usize>) {
        match self {
            Self::Planar { left, right } => {
                scratch.left.store(engine, &left[window.clone()]);
                scratch.right.store(engine, &right[window]);
            }
            Self::Interleaved(pcm) => {
                let frames = &pcm[window.start * 2..window.end * 2];
                scratch.left.store_iter(engine, frames.iter().step_by(2).copied());
                scratch.right.store_iter(engine, frames.iter().skip(1).step_by(2).copied());
            }
        }
    }
}

/// Lazy sequence of encoded chunks, one per input window.
///
/// Each item is the exact byte count LAME reported for its window. After an
/// error the stream ends; chunks already yielded stay valid.
pub struct EncodeStream<'a, E: CodecEngine> {
    session: &'a mut Session<E, LameHandle, f32>,
    input: PcmInput<'a>,
    windows: Windows,
    failed: bool,
}

impl<'a, E: CodecEngine> EncodeStream<'a, E> {
    fn new(session: &'a mut Session<E, LameHandle, f32>, input: PcmInput<'a>, frames: usize) -> Self {
        Self {
            session,
            input,
            windows: Windows::new(frames, MAX_SAMPLES),
            failed: false,
        }
    }

    /// Frames per channel consumed so far.
    pub fn frames_consumed(&self) -> usize {
        self.windows.position()
    }
}

impl<E: CodecEngine> Iterator for EncodeStream<'_, E> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let window = self.windows.next()?;
        let frames = window.len();

        let Session { engine, handle, scratch, .. } = &mut *self.session;
        self.input.store(engine, scratch, window);

        let status = engine.lame_encode_buffer_ieee_float(
            *handle,
            scratch.left.ptr(),
            scratch.right.ptr(),
            frames as i32,
            scratch.stream.ptr(),
            capacity_i32(scratch.stream.capacity()),
        );
        if status < 0 {
            warn!("mp3: lame_encode_buffer_ieee_float returned {}", status);
            self.failed = true;
            return Some(Err(Error::CodecCall {
                op: "lame_encode_buffer_ieee_float",
                status,
            }));
        }

        trace!("mp3: encoded {} frames into {} bytes", frames, status);
        Some(Ok(scratch.stream.load(engine, status as usize)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        (0, Some(self.windows.len()))
    }
}

impl<E: CodecEngine> FusedIterator for EncodeStream<'_, E> {}
