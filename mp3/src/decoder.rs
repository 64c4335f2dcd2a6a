//! MP3 decoder session over LAME's hip decoder.

use std::iter::FusedIterator;

use tracing::{debug, trace, warn};

use crate::engine::{CodecEngine, HipHandle};
use crate::error::{Error, Result};
use crate::session::Session;
use crate::window::Windows;

/// Size in bytes of the compressed input window.
pub const MPEG_UCHAR_SIZE: usize = 8192;

/// Capacity in samples of each PCM output region.
pub const PCM_SHORT_SIZE: usize = 8192 * 2;

/// One decoded frame: equal-length left and right channels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedPcm {
    pub left: Vec<i16>,
    pub right: Vec<i16>,
}

impl DecodedPcm {
    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Returns the samples interleaved as `L R L R ...`.
    pub fn interleaved(&self) -> Vec<i16> {
        self.left
            .iter()
            .zip(&self.right)
            .flat_map(|(&l, &r)| [l, r])
            .collect()
    }
}

/// Streaming MP3 decoder.
///
/// Owns one hip handle and three scratch regions: the compressed input
/// window and one `i16` output buffer per channel. Stream parameters are
/// detected by the codec, so construction takes none.
pub struct Decoder<E: CodecEngine> {
    session: Session<E, HipHandle, i16>,
}

impl<E: CodecEngine> Decoder<E> {
    /// Creates a decoder.
    pub fn new(mut engine: E) -> Result<Self> {
        let handle = engine
            .hip_decode_init()
            .ok_or(Error::HandleCreate("hip_decode_init"))?;
        let session = Session::open(engine, handle, MPEG_UCHAR_SIZE, PCM_SHORT_SIZE)?;

        debug!("mp3: decoder {:?} ready", handle);
        Ok(Self { session })
    }

    /// Decodes a chunk of an MP3 stream.
    ///
    /// `data` may start or end mid-frame; partial frames stay buffered in the
    /// codec and complete on the next call. The returned stream yields every
    /// frame the codec produces, in order.
    pub fn decode<'a>(&'a mut self, data: &'a [u8]) -> DecodeStream<'a, E> {
        DecodeStream {
            session: &mut self.session,
            data,
            windows: Windows::new(data.len(), MPEG_UCHAR_SIZE),
            drain: Drain::Idle,
            failed: false,
        }
    }

    /// Closes the hip handle and frees the scratch regions.
    pub fn close(mut self) -> Result<()> {
        self.session.release()
    }
}

/// Drain state of the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drain {
    /// No window loaded.
    Idle,
    /// A window of this many bytes is loaded but not yet passed to the codec.
    Fresh(usize),
    /// The codec holds the window; further calls pass length 0.
    Continue,
}

/// Lazy sequence of decoded frames.
///
/// Each pull runs `hip_decode1` until it yields a frame or the input is
/// exhausted. Per window the first call passes the window length and every
/// later call passes 0. A 0 result on the first call is retried once with 0;
/// a 0 result on a continuation call moves on to the next window.
pub struct DecodeStream<'a, E: CodecEngine> {
    session: &'a mut Session<E, HipHandle, i16>,
    data: &'a [u8],
    windows: Windows,
    drain: Drain,
    failed: bool,
}

impl<E: CodecEngine> DecodeStream<'_, E> {
    /// Input bytes handed to the codec so far.
    pub fn bytes_consumed(&self) -> usize {
        self.windows.position()
    }
}

impl<E: CodecEngine> Iterator for DecodeStream<'_, E> {
    type Item = Result<DecodedPcm>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let Session { engine, handle, scratch, .. } = &mut *self.session;

            let len = match self.drain {
                Drain::Idle => {
                    let window = self.windows.next()?;
                    scratch.stream.store(engine, &self.data[window.clone()]);
                    self.drain = Drain::Fresh(window.len());
                    continue;
                }
                Drain::Fresh(len) => len,
                Drain::Continue => 0,
            };

            let status = engine.hip_decode1(
                *handle,
                scratch.stream.ptr(),
                len,
                scratch.left.ptr(),
                scratch.right.ptr(),
            );
            trace!("mp3: hip_decode1({}) returned {}", len, status);

            if status < 0 {
                warn!("mp3: hip_decode1 returned {}", status);
                self.failed = true;
                return Some(Err(Error::CodecCall {
                    op: "hip_decode1",
                    status,
                }));
            }

            if status == 0 {
                self.drain = match self.drain {
                    Drain::Fresh(_) => Drain::Continue,
                    _ => Drain::Idle,
                };
                continue;
            }

            self.drain = Drain::Continue;
            let count = status as usize;
            return Some(Ok(DecodedPcm {
                left: scratch.left.load(engine, count),
                right: scratch.right.load(engine, count),
            }));
        }
    }
}

impl<E: CodecEngine> FusedIterator for DecodeStream<'_, E> {}
