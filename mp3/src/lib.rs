//! Streaming MP3 encode and decode sessions over LAME.
//!
//! A session owns one codec handle and a fixed set of scratch regions in the
//! engine's linear memory. Input of any length is staged through those
//! regions in bounded windows, and the compressed bytes (or decoded frames)
//! come back as a lazy iterator:
//!
//! - [`Encoder`]: stereo `f32` PCM in, MP3 chunks out, VBR at a configurable
//!   quality.
//! - [`Decoder`]: MP3 bytes in, one [`DecodedPcm`] pair of `i16` channels per
//!   decoded frame out.
//!
//! The codec itself sits behind [`CodecEngine`]. With the `lame` feature the
//! crate provides `NativeEngine`, which links the system libmp3lame.
//!
//! # Example
//!
//! ```ignore
//! use lamestream_mp3::{Decoder, Encoder, EncoderConfig, NativeEngine, Quality};
//!
//! let config = EncoderConfig::new(44100, Quality::High);
//! let mut encoder = Encoder::new(NativeEngine::new(), config)?;
//!
//! let mut mp3 = Vec::new();
//! for chunk in encoder.encode(&left, &right)? {
//!     mp3.extend(chunk?);
//! }
//! mp3.extend(encoder.flush()?);
//! encoder.close()?;
//!
//! let mut decoder = Decoder::new(NativeEngine::new())?;
//! for frame in decoder.decode(&mp3) {
//!     let frame = frame?;
//!     play(&frame.interleaved());
//! }
//! decoder.close()?;
//! ```

pub mod arena;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod scratch;
pub mod window;

mod session;

#[cfg(feature = "lame")]
mod ffi;
#[cfg(feature = "lame")]
mod native;

#[cfg(test)]
mod mock;

pub use arena::{Arena, LinearMemory, Ptr};
pub use config::{EncoderConfig, Quality};
pub use decoder::{DecodeStream, DecodedPcm, Decoder};
pub use encoder::{EncodeStream, Encoder};
pub use engine::{CodecEngine, HipHandle, LameHandle, Mode, VbrMode};
pub use error::{Error, Result};

#[cfg(feature = "lame")]
pub use native::NativeEngine;
