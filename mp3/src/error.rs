//! Error types for MP3 sessions.

use thiserror::Error;

/// Errors returned by encoder and decoder sessions.
#[derive(Debug, Error)]
pub enum Error {
    /// A parameter setter or `lame_init_params` reported a negative status.
    #[error("mp3: failed to initialize LAME ({stage} returned {status})")]
    Initialization { stage: &'static str, status: i32 },

    /// The engine did not hand out a session handle.
    #[error("mp3: {0} returned no handle")]
    HandleCreate(&'static str),

    /// A bounded encode/decode call reported a negative status mid-stream.
    #[error("mp3: {op} failed with status {status}")]
    CodecCall { op: &'static str, status: i32 },

    /// The arena could not provide a scratch region.
    #[error("mp3: out of scratch memory ({requested} bytes requested)")]
    OutOfMemory { requested: usize },

    /// Channel inputs of an encode call differ in length.
    #[error("mp3: channel length mismatch: left {left}, right {right}")]
    ChannelMismatch { left: usize, right: usize },

    /// Invalid encoder configuration.
    #[error("mp3: invalid config: {0}")]
    InvalidConfig(String),

    /// The engine reported a failure while tearing down a session handle.
    #[error("mp3: {op} failed with status {status}")]
    Teardown { op: &'static str, status: i32 },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
