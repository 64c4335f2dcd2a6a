//! Encoder configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Quality presets for VBR encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    /// Best quality (~245 kbps)
    Best = 0,
    /// High quality (~190 kbps)
    High = 2,
    /// Medium quality (~130 kbps)
    Medium = 5,
    /// Low quality (~100 kbps)
    Low = 7,
    /// Worst quality (~65 kbps)
    Worst = 9,
}

impl From<Quality> for i32 {
    fn from(quality: Quality) -> Self {
        quality as i32
    }
}

/// Encoder session configuration.
///
/// Only the input sample rate and the VBR quality are configurable; the
/// session always encodes two-channel stereo in LAME's default VBR mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Input sample rate in Hz.
    pub sample_rate: u32,
    /// VBR quality (0 = best, 9 = worst). Out-of-range values are rejected
    /// by the engine when the session is created.
    pub quality: i32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            quality: Quality::Medium.into(),
        }
    }
}

impl EncoderConfig {
    pub fn new(sample_rate: u32, quality: impl Into<i32>) -> Self {
        Self {
            sample_rate,
            quality: quality.into(),
        }
    }

    /// Sets the input sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Sets the VBR quality, either a raw value or a [`Quality`] preset.
    pub fn with_quality(mut self, quality: impl Into<i32>) -> Self {
        self.quality = quality.into();
        self
    }

    /// Checks what can be checked without the engine.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::InvalidConfig("sample_rate must be positive".to_string()));
        }
        if i32::try_from(self.sample_rate).is_err() {
            return Err(Error::InvalidConfig(format!(
                "sample_rate {} out of range",
                self.sample_rate
            )));
        }
        Ok(())
    }
}
