//! Raw audio format descriptors.
//!
//! Providers describe the raw samples they return with a short descriptor
//! string. Two shapes are accepted:
//!
//! - key/value form: `pcm;rate=24000;bits=16;channels=1`
//! - MIME form: `audio/L16;codec=pcm;rate=24000`
//!
//! Fields that are missing fall back to 16-bit mono 24 kHz, which is what the
//! Gemini audio models emit.

use std::fmt;

use thiserror::Error;

/// Default sample rate for provider PCM output.
pub const DEFAULT_SAMPLE_RATE: u32 = 24000;
/// Default bit depth for provider PCM output.
pub const DEFAULT_BITS_PER_SAMPLE: u16 = 16;
/// Default channel count for provider PCM output.
pub const DEFAULT_CHANNELS: u16 = 1;

/// Errors raised when a format descriptor cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("Invalid value for '{field}' in format descriptor: {value}")]
    InvalidField { field: &'static str, value: String },

    #[error("Non-positive value for '{field}' in format descriptor")]
    NonPositive { field: &'static str },

    #[error("Bit depth must be a multiple of 8, got {0}")]
    UnalignedBitDepth(u16),

    #[error("Unsupported audio encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    #[error("Payload of {0} bytes does not fit a WAV container")]
    PayloadTooLarge(usize),
}

/// Parsed PCM layout used to build a container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
}

impl Default for FormatSpec {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            bits_per_sample: DEFAULT_BITS_PER_SAMPLE,
            channels: DEFAULT_CHANNELS,
        }
    }
}

impl FormatSpec {
    /// Parse an optional descriptor. `None` or an empty string yields the defaults.
    pub fn parse(descriptor: Option<&str>) -> Result<Self, FormatError> {
        let mut spec = Self::default();
        let Some(descriptor) = descriptor.map(str::trim).filter(|d| !d.is_empty()) else {
            return Ok(spec);
        };

        for token in descriptor.split(';').map(str::trim).filter(|t| !t.is_empty()) {
            match token.split_once('=') {
                None => check_encoding(token)?,
                Some((key, value)) => {
                    let value = value.trim();
                    match key.trim().to_ascii_lowercase().as_str() {
                        "rate" | "sample_rate" | "samplerate" => {
                            spec.sample_rate = parse_positive::<u32>("rate", value)?;
                        }
                        "bits" | "bits_per_sample" | "bitspersample" => {
                            spec.bits_per_sample = parse_positive::<u16>("bits", value)?;
                        }
                        "channels" => {
                            spec.channels = parse_positive::<u16>("channels", value)?;
                        }
                        _ => {}
                    }
                }
            }
        }

        if spec.bits_per_sample % 8 != 0 {
            return Err(FormatError::UnalignedBitDepth(spec.bits_per_sample));
        }
        let block_align = spec.channels.checked_mul(spec.bytes_per_sample());
        if block_align
            .and_then(|align| spec.sample_rate.checked_mul(u32::from(align)))
            .is_none()
        {
            return Err(FormatError::InvalidField {
                field: "rate",
                value: format!("{} (byte rate overflows)", spec.sample_rate),
            });
        }

        Ok(spec)
    }

    pub fn bytes_per_sample(&self) -> u16 {
        self.bits_per_sample / 8
    }

    pub fn block_align(&self) -> u16 {
        self.channels * self.bytes_per_sample()
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * u32::from(self.block_align())
    }

    /// Playback duration of `data_len` payload bytes in milliseconds.
    pub fn duration_ms(&self, data_len: usize) -> u64 {
        let byte_rate = u64::from(self.byte_rate());
        if byte_rate == 0 {
            return 0;
        }
        data_len as u64 * 1000 / byte_rate
    }

    /// Canonical descriptor string for this layout.
    pub fn descriptor(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pcm;rate={};bits={};channels={}",
            self.sample_rate, self.bits_per_sample, self.channels
        )
    }
}

fn check_encoding(token: &str) -> Result<(), FormatError> {
    match token.to_ascii_lowercase().as_str() {
        "pcm" | "audio/pcm" | "audio/l16" | "l16" | "linear16" | "audio/x-raw" | "s16le" => Ok(()),
        _ => Err(FormatError::UnsupportedEncoding(token.to_string())),
    }
}

fn parse_positive<T>(field: &'static str, value: &str) -> Result<T, FormatError>
where
    T: std::str::FromStr + Default + PartialOrd,
{
    // Reject signs explicitly so "-1" reports NonPositive rather than a parse failure.
    if let Some(rest) = value.strip_prefix('-') {
        if rest.chars().all(|c| c.is_ascii_digit()) && !rest.is_empty() {
            return Err(FormatError::NonPositive { field });
        }
    }
    let parsed = value.parse::<T>().map_err(|_| FormatError::InvalidField {
        field,
        value: value.to_string(),
    })?;
    if parsed <= T::default() {
        return Err(FormatError::NonPositive { field });
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_descriptor_uses_defaults() {
        assert_eq!(FormatSpec::parse(None).unwrap(), FormatSpec::default());
        assert_eq!(FormatSpec::parse(Some("  ")).unwrap(), FormatSpec::default());
    }

    #[test]
    fn test_key_value_descriptor() {
        let spec = FormatSpec::parse(Some("pcm;rate=16000;bits=8;channels=2")).unwrap();
        assert_eq!(spec.sample_rate, 16000);
        assert_eq!(spec.bits_per_sample, 8);
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.block_align(), 2);
        assert_eq!(spec.byte_rate(), 32000);
    }

    #[test]
    fn test_mime_descriptor_from_gemini() {
        let spec = FormatSpec::parse(Some("audio/L16;codec=pcm;rate=24000")).unwrap();
        assert_eq!(spec, FormatSpec::default());

        let spec = FormatSpec::parse(Some("audio/pcm;rate=22050")).unwrap();
        assert_eq!(spec.sample_rate, 22050);
        assert_eq!(spec.bits_per_sample, 16);
    }

    #[test]
    fn test_partial_descriptor_fills_defaults() {
        let spec = FormatSpec::parse(Some("rate=48000")).unwrap();
        assert_eq!(spec.sample_rate, 48000);
        assert_eq!(spec.bits_per_sample, DEFAULT_BITS_PER_SAMPLE);
        assert_eq!(spec.channels, DEFAULT_CHANNELS);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            FormatSpec::parse(Some("pcm;rate=fast")),
            Err(FormatError::InvalidField { field: "rate", .. })
        ));
        assert_eq!(
            FormatSpec::parse(Some("pcm;rate=0")),
            Err(FormatError::NonPositive { field: "rate" })
        );
        assert_eq!(
            FormatSpec::parse(Some("pcm;channels=-2")),
            Err(FormatError::NonPositive { field: "channels" })
        );
        assert_eq!(
            FormatSpec::parse(Some("pcm;bits=12")),
            Err(FormatError::UnalignedBitDepth(12))
        );
    }

    #[test]
    fn test_compressed_encoding_rejected() {
        assert!(matches!(
            FormatSpec::parse(Some("audio/mpeg")),
            Err(FormatError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn test_descriptor_round_trip() {
        let spec = FormatSpec {
            sample_rate: 44100,
            bits_per_sample: 24,
            channels: 2,
        };
        assert_eq!(FormatSpec::parse(Some(&spec.descriptor())).unwrap(), spec);
    }

    #[test]
    fn test_duration() {
        let spec = FormatSpec::default();
        assert_eq!(spec.duration_ms(48000), 1000);
        assert_eq!(spec.duration_ms(0), 0);
    }
}
