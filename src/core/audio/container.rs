//! RIFF/WAVE container framing for raw PCM.
//!
//! Every provider hands back raw interleaved samples plus a descriptor. This
//! module wraps them in the canonical 44-byte PCM WAV header so browsers can
//! play the result straight from a `data:` URL.

use base64::prelude::*;

use super::format::{FormatError, FormatSpec};

/// Size of the canonical PCM WAV header.
pub const WAV_HEADER_LEN: usize = 44;

/// Sample rate of the reserved silent container.
pub const SILENT_SAMPLE_RATE: u32 = 44100;

const PCM_FORMAT_CODE: u16 = 1;
const FMT_CHUNK_LEN: u32 = 16;

/// Raw samples returned by a provider, consumed once by [`encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAudio {
    pub bytes: Vec<u8>,
    /// Format descriptor, e.g. `pcm;rate=24000;bits=16;channels=1`.
    pub format: Option<String>,
}

impl RawAudio {
    pub fn new(bytes: Vec<u8>, format: impl Into<String>) -> Self {
        Self {
            bytes,
            format: Some(format.into()),
        }
    }

    /// Raw audio with no descriptor; the encoder applies its defaults.
    pub fn undescribed(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            format: None,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A complete, self-describing WAV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioContainer {
    bytes: Vec<u8>,
}

impl AudioContainer {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Payload length declared by the data chunk.
    pub fn data_len(&self) -> usize {
        self.bytes.len().saturating_sub(WAV_HEADER_LEN)
    }

    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(&self.bytes)
    }
}

/// Frame raw provider audio into a WAV container.
///
/// Pure and deterministic: identical input always yields identical bytes.
pub fn encode(raw: &RawAudio) -> Result<AudioContainer, FormatError> {
    let spec = FormatSpec::parse(raw.format.as_deref())?;
    encode_with_spec(&raw.bytes, &spec)
}

/// Frame PCM bytes with an already-parsed layout.
///
/// Fails when the payload does not fit the 32-bit RIFF size fields.
pub fn encode_with_spec(pcm: &[u8], spec: &FormatSpec) -> Result<AudioContainer, FormatError> {
    let (riff_size, data_size) = chunk_sizes(pcm.len())?;
    Ok(frame(pcm, spec, riff_size, data_size))
}

/// RIFF and data chunk sizes for a payload of `pcm_len` bytes.
fn chunk_sizes(pcm_len: usize) -> Result<(u32, u32), FormatError> {
    let too_large = || FormatError::PayloadTooLarge(pcm_len);
    let data_size = u32::try_from(pcm_len).map_err(|_| too_large())?;
    let riff_size = data_size
        .checked_add(WAV_HEADER_LEN as u32 - 8)
        .ok_or_else(too_large)?;
    Ok((riff_size, data_size))
}

fn frame(pcm: &[u8], spec: &FormatSpec, riff_size: u32, data_size: u32) -> AudioContainer {
    let mut bytes = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&riff_size.to_le_bytes());
    bytes.extend_from_slice(b"WAVE");

    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
    bytes.extend_from_slice(&PCM_FORMAT_CODE.to_le_bytes());
    bytes.extend_from_slice(&spec.channels.to_le_bytes());
    bytes.extend_from_slice(&spec.sample_rate.to_le_bytes());
    bytes.extend_from_slice(&spec.byte_rate().to_le_bytes());
    bytes.extend_from_slice(&spec.block_align().to_le_bytes());
    bytes.extend_from_slice(&spec.bits_per_sample.to_le_bytes());

    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_size.to_le_bytes());
    bytes.extend_from_slice(pcm);

    AudioContainer { bytes }
}

/// The reserved zero-payload container returned when every provider fails.
pub fn silent_container() -> AudioContainer {
    let spec = FormatSpec {
        sample_rate: SILENT_SAMPLE_RATE,
        ..FormatSpec::default()
    };
    frame(&[], &spec, WAV_HEADER_LEN as u32 - 8, 0)
}

/// Read a canonical PCM WAV header back into its layout and payload.
///
/// Only the 44-byte layout produced by [`encode`] (and by Google LINEAR16
/// responses) is understood; extensible headers or extra chunks are rejected.
pub fn parse_container(bytes: &[u8]) -> Result<(FormatSpec, &[u8]), FormatError> {
    if bytes.len() < WAV_HEADER_LEN {
        return Err(FormatError::MalformedContainer(format!(
            "{} bytes is shorter than a WAV header",
            bytes.len()
        )));
    }
    if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(FormatError::MalformedContainer(
            "missing RIFF/WAVE magic".to_string(),
        ));
    }
    if &bytes[12..16] != b"fmt " || read_u16(bytes, 20) != PCM_FORMAT_CODE {
        return Err(FormatError::MalformedContainer(
            "fmt chunk is not plain PCM".to_string(),
        ));
    }
    if &bytes[36..40] != b"data" {
        return Err(FormatError::MalformedContainer(
            "data chunk does not follow fmt chunk".to_string(),
        ));
    }

    let spec = FormatSpec {
        channels: read_u16(bytes, 22),
        sample_rate: read_u32(bytes, 24),
        bits_per_sample: read_u16(bytes, 34),
    };
    // Streamed WAVs may declare a placeholder size; clamp to what is present.
    let declared = read_u32(bytes, 40) as usize;
    let available = bytes.len() - WAV_HEADER_LEN;
    let data_len = declared.min(available);

    Ok((spec, &bytes[WAV_HEADER_LEN..WAV_HEADER_LEN + data_len]))
}

/// Build the `data:` URL handed to downstream consumers.
pub fn to_data_url(mime_type: &str, base64_payload: &str) -> String {
    format!("data:{mime_type};base64,{base64_payload}")
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
