//! Audio framing: raw PCM descriptors and the WAV container encoder.

pub mod container;
pub mod format;

pub use container::{
    AudioContainer, RawAudio, WAV_HEADER_LEN, encode, encode_with_spec, parse_container,
    silent_container, to_data_url,
};
pub use format::{FormatError, FormatSpec};
