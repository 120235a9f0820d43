//! Encoding detection for registry exports.
//!
//! Federal registry dumps ship in a mix of UTF-8 and legacy Windows encodings, often
//! with no reliable signal up front. Detection here is a collaborator behind the
//! [`EncodingDetector`] trait: it sees a byte sample taken from the start of the
//! input and names an encoding, and a failure to detect is never fatal — the caller
//! falls back to a configured default.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

use crate::error::{FilterError, FilterResult};

/// Bytes sampled from the start of the input for detection.
pub const DEFAULT_SAMPLE_SIZE: usize = 10_000;

/// Fallback when detection is inconclusive. Windows-1252 decodes every byte, so the
/// run can always proceed (mojibake at worst, like the `latin-1` fallback of the
/// tooling this replaces).
pub static FALLBACK_ENCODING: &Encoding = &encoding_rs::WINDOWS_1252_INIT;

/// Names an encoding given a byte sample from the start of the input.
pub trait EncodingDetector {
    /// `None` means "could not tell"; the caller falls back to its default.
    fn detect(&self, sample: &[u8]) -> Option<&'static Encoding>;
}

/// Default detector: UTF-8 when the sample is pure ASCII or valid UTF-8 (allowing a
/// multi-byte sequence cut off at the sample boundary), Windows-1252 otherwise.
#[derive(Debug, Default)]
pub struct HeuristicDetector;

impl EncodingDetector for HeuristicDetector {
    fn detect(&self, sample: &[u8]) -> Option<&'static Encoding> {
        if sample.is_ascii() || utf8_prefix_valid(sample) {
            Some(UTF_8)
        } else {
            Some(WINDOWS_1252)
        }
    }
}

fn utf8_prefix_valid(bytes: &[u8]) -> bool {
    match std::str::from_utf8(bytes) {
        Ok(_) => true,
        // error_len() == None: the sample ends inside a multi-byte sequence, which a
        // fixed-size sample legitimately can.
        Err(e) => e.error_len().is_none() && e.valid_up_to() > 0,
    }
}

/// Pick the encoding for a run.
///
/// Priority: explicit label override (a label `encoding_rs` does not know is a
/// configuration error), then the detector's verdict on `sample`, then `default`.
pub fn resolve_encoding(
    override_label: Option<&str>,
    detector: &dyn EncodingDetector,
    sample: &[u8],
    default: &'static Encoding,
) -> FilterResult<&'static Encoding> {
    if let Some(label) = override_label {
        return Encoding::for_label(label.as_bytes()).ok_or_else(|| {
            FilterError::UnsupportedEncoding {
                label: label.to_string(),
            }
        });
    }
    Ok(detector.detect(sample).unwrap_or(default))
}
