//! WAV container framing
//!
//! Builds and validates the fixed 44-byte little-endian RIFF header:
//! RIFF chunk, "fmt " chunk (linear PCM) and "data" chunk, followed
//! immediately by the payload. All byte counts derive from the sample
//! count alone.

use std::sync::OnceLock;

use bytes::{BufMut, Bytes, BytesMut};

use crate::audio::convert::encode_pcm16_le;
use crate::constants::{DEFAULT_SAMPLES, PCM16_BITS, SAMPLE_RATE, WAV_CHANNELS};
use crate::error::WavError;

/// Size of the RIFF header in bytes
pub const HEADER_SIZE: usize = 44;

/// Fixed part of the RIFF chunk size (header minus the first 8 bytes)
const RIFF_BASE: u32 = 36;

/// Parsed or to-be-built WAV header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    /// Payload byte count (the data chunk size)
    pub data_size: u32,
}

impl WavHeader {
    /// Header for `sample_count` mono PCM16 samples at the fixed rate.
    ///
    /// Byte counts are u32 in the container, so counts above
    /// `(u32::MAX - 44) / 2` saturate instead of overflowing.
    pub fn pcm16_mono(sample_count: u32) -> Self {
        Self {
            channels: WAV_CHANNELS,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: PCM16_BITS,
            data_size: sample_count.saturating_mul(2),
        }
    }

    pub fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample / 8
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }

    pub fn riff_chunk_size(&self) -> u32 {
        RIFF_BASE.saturating_add(self.data_size)
    }

    pub fn file_size(&self) -> u32 {
        (HEADER_SIZE as u32).saturating_add(self.data_size)
    }

    /// Serialize to the 44-byte wire layout.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut header = [0u8; HEADER_SIZE];

        // RIFF chunk
        header[0..4].copy_from_slice(b"RIFF");
        header[4..8].copy_from_slice(&self.riff_chunk_size().to_le_bytes());
        header[8..12].copy_from_slice(b"WAVE");

        // fmt chunk
        header[12..16].copy_from_slice(b"fmt ");
        header[16..20].copy_from_slice(&16u32.to_le_bytes());
        header[20..22].copy_from_slice(&1u16.to_le_bytes()); // linear PCM
        header[22..24].copy_from_slice(&self.channels.to_le_bytes());
        header[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        header[28..32].copy_from_slice(&self.byte_rate().to_le_bytes());
        header[32..34].copy_from_slice(&self.block_align().to_le_bytes());
        header[34..36].copy_from_slice(&self.bits_per_sample.to_le_bytes());

        // data chunk
        header[36..40].copy_from_slice(b"data");
        header[40..44].copy_from_slice(&self.data_size.to_le_bytes());

        header
    }

    /// Parse and validate a header, checking the chunk tags, the PCM
    /// format code and both size invariants.
    pub fn parse(raw: &[u8]) -> Result<Self, WavError> {
        if raw.len() < HEADER_SIZE {
            return Err(WavError::TooShort(raw.len()));
        }
        if &raw[0..4] != b"RIFF" {
            return Err(WavError::BadTag("RIFF"));
        }
        if &raw[8..12] != b"WAVE" {
            return Err(WavError::BadTag("WAVE"));
        }
        if &raw[12..16] != b"fmt " {
            return Err(WavError::BadTag("fmt "));
        }
        if &raw[36..40] != b"data" {
            return Err(WavError::BadTag("data"));
        }

        let format_code = u16::from_le_bytes([raw[20], raw[21]]);
        if format_code != 1 {
            return Err(WavError::UnsupportedFormat(format_code));
        }

        let header = Self {
            channels: u16::from_le_bytes([raw[22], raw[23]]),
            sample_rate: u32::from_le_bytes([raw[24], raw[25], raw[26], raw[27]]),
            bits_per_sample: u16::from_le_bytes([raw[34], raw[35]]),
            data_size: u32::from_le_bytes([raw[40], raw[41], raw[42], raw[43]]),
        };

        let riff_size = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
        if riff_size != header.riff_chunk_size() {
            return Err(WavError::Inconsistent("riff chunk size"));
        }
        let byte_rate = u32::from_le_bytes([raw[28], raw[29], raw[30], raw[31]]);
        if byte_rate != header.byte_rate() {
            return Err(WavError::Inconsistent("byte rate"));
        }
        let block_align = u16::from_le_bytes([raw[32], raw[33]]);
        if block_align != header.block_align() {
            return Err(WavError::Inconsistent("block align"));
        }

        Ok(header)
    }
}

/// Build a header for `sample_count` mono PCM16 samples.
pub fn build_header(sample_count: u32) -> [u8; HEADER_SIZE] {
    WavHeader::pcm16_mono(sample_count).to_bytes()
}

/// Cached header for the default whole-transfer size, built once.
pub fn default_header() -> &'static [u8; HEADER_SIZE] {
    static HEADER: OnceLock<[u8; HEADER_SIZE]> = OnceLock::new();
    HEADER.get_or_init(|| build_header(DEFAULT_SAMPLES as u32))
}

/// Frame PCM16 samples as one complete WAV file image: 44-byte header
/// followed by the little-endian payload.
pub fn frame_pcm16(samples: &[i16]) -> Bytes {
    let header = build_header(samples.len() as u32);
    let mut out = BytesMut::with_capacity(HEADER_SIZE + samples.len() * 2);
    out.put_slice(&header);
    out.put_slice(&encode_pcm16_le(samples));
    out.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn header_magic_tags() {
        let header = build_header(100);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[12..16], b"fmt ");
        assert_eq!(&header[36..40], b"data");
    }

    #[test]
    fn default_header_matches_firmware_layout() {
        // 32768 samples of 16 kHz mono PCM16: 65536 payload bytes,
        // 65580-byte file, RIFF chunk 65572.
        let header = default_header();
        let parsed = WavHeader::parse(&header[..]).unwrap();
        assert_eq!(parsed.channels, 1);
        assert_eq!(parsed.sample_rate, 16_000);
        assert_eq!(parsed.bits_per_sample, 16);
        assert_eq!(parsed.data_size, 65_536);
        assert_eq!(parsed.riff_chunk_size(), 65_572);
        assert_eq!(parsed.file_size(), 65_580);
        assert_eq!(parsed.byte_rate(), 32_000);
        assert_eq!(parsed.block_align(), 2);
    }

    #[test]
    fn default_header_is_cached() {
        assert!(std::ptr::eq(default_header(), default_header()));
    }

    #[test]
    fn header_sizes_saturate_for_pathological_counts() {
        let header = WavHeader::pcm16_mono(u32::MAX);
        assert_eq!(header.data_size, u32::MAX);
        assert_eq!(header.riff_chunk_size(), u32::MAX);
        assert_eq!(header.file_size(), u32::MAX);
        // Serialization stays self-consistent even at the ceiling.
        let parsed = WavHeader::parse(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn parse_rejects_bad_tags() {
        let mut header = build_header(10);
        header[0] = b'X';
        assert!(matches!(
            WavHeader::parse(&header),
            Err(WavError::BadTag("RIFF"))
        ));
    }

    #[test]
    fn parse_rejects_inconsistent_riff_size() {
        let mut header = build_header(10);
        header[4..8].copy_from_slice(&999u32.to_le_bytes());
        assert!(matches!(
            WavHeader::parse(&header),
            Err(WavError::Inconsistent("riff chunk size"))
        ));
    }

    #[test]
    fn parse_rejects_truncated_header() {
        let header = build_header(10);
        assert!(matches!(
            WavHeader::parse(&header[..20]),
            Err(WavError::TooShort(20))
        ));
    }

    #[test]
    fn frame_produces_full_file_image() {
        let samples: Vec<i16> = (0..32_768).map(|i| i as i16).collect();
        let framed = frame_pcm16(&samples);
        assert_eq!(framed.len(), 65_580);
        let parsed = WavHeader::parse(&framed).unwrap();
        assert_eq!(parsed.data_size as usize, framed.len() - HEADER_SIZE);
        // Payload starts right after the header, little-endian.
        assert_eq!(&framed[44..46], &0i16.to_le_bytes());
        assert_eq!(&framed[46..48], &1i16.to_le_bytes());
    }

    proptest! {
        #[test]
        fn header_invariants_hold_for_all_sample_counts(n in 0u32..2_000_000) {
            let header = WavHeader::pcm16_mono(n);
            prop_assert_eq!(header.riff_chunk_size(), 36 + n * 2);
            prop_assert_eq!(header.byte_rate(), header.sample_rate * header.block_align() as u32);

            let parsed = WavHeader::parse(&header.to_bytes()).unwrap();
            prop_assert_eq!(parsed, header);
        }
    }
}
