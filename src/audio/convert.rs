//! Sample format conversion
//!
//! The mic delivers wide 32-bit words with the meaningful bits in the
//! high-order positions; playback and WAV framing want 16-bit linear
//! PCM. Narrowing is a fixed right shift followed by saturation, never
//! a wrap.

use bytes::{BufMut, Bytes, BytesMut};

use crate::constants::PCM_SHIFT_BITS;

/// Narrow one wide capture word to PCM16 with saturation.
#[inline]
pub fn narrow_sample(wide: i32) -> i16 {
    (wide >> PCM_SHIFT_BITS).clamp(-(i16::MAX as i32), i16::MAX as i32) as i16
}

/// Convert a buffer of wide capture words to PCM16.
///
/// Converts `min(input.len(), output.len())` samples; pure, O(n).
pub fn pcm32_to_pcm16(input: &[i32], output: &mut [i16]) {
    for (src, dst) in input.iter().zip(output.iter_mut()) {
        *dst = narrow_sample(*src);
    }
}

/// Copy every even-indexed sample into the following odd slot, turning a
/// mono capture into an interleaved-stereo-shaped buffer in place.
///
/// Pre-existing odd-slot content is overwritten unconditionally.
pub fn fan_out_stereo<T: Copy>(samples: &mut [T]) {
    let mut i = 0;
    while i + 1 < samples.len() {
        samples[i + 1] = samples[i];
        i += 2;
    }
}

/// Encode PCM16 samples as little-endian bytes.
pub fn encode_pcm16_le(samples: &[i16]) -> Bytes {
    let mut buf = BytesMut::with_capacity(samples.len() * 2);
    for &s in samples {
        buf.put_i16_le(s);
    }
    buf.freeze()
}

/// Encode wide capture words as little-endian bytes.
pub fn encode_pcm32_le(samples: &[i32]) -> Bytes {
    let mut buf = BytesMut::with_capacity(samples.len() * 4);
    for &s in samples {
        buf.put_i32_le(s);
    }
    buf.freeze()
}

/// Decode little-endian bytes into PCM16 samples.
/// Fills `min(raw.len() / 2, out.len())` samples and returns the count.
pub fn decode_pcm16_le(raw: &[u8], out: &mut [i16]) -> usize {
    let count = (raw.len() / 2).min(out.len());
    for (i, slot) in out.iter_mut().take(count).enumerate() {
        *slot = i16::from_le_bytes([raw[i * 2], raw[i * 2 + 1]]);
    }
    count
}

/// Decode little-endian bytes into wide capture words.
pub fn decode_pcm32_le(raw: &[u8], out: &mut [i32]) -> usize {
    let count = (raw.len() / 4).min(out.len());
    for (i, slot) in out.iter_mut().take(count).enumerate() {
        let base = i * 4;
        *slot = i32::from_le_bytes([raw[base], raw[base + 1], raw[base + 2], raw[base + 3]]);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn narrow_is_shift_for_in_range_values() {
        assert_eq!(narrow_sample(0), 0);
        assert_eq!(narrow_sample(1 << PCM_SHIFT_BITS), 1);
        assert_eq!(narrow_sample(-(1 << PCM_SHIFT_BITS)), -1);
        assert_eq!(narrow_sample(1000 << PCM_SHIFT_BITS), 1000);
    }

    #[test]
    fn narrow_saturates_instead_of_wrapping() {
        assert_eq!(narrow_sample(i32::MAX), i16::MAX);
        assert_eq!(narrow_sample(i32::MIN), -i16::MAX);
        // First value past the positive clamp threshold
        assert_eq!(narrow_sample((i16::MAX as i32 + 1) << PCM_SHIFT_BITS), i16::MAX);
    }

    #[test]
    fn convert_is_elementwise() {
        let input = [0, 1 << PCM_SHIFT_BITS, i32::MAX, i32::MIN];
        let mut output = [0i16; 4];
        pcm32_to_pcm16(&input, &mut output);
        assert_eq!(output, [0, 1, i16::MAX, -i16::MAX]);
    }

    #[test]
    fn fan_out_duplicates_even_slots() {
        let mut buf = [1i16, 9, 2, 9, 3, 9];
        fan_out_stereo(&mut buf);
        assert_eq!(buf, [1, 1, 2, 2, 3, 3]);
    }

    #[test]
    fn fan_out_handles_odd_length() {
        let mut buf = [1i32, 0, 2];
        fan_out_stereo(&mut buf);
        assert_eq!(buf, [1, 1, 2]);
    }

    #[test]
    fn pcm16_roundtrip() {
        let samples = [0i16, 1, -1, i16::MAX, i16::MIN, 12345];
        let raw = encode_pcm16_le(&samples);
        let mut out = [0i16; 6];
        assert_eq!(decode_pcm16_le(&raw, &mut out), 6);
        assert_eq!(out, samples);
    }

    proptest! {
        #[test]
        fn narrow_matches_clamped_shift(wide in any::<i32>()) {
            let expected = (wide >> PCM_SHIFT_BITS)
                .clamp(-(i16::MAX as i32), i16::MAX as i32) as i16;
            prop_assert_eq!(narrow_sample(wide), expected);
        }

        #[test]
        fn narrow_never_exceeds_range(wide in any::<i32>()) {
            let narrow = narrow_sample(wide) as i32;
            prop_assert!(narrow >= -(i16::MAX as i32));
            prop_assert!(narrow <= i16::MAX as i32);
        }

        #[test]
        fn pcm32_roundtrip(samples in proptest::collection::vec(any::<i32>(), 0..64)) {
            let raw = encode_pcm32_le(&samples);
            let mut out = vec![0i32; samples.len()];
            prop_assert_eq!(decode_pcm32_le(&raw, &mut out), samples.len());
            prop_assert_eq!(out, samples);
        }
    }
}
