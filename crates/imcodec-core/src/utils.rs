/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Small helpers used by more than one codec

/// Unpack samples narrower than a byte, one output byte per sample.
///
/// Samples are read most significant bits first, the way both BMP
/// and PNG pack them.
///
/// - `depth`: bits per sample, one of 1, 2 or 4. Other depths leave `out` untouched
/// - `scale`: when true, samples are stretched to the full 0-255 range,
///   when false the raw value (e.g. a palette index) is kept
///
/// Output stops when either `out` is full or `input` runs out
pub fn expand_bits_to_byte(depth: usize, scale: bool, input: &[u8], out: &mut [u8]) {
    if !matches!(depth, 1 | 2 | 4) {
        return;
    }
    let per_byte = 8 / depth;
    let mask = (1_u8 << depth) - 1;
    let multiplier = if scale { 255 / mask } else { 1 };

    for (pos, out_val) in out.iter_mut().enumerate() {
        let Some(in_val) = input.get(pos / per_byte) else {
            break;
        };
        let shift = 8 - depth * (pos % per_byte + 1);
        *out_val = multiplier * ((in_val >> shift) & mask);
    }
}

#[cfg(test)]
mod tests {
    use super::expand_bits_to_byte;

    #[test]
    fn expand_one_bit() {
        let mut out = [0; 10];
        expand_bits_to_byte(1, true, &[0b1010_0000, 0b1100_0000], &mut out);
        assert_eq!(out, [255, 0, 255, 0, 0, 0, 0, 0, 255, 255]);
    }

    #[test]
    fn expand_nibbles_without_scaling() {
        let mut out = [0; 3];
        expand_bits_to_byte(4, false, &[0x3F, 0x70], &mut out);
        assert_eq!(out, [3, 15, 7]);
    }

    #[test]
    fn expand_two_bits_scaled() {
        let mut out = [0; 4];
        expand_bits_to_byte(2, true, &[0b00_01_10_11], &mut out);
        assert_eq!(out, [0, 0x55, 0xAA, 0xFF]);
    }
}
