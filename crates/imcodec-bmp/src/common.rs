/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

pub(crate) const FILE_HEADER_SIZE: usize = 14;
/// BITMAPINFOHEADER
pub(crate) const INFO_HEADER_SIZE: u32 = 40;
/// BITMAPV4HEADER
pub(crate) const V4_HEADER_SIZE: u32 = 108;
/// `sRGB` as a little endian u32, the V4 color space tag
pub(crate) const LCS_SRGB: u32 = 0x7352_4742;
/// 72 DPI in pixels per metre
pub(crate) const PIXELS_PER_METRE: i32 = 2835;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum CompressionMethod {
    Rgb,
    Rle8,
    Rle4,
    Bitfields,
    AlphaBitfields
}

impl CompressionMethod {
    pub fn from_u32(num: u32) -> Option<CompressionMethod> {
        match num {
            0 => Some(CompressionMethod::Rgb),
            1 => Some(CompressionMethod::Rle8),
            2 => Some(CompressionMethod::Rle4),
            3 => Some(CompressionMethod::Bitfields),
            6 => Some(CompressionMethod::AlphaBitfields),
            _ => None
        }
    }

    pub const fn to_u32(self) -> u32 {
        match self {
            CompressionMethod::Rgb => 0,
            CompressionMethod::Rle8 => 1,
            CompressionMethod::Rle4 => 2,
            CompressionMethod::Bitfields => 3,
            CompressionMethod::AlphaBitfields => 6
        }
    }

    pub const fn is_rle(self) -> bool {
        matches!(self, CompressionMethod::Rle4 | CompressionMethod::Rle8)
    }

    pub const fn has_masks(self) -> bool {
        matches!(
            self,
            CompressionMethod::Bitfields | CompressionMethod::AlphaBitfields
        )
    }
}

/// One channel of a masked pixel
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct Bitfield {
    shift: u32,
    bits:  u32
}

impl Bitfield {
    pub fn from_mask(mask: u32) -> Bitfield {
        if mask == 0 {
            return Bitfield::default();
        }
        let shift = mask.trailing_zeros();
        let bits = (mask >> shift).trailing_ones();

        Bitfield { shift, bits }
    }

    pub const fn is_present(&self) -> bool {
        self.bits != 0
    }

    /// Extract this channel from `pixel`, scaled to eight bits
    pub fn extract(&self, pixel: u32) -> u8 {
        if self.bits == 0 {
            return 0;
        }
        let value = (pixel >> self.shift) & ((1_u64 << self.bits) - 1) as u32;

        match self.bits {
            8 => value as u8,
            bits if bits > 8 => (value >> (bits - 8)) as u8,
            bits => {
                let max = (1_u32 << bits) - 1;
                ((value * 255 + max / 2) / max) as u8
            }
        }
    }
}

/// Bytes used by a row of `width` pixels at `depth` bits, padded to four bytes
pub(crate) fn padded_stride(width: usize, depth: usize) -> Option<usize> {
    Some(width.checked_mul(depth)?.checked_add(31)? / 32 * 4)
}

#[cfg(test)]
mod tests {
    use super::{padded_stride, Bitfield};

    #[test]
    fn bitfield_scaling() {
        let red = Bitfield::from_mask(0x7C00);
        assert_eq!(red.extract(0x7C00), 255);
        assert_eq!(red.extract(0), 0);

        let green = Bitfield::from_mask(0x07E0);
        assert_eq!(green.extract(0x07E0), 255);

        let alpha = Bitfield::from_mask(0xFF00_0000);
        assert_eq!(alpha.extract(0x8000_0000), 0x80);
        assert!(!Bitfield::from_mask(0).is_present());
    }

    #[test]
    fn strides_are_four_byte_aligned() {
        assert_eq!(padded_stride(2, 24), Some(8));
        assert_eq!(padded_stride(3, 1), Some(4));
        assert_eq!(padded_stride(4, 32), Some(16));
    }
}
