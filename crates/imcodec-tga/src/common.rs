/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

pub const HEADER_SIZE: usize = 18;

/// Signature closing a TGA 2.0 footer, null terminated
pub const FOOTER_SIGNATURE: &[u8; 18] = b"TRUEVISION-XFILE.\0";

/// Descriptor bit set when the first stored row is the top one
pub const ORIGIN_TOP: u8 = 0x20;
/// Descriptor bit set when pixels are stored right to left
pub const ORIGIN_RIGHT: u8 = 0x10;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ImageType {
    ColorMapped,
    TrueColor,
    Gray
}

/// The fixed 18 byte header every TGA file starts with
#[derive(Copy, Clone, Debug)]
pub struct TgaHeader {
    pub id_length:      u8,
    pub color_map_type: u8,
    pub image_type:     ImageType,
    pub rle:            bool,
    pub map_first:      u16,
    pub map_length:     u16,
    pub map_depth:      u8,
    pub width:          u16,
    pub height:         u16,
    pub depth:          u8,
    pub descriptor:     u8
}

impl TgaHeader {
    /// Parse and validate a header, returning why it was rejected on failure
    pub fn parse(bytes: &[u8]) -> Result<TgaHeader, &'static str> {
        let bytes = bytes.get(..HEADER_SIZE).ok_or("Not enough bytes for a TGA header")?;
        let u16_at = |pos: usize| u16::from_le_bytes([bytes[pos], bytes[pos + 1]]);

        let color_map_type = bytes[1];

        if color_map_type > 1 {
            return Err("Unknown color map type");
        }
        let (image_type, rle) = match bytes[2] {
            1 => (ImageType::ColorMapped, false),
            2 => (ImageType::TrueColor, false),
            3 => (ImageType::Gray, false),
            9 => (ImageType::ColorMapped, true),
            10 => (ImageType::TrueColor, true),
            11 => (ImageType::Gray, true),
            _ => return Err("Unsupported image type")
        };
        let header = TgaHeader {
            id_length: bytes[0],
            color_map_type,
            image_type,
            rle,
            map_first: u16_at(3),
            map_length: u16_at(5),
            map_depth: bytes[7],
            width: u16_at(12),
            height: u16_at(14),
            depth: bytes[16],
            descriptor: bytes[17]
        };

        if color_map_type == 1 {
            if header.map_length == 0 || !matches!(header.map_depth, 15 | 16 | 24 | 32) {
                return Err("Invalid color map specification");
            }
        } else if header.map_length != 0 {
            return Err("Color map length without a color map");
        }
        let depth_ok = match image_type {
            ImageType::ColorMapped => color_map_type == 1 && matches!(header.depth, 8 | 16),
            ImageType::TrueColor => matches!(header.depth, 15 | 16 | 24 | 32),
            ImageType::Gray => matches!(header.depth, 8 | 16)
        };
        if !depth_ok {
            return Err("Invalid pixel depth for image type");
        }
        if header.width == 0 || header.height == 0 {
            return Err("Zero width or height");
        }
        if header.descriptor & 0xC0 != 0 {
            return Err("Reserved descriptor bits set");
        }
        Ok(header)
    }

    pub const fn alpha_bits(&self) -> u8 {
        self.descriptor & 0x0F
    }

    pub const fn bytes_per_pixel(&self) -> usize {
        (self.depth as usize + 7) / 8
    }

    pub const fn bytes_per_map_entry(&self) -> usize {
        (self.map_depth as usize + 7) / 8
    }

    /// Offset of the color map from the start of the file
    pub const fn color_map_offset(&self) -> usize {
        HEADER_SIZE + self.id_length as usize
    }

    /// Offset of the pixel data from the start of the file
    pub const fn pixel_data_offset(&self) -> usize {
        self.color_map_offset() + self.map_length as usize * self.bytes_per_map_entry()
    }
}

/// Returns true if `bytes` hold a plausible TGA header
pub fn probe_tga(bytes: &[u8]) -> bool {
    TgaHeader::parse(bytes).is_ok()
}

/// Expand a 5 bit channel to 8 bits
#[inline]
pub const fn scale_5_bits(value: u16) -> u8 {
    let value = (value & 31) as u8;
    (value << 3) | (value >> 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(image_type: u8, depth: u8) -> [u8; 18] {
        let mut bytes = [0_u8; 18];
        bytes[2] = image_type;
        bytes[12] = 4;
        bytes[14] = 3;
        bytes[16] = depth;
        bytes
    }

    #[test]
    fn accepts_plain_headers() {
        assert!(probe_tga(&header(2, 24)));
        assert!(probe_tga(&header(10, 32)));
        assert!(probe_tga(&header(3, 8)));
    }

    #[test]
    fn rejects_structural_nonsense() {
        assert!(!probe_tga(&header(2, 12)));
        assert!(!probe_tga(&header(5, 24)));
        // color mapped without a color map
        assert!(!probe_tga(&header(1, 8)));

        let mut zero_width = header(2, 24);
        zero_width[12] = 0;
        assert!(!probe_tga(&zero_width));

        let mut interleaved = header(2, 24);
        interleaved[17] = 0x40;
        assert!(!probe_tga(&interleaved));
    }

    #[test]
    fn signatures_of_other_formats_are_not_tga() {
        let mut png = [0_u8; 18];
        png[..8].copy_from_slice(&[137, 80, 78, 71, 13, 10, 26, 10]);
        assert!(!probe_tga(&png));

        let mut bmp = [0_u8; 18];
        bmp[..2].copy_from_slice(b"BM");
        assert!(!probe_tga(&bmp));
    }

    #[test]
    fn five_bit_scaling() {
        assert_eq!(scale_5_bits(0), 0);
        assert_eq!(scale_5_bits(31), 255);
        assert_eq!(scale_5_bits(16), 132);
    }
}
