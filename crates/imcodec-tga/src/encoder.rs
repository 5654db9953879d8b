/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use std::io::Write;

use imcodec_core::bytestream::ByteWriter;
use imcodec_core::monitor::{Rect, RowMonitor};
use imcodec_core::options::TgaOptions;
use imcodec_core::pixel::PixelType;
use log::trace;

use crate::common::{FOOTER_SIGNATURE, ORIGIN_TOP};
use crate::errors::TgaEncoderErrors;

/// Longest run or literal a single packet can describe
const MAX_PACKET: usize = 128;

/// A TGA encoder
///
/// # Example
/// ```
/// use imcodec_core::bytestream::ByteWriter;
/// use imcodec_core::monitor::NoopMonitor;
/// use imcodec_core::options::TgaOptions;
/// use imcodec_core::pixel::PixelType;
/// use imcodec_tga::TgaEncoder;
///
/// let pixels = [10_u8; 4 * 4 * 3];
/// let options = TgaOptions::default().set_rle(true);
/// let encoder = TgaEncoder::new(&pixels, 4, 4, PixelType::Rgb8, options);
///
/// let mut sink = Vec::new();
/// encoder.encode(&mut ByteWriter::new(&mut sink), &mut NoopMonitor).unwrap();
/// ```
pub struct TgaEncoder<'a> {
    data:       &'a [u8],
    width:      usize,
    height:     usize,
    pixel_type: PixelType,
    options:    TgaOptions
}

impl<'a> TgaEncoder<'a> {
    pub fn new(
        data: &'a [u8], width: usize, height: usize, pixel_type: PixelType, options: TgaOptions
    ) -> TgaEncoder<'a> {
        TgaEncoder {
            data,
            width,
            height,
            pixel_type,
            options
        }
    }

    pub const fn supported_pixel_types() -> &'static [PixelType] {
        &[PixelType::Gray8, PixelType::Rgb8, PixelType::Rgba8]
    }

    /// Encode the image, returning the number of bytes written.
    ///
    /// Nothing is written if the monitor refuses to start.
    pub fn encode<W: Write + ?Sized>(
        &self, sink: &mut ByteWriter<W>, monitor: &mut dyn RowMonitor
    ) -> Result<usize, TgaEncoderErrors> {
        let (width, height) = (self.width, self.height);

        if width == 0 || height == 0 || width > usize::from(u16::MAX) || height > usize::from(u16::MAX) {
            return Err(TgaEncoderErrors::InvalidDimensions(width, height));
        }
        if !Self::supported_pixel_types().contains(&self.pixel_type) {
            return Err(TgaEncoderErrors::UnsupportedPixelType(self.pixel_type));
        }
        let bpp = self.pixel_type.bytes_per_pixel();
        let expected = width * height * bpp;

        if self.data.len() != expected {
            return Err(TgaEncoderErrors::WrongInputSize(expected, self.data.len()));
        }
        if !monitor.rows_done(0, height, None) {
            return Err(TgaEncoderErrors::Interrupted);
        }
        let rle = self.options.get_rle();
        let (image_type, alpha_bits) = match self.pixel_type {
            PixelType::Gray8 => (3, 0),
            PixelType::Rgba8 => (2, 8),
            _ => (2, 0)
        };
        let image_type = if rle { image_type + 8 } else { image_type };

        trace!("Encoding {}x{} TGA, image type {}", width, height, image_type);

        let start = sink.bytes_written();

        // no id, no color map
        sink.write_all(&[0, 0, image_type])?;
        sink.write_all(&[0; 5])?;
        // x and y origin
        sink.write_u32_le_err(0)?;
        sink.write_u16_le_err(width as u16)?;
        sink.write_u16_le_err(height as u16)?;
        sink.write_u8_err((bpp * 8) as u8)?;
        sink.write_u8_err(ORIGIN_TOP | alpha_bits)?;

        let mut file_row = vec![0_u8; width * bpp];
        let mut packets = Vec::with_capacity(width * (bpp + 1));

        for (y, row) in self.data.chunks_exact(width * bpp).enumerate() {
            if bpp == 1 {
                file_row.copy_from_slice(row);
            } else {
                // RGB(A) to BGR(A)
                for (out, pixel) in file_row.chunks_exact_mut(bpp).zip(row.chunks_exact(bpp)) {
                    out.copy_from_slice(pixel);
                    out.swap(0, 2);
                }
            }
            if rle {
                packets.clear();
                encode_rle_row(&file_row, bpp, &mut packets);
                sink.write_all(&packets)?;
            } else {
                sink.write_all(&file_row)?;
            }
            if !monitor.rows_done(y + 1, height, Some(Rect::new(0, y, width, 1))) {
                return Err(TgaEncoderErrors::Interrupted);
            }
        }
        // TGA 2.0 footer without extension or developer areas
        sink.write_u32_le_err(0)?;
        sink.write_u32_le_err(0)?;
        sink.write_all(FOOTER_SIGNATURE)?;

        Ok(sink.bytes_written() - start)
    }
}

/// Run length encode one scanline of `bpp` byte pixels.
///
/// Packets never cross the end of the row
fn encode_rle_row(row: &[u8], bpp: usize, out: &mut Vec<u8>) {
    let pixels: Vec<&[u8]> = row.chunks_exact(bpp).collect();
    let count = pixels.len();
    let mut i = 0;

    while i < count {
        let mut run = 1;

        while i + run < count && run < MAX_PACKET && pixels[i + run] == pixels[i] {
            run += 1;
        }
        if run > 1 {
            out.push(0x80 | (run - 1) as u8);
            out.extend_from_slice(pixels[i]);
            i += run;
            continue;
        }
        // literal packet, ends where a run of two begins
        let start = i;

        while i < count && i - start < MAX_PACKET {
            if i + 1 < count && pixels[i] == pixels[i + 1] {
                break;
            }
            i += 1;
        }
        out.push((i - start - 1) as u8);
        out.extend_from_slice(&row[start * bpp..i * bpp]);
    }
}

#[cfg(test)]
mod tests {
    use super::encode_rle_row;

    #[test]
    fn runs_and_literals() {
        let row = [1, 1, 1, 2, 3, 3];
        let mut out = Vec::new();
        encode_rle_row(&row, 1, &mut out);

        assert_eq!(out, [0x82, 1, 0x00, 2, 0x81, 3]);
    }

    #[test]
    fn long_runs_are_split() {
        let row = [7_u8; 300];
        let mut out = Vec::new();
        encode_rle_row(&row, 1, &mut out);

        assert_eq!(out, [0xFF, 7, 0xFF, 7, 0xAB, 7]);
    }

    #[test]
    fn literals_of_multi_byte_pixels() {
        let row = [1, 2, 3, 4, 5, 6];
        let mut out = Vec::new();
        encode_rle_row(&row, 3, &mut out);

        assert_eq!(out, [0x01, 1, 2, 3, 4, 5, 6]);
    }
}
