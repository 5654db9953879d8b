/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use std::collections::HashMap;
use std::io::Write;

use imcodec_core::bytestream::ByteWriter;
use imcodec_core::monitor::{Rect, RowMonitor};
use imcodec_core::options::{BmpCompression, BmpOptions};
use imcodec_core::pixel::PixelType;
use log::{trace, warn};

use crate::common::{
    padded_stride, CompressionMethod, FILE_HEADER_SIZE, INFO_HEADER_SIZE, LCS_SRGB,
    PIXELS_PER_METRE, V4_HEADER_SIZE
};
use crate::BmpEncoderErrors;

/// How rows end up in the file
enum Layout {
    /// 8 bit palette indices, uncompressed or RLE8
    Palette {
        palette: Vec<[u8; 3]>,
        indices: Vec<u8>,
        rle:     bool
    },
    /// 24 bit BGR
    Bgr,
    /// 32 bit BGRA with channel masks
    Bgra
}

/// A BMP encoder
///
/// Accepts [`Gray8`](PixelType::Gray8), [`Rgb8`](PixelType::Rgb8) and
/// [`Rgba8`](PixelType::Rgba8) pixels, top row first.
///
/// # Example
/// ```
/// use imcodec_bmp::BmpEncoder;
/// use imcodec_core::bytestream::ByteWriter;
/// use imcodec_core::monitor::NoopMonitor;
/// use imcodec_core::options::BmpOptions;
/// use imcodec_core::pixel::PixelType;
///
/// let pixels = [255, 0, 0, 0, 255, 0];
/// let encoder = BmpEncoder::new(&pixels, 2, 1, PixelType::Rgb8, BmpOptions::default());
///
/// let mut sink = Vec::new();
/// let written = encoder.encode(&mut ByteWriter::new(&mut sink), &mut NoopMonitor).unwrap();
/// assert_eq!(written, sink.len());
/// ```
pub struct BmpEncoder<'a> {
    data:       &'a [u8],
    width:      usize,
    height:     usize,
    pixel_type: PixelType,
    options:    BmpOptions
}

impl<'a> BmpEncoder<'a> {
    pub fn new(
        data: &'a [u8], width: usize, height: usize, pixel_type: PixelType, options: BmpOptions
    ) -> BmpEncoder<'a> {
        BmpEncoder {
            data,
            width,
            height,
            pixel_type,
            options
        }
    }

    /// Pixel types this encoder can write
    pub const fn supported_pixel_types() -> &'static [PixelType] {
        &[PixelType::Gray8, PixelType::Rgb8, PixelType::Rgba8]
    }

    /// Encode the image into `sink`, returning the number of bytes written.
    ///
    /// Nothing is written if the monitor refuses to start.
    pub fn encode<W: Write + ?Sized>(
        &self, sink: &mut ByteWriter<W>, monitor: &mut dyn RowMonitor
    ) -> Result<usize, BmpEncoderErrors> {
        let (width, height) = (self.width, self.height);

        if width == 0 || height == 0 || width > i32::MAX as usize || height > i32::MAX as usize {
            return Err(BmpEncoderErrors::InvalidDimensions(width, height));
        }
        if !Self::supported_pixel_types().contains(&self.pixel_type) {
            return Err(BmpEncoderErrors::UnsupportedPixelType(self.pixel_type));
        }
        let expected = width
            .checked_mul(height)
            .and_then(|x| x.checked_mul(self.pixel_type.bytes_per_pixel()))
            .ok_or(BmpEncoderErrors::InvalidDimensions(width, height))?;

        if self.data.len() != expected {
            return Err(BmpEncoderErrors::WrongInputSize(expected, self.data.len()));
        }
        if !monitor.rows_done(0, height, None) {
            return Err(BmpEncoderErrors::Interrupted);
        }
        let layout = self.choose_layout();
        let start = sink.bytes_written();

        match layout {
            Layout::Palette {
                palette,
                indices,
                rle: true
            } => {
                let body = encode_rle8(&indices, width, height, monitor)?;

                self.write_headers(sink, 8, CompressionMethod::Rle8, &palette, body.len())?;
                sink.write_all(&body)?;
            }
            Layout::Palette {
                palette, indices, ..
            } => {
                self.write_rows(sink, 8, &palette, monitor, |y, row| {
                    row[..width].copy_from_slice(&indices[y * width..(y + 1) * width]);
                })?;
            }
            Layout::Bgr => {
                let data = self.data;
                self.write_rows(sink, 24, &[], monitor, |y, row| {
                    let src = &data[y * width * 3..(y + 1) * width * 3];
                    for (pixel, out) in src.chunks_exact(3).zip(row.chunks_exact_mut(3)) {
                        out.copy_from_slice(&[pixel[2], pixel[1], pixel[0]]);
                    }
                })?;
            }
            Layout::Bgra => {
                let data = self.data;
                self.write_rows(sink, 32, &[], monitor, |y, row| {
                    let src = &data[y * width * 4..(y + 1) * width * 4];
                    for (pixel, out) in src.chunks_exact(4).zip(row.chunks_exact_mut(4)) {
                        out.copy_from_slice(&[pixel[2], pixel[1], pixel[0], pixel[3]]);
                    }
                })?;
            }
        }
        sink.flush()?;

        Ok(sink.bytes_written() - start)
    }

    fn choose_layout(&self) -> Layout {
        let wants_rle = self.options.get_compression() == BmpCompression::Rle;

        match self.pixel_type {
            PixelType::Gray8 => Layout::Palette {
                palette: (0..=255).map(|x| [x, x, x]).collect(),
                indices: self.data.to_vec(),
                rle:     wants_rle
            },
            PixelType::Rgb8 if wants_rle => match build_palette(self.data) {
                Some((palette, indices)) => Layout::Palette {
                    palette,
                    indices,
                    rle: true
                },
                None => {
                    warn!("Image has more than 256 colors, RLE8 not possible, writing uncompressed");
                    Layout::Bgr
                }
            },
            PixelType::Rgba8 => {
                if wants_rle {
                    warn!("RLE8 cannot store alpha, writing uncompressed");
                }
                Layout::Bgra
            }
            _ => Layout::Bgr
        }
    }

    fn write_headers<W: Write + ?Sized>(
        &self, sink: &mut ByteWriter<W>, depth: u16, compression: CompressionMethod,
        palette: &[[u8; 3]], image_size: usize
    ) -> Result<(), BmpEncoderErrors> {
        let is_v4 = depth == 32;
        let info_size = if is_v4 {
            V4_HEADER_SIZE
        } else {
            INFO_HEADER_SIZE
        };
        let data_offset = FILE_HEADER_SIZE + info_size as usize + palette.len() * 4;
        let file_size = u32::try_from(data_offset + image_size)
            .map_err(|_| BmpEncoderErrors::InvalidDimensions(self.width, self.height))?;

        trace!("Writing {}x{} BMP, depth {}, {:?}", self.width, self.height, depth, compression);

        // file header
        sink.write_all(b"BM")?;
        sink.write_u32_le_err(file_size)?;
        sink.write_u32_le_err(0)?;
        sink.write_u32_le_err(data_offset as u32)?;

        // info header, positive height means bottom-up rows
        let compression = if is_v4 {
            CompressionMethod::Bitfields
        } else {
            compression
        };
        sink.write_u32_le_err(info_size)?;
        sink.write_i32_le_err(self.width as i32)?;
        sink.write_i32_le_err(self.height as i32)?;
        sink.write_u16_le_err(1)?;
        sink.write_u16_le_err(depth)?;
        sink.write_u32_le_err(compression.to_u32())?;
        sink.write_u32_le_err(image_size as u32)?;
        sink.write_i32_le_err(PIXELS_PER_METRE)?;
        sink.write_i32_le_err(PIXELS_PER_METRE)?;
        sink.write_u32_le_err(palette.len() as u32)?;
        sink.write_u32_le_err(0)?;

        if is_v4 {
            // red, green, blue and alpha masks
            for mask in [0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0xFF00_0000] {
                sink.write_u32_le_err(mask)?;
            }
            sink.write_u32_le_err(LCS_SRGB)?;
            // endpoints and gamma are unused for sRGB
            sink.write_all(&[0; 36 + 12])?;
        }
        for [r, g, b] in palette {
            sink.write_all(&[*b, *g, *r, 0])?;
        }
        Ok(())
    }

    /// Write uncompressed rows bottom-up, `fill` receives the source row index
    /// and the padded destination row
    fn write_rows<W: Write + ?Sized>(
        &self, sink: &mut ByteWriter<W>, depth: u16, palette: &[[u8; 3]],
        monitor: &mut dyn RowMonitor, mut fill: impl FnMut(usize, &mut [u8])
    ) -> Result<(), BmpEncoderErrors> {
        let stride = padded_stride(self.width, usize::from(depth))
            .ok_or(BmpEncoderErrors::InvalidDimensions(self.width, self.height))?;
        let image_size = stride
            .checked_mul(self.height)
            .ok_or(BmpEncoderErrors::InvalidDimensions(self.width, self.height))?;
        let compression = if depth == 32 {
            CompressionMethod::Bitfields
        } else {
            CompressionMethod::Rgb
        };
        self.write_headers(sink, depth, compression, palette, image_size)?;

        let mut row = vec![0_u8; stride];

        for (done, y) in (0..self.height).rev().enumerate() {
            fill(y, &mut row);
            sink.write_all(&row)?;

            if !monitor.rows_done(done + 1, self.height, Some(Rect::new(0, y, self.width, 1))) {
                return Err(BmpEncoderErrors::Interrupted);
            }
        }
        Ok(())
    }
}

/// Build an exact palette for RGB pixels, or `None` if there are more
/// than 256 distinct colors
fn build_palette(data: &[u8]) -> Option<(Vec<[u8; 3]>, Vec<u8>)> {
    let mut lookup: HashMap<[u8; 3], u8> = HashMap::new();
    let mut palette = Vec::new();
    let mut indices = Vec::with_capacity(data.len() / 3);

    for pixel in data.chunks_exact(3) {
        let color = [pixel[0], pixel[1], pixel[2]];
        let index = match lookup.get(&color) {
            Some(index) => *index,
            None => {
                if palette.len() == 256 {
                    return None;
                }
                let index = palette.len() as u8;
                palette.push(color);
                lookup.insert(color, index);
                index
            }
        };
        indices.push(index);
    }
    Some((palette, indices))
}

/// Run length encode 8 bit indices, bottom row first
fn encode_rle8(
    indices: &[u8], width: usize, height: usize, monitor: &mut dyn RowMonitor
) -> Result<Vec<u8>, BmpEncoderErrors> {
    let mut out = Vec::with_capacity(indices.len() / 2);

    for (done, y) in (0..height).rev().enumerate() {
        let row = &indices[y * width..(y + 1) * width];
        let mut x = 0;

        while x < row.len() {
            let run = row[x..]
                .iter()
                .take(255)
                .take_while(|v| **v == row[x])
                .count();

            if run >= 2 {
                out.extend_from_slice(&[run as u8, row[x]]);
                x += run;
                continue;
            }
            // gather a literal stretch until the next run of two or more
            let mut end = x + 1;
            while end < row.len() && end - x < 255 {
                if end + 1 < row.len() && row[end] == row[end + 1] {
                    break;
                }
                end += 1;
            }
            let literal = &row[x..end];

            if literal.len() < 3 {
                // absolute mode needs at least three pixels
                for value in literal {
                    out.extend_from_slice(&[1, *value]);
                }
            } else {
                out.extend_from_slice(&[0, literal.len() as u8]);
                out.extend_from_slice(literal);
                if literal.len() % 2 == 1 {
                    out.push(0);
                }
            }
            x = end;
        }
        // end of line
        out.extend_from_slice(&[0, 0]);

        if !monitor.rows_done(done + 1, height, Some(Rect::new(0, y, width, 1))) {
            return Err(BmpEncoderErrors::Interrupted);
        }
    }
    // end of bitmap
    out.extend_from_slice(&[0, 1]);
    Ok(out)
}
