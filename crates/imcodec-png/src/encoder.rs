/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use imcodec_core::bytestream::ByteWriter;
use imcodec_core::monitor::{Rect, RowMonitor};
use imcodec_core::options::PngOptions;
use imcodec_core::pixel::{BitDepth, PixelType};
use log::trace;

use crate::constants::{IDAT_CHUNK_SIZE, PNG_SIGNATURE};
use crate::enums::{FilterMethod, PngColor};
use crate::error::PngEncodeErrors;
use crate::filters::{choose_and_filter, filter_row};
use crate::headers::write_chunk;

/// A PNG encoder
///
/// Sixteen bit pixels are expected in native endian, they are
/// byte swapped to big endian on the way out.
///
/// # Example
/// ```
/// use imcodec_core::bytestream::ByteWriter;
/// use imcodec_core::monitor::NoopMonitor;
/// use imcodec_core::options::PngOptions;
/// use imcodec_core::pixel::PixelType;
/// use imcodec_png::PngEncoder;
///
/// let pixels = [0_u8, 64, 128, 255];
/// let encoder = PngEncoder::new(&pixels, 2, 2, PixelType::Gray8, PngOptions::default());
///
/// let mut sink = Vec::new();
/// encoder.encode(&mut ByteWriter::new(&mut sink), &mut NoopMonitor).unwrap();
/// assert!(imcodec_png::probe_png(&sink));
/// ```
pub struct PngEncoder<'a> {
    data:       &'a [u8],
    width:      usize,
    height:     usize,
    pixel_type: PixelType,
    options:    PngOptions
}

impl<'a> PngEncoder<'a> {
    pub fn new(
        data: &'a [u8], width: usize, height: usize, pixel_type: PixelType, options: PngOptions
    ) -> PngEncoder<'a> {
        PngEncoder {
            data,
            width,
            height,
            pixel_type,
            options
        }
    }

    pub const fn supported_pixel_types() -> &'static [PixelType] {
        &[
            PixelType::Gray8,
            PixelType::GrayAlpha8,
            PixelType::Rgb8,
            PixelType::Rgba8,
            PixelType::Gray16,
            PixelType::GrayAlpha16,
            PixelType::Rgb16,
            PixelType::Rgba16
        ]
    }

    fn color_type(&self) -> Option<PngColor> {
        match self.pixel_type {
            PixelType::Gray8 | PixelType::Gray16 => Some(PngColor::Luma),
            PixelType::GrayAlpha8 | PixelType::GrayAlpha16 => Some(PngColor::LumaA),
            PixelType::Rgb8 | PixelType::Rgb16 => Some(PngColor::RGB),
            PixelType::Rgba8 | PixelType::Rgba16 => Some(PngColor::RGBA),
            _ => None
        }
    }

    /// Encode the image, returning the number of bytes written to `sink`.
    ///
    /// Pixel data is compressed in memory first, nothing reaches the
    /// sink if encoding is interrupted.
    pub fn encode<W: Write + ?Sized>(
        &self, sink: &mut ByteWriter<W>, monitor: &mut dyn RowMonitor
    ) -> Result<usize, PngEncodeErrors> {
        let (width, height) = (self.width, self.height);

        if width == 0 || height == 0 || width > i32::MAX as usize || height > i32::MAX as usize {
            return Err(PngEncodeErrors::InvalidDimensions(width, height));
        }
        let color = self
            .color_type()
            .ok_or(PngEncodeErrors::UnsupportedPixelType(self.pixel_type))?;
        let bpp = self.pixel_type.bytes_per_pixel();
        let stride = width
            .checked_mul(bpp)
            .ok_or(PngEncodeErrors::InvalidDimensions(width, height))?;
        let expected = stride
            .checked_mul(height)
            .ok_or(PngEncodeErrors::InvalidDimensions(width, height))?;

        if self.data.len() != expected {
            return Err(PngEncodeErrors::WrongInputSize(expected, self.data.len()));
        }
        if !monitor.rows_done(0, height, None) {
            return Err(PngEncodeErrors::Interrupted);
        }
        let sixteen_bit = self.pixel_type.depth() == BitDepth::Sixteen;
        let fixed_filter = FilterMethod::from_option(self.options.get_filter());
        let level = u32::from(self.options.get_compression_level());

        trace!("Encoding {}x{} {:?} PNG, level {}", width, height, self.pixel_type, level);

        let mut compressor = ZlibEncoder::new(Vec::new(), Compression::new(level));

        let mut prev = vec![0_u8; stride];
        let mut current = vec![0_u8; stride];
        let mut filtered = vec![0_u8; stride];
        let mut scratch = vec![0_u8; stride];

        for (y, row) in self.data.chunks_exact(stride).enumerate() {
            if sixteen_bit {
                for (out, sample) in current.chunks_exact_mut(2).zip(row.chunks_exact(2)) {
                    let value = u16::from_ne_bytes([sample[0], sample[1]]);
                    out.copy_from_slice(&value.to_be_bytes());
                }
            } else {
                current.copy_from_slice(row);
            }
            let filter = match fixed_filter {
                Some(filter) => {
                    filter_row(filter, &prev, &current, &mut filtered, bpp);
                    filter
                }
                None => choose_and_filter(&prev, &current, &mut filtered, &mut scratch, bpp)
            };
            compressor.write_all(&[filter.to_int()])?;
            compressor.write_all(&filtered)?;

            std::mem::swap(&mut prev, &mut current);

            if !monitor.rows_done(y + 1, height, Some(Rect::new(0, y, width, 1))) {
                return Err(PngEncodeErrors::Interrupted);
            }
        }
        let compressed = compressor.finish()?;

        let mut ihdr = [0_u8; 13];
        ihdr[0..4].copy_from_slice(&(width as u32).to_be_bytes());
        ihdr[4..8].copy_from_slice(&(height as u32).to_be_bytes());
        ihdr[8] = if sixteen_bit { 16 } else { 8 };
        ihdr[9] = color.to_int();
        // compression, filter and interlace methods stay zero

        let start = sink.bytes_written();

        sink.write_all(&PNG_SIGNATURE)?;
        write_chunk(sink, b"IHDR", &ihdr)?;

        for chunk in compressed.chunks(IDAT_CHUNK_SIZE) {
            write_chunk(sink, b"IDAT", chunk)?;
        }
        write_chunk(sink, b"IEND", &[])?;

        Ok(sink.bytes_written() - start)
    }
}

#[cfg(test)]
mod tests {
    use imcodec_core::bytestream::ByteWriter;
    use imcodec_core::monitor::{NoopMonitor, Rect};
    use imcodec_core::options::PngOptions;
    use imcodec_core::pixel::PixelType;

    use super::PngEncoder;
    use crate::PngEncodeErrors;

    #[test]
    fn chunk_layout() {
        let pixels = [7_u8; 4 * 3 * 3];
        let encoder = PngEncoder::new(&pixels, 4, 3, PixelType::Rgb8, PngOptions::default());
        let mut sink = Vec::new();

        let written = encoder
            .encode(&mut ByteWriter::new(&mut sink), &mut NoopMonitor)
            .unwrap();

        assert_eq!(written, sink.len());
        assert_eq!(&sink[12..16], b"IHDR");
        // rgb, eight bits
        assert_eq!(sink[24], 8);
        assert_eq!(sink[25], 2);
        assert_eq!(&sink[sink.len() - 8..sink.len() - 4], b"IEND");
    }

    #[test]
    fn rejects_float_pixels() {
        let pixels = [0_u8; 12];
        let encoder = PngEncoder::new(&pixels, 1, 1, PixelType::RgbF32, PngOptions::default());
        let result = encoder.encode(&mut ByteWriter::new(Vec::new()), &mut NoopMonitor);

        assert!(matches!(result, Err(PngEncodeErrors::UnsupportedPixelType(_))));
    }

    #[test]
    fn interrupted_midway_writes_nothing() {
        let pixels = [0_u8; 8 * 8];
        let encoder = PngEncoder::new(&pixels, 8, 8, PixelType::Gray8, PngOptions::default());
        let mut sink = Vec::new();

        let mut stop_at_half = |done: usize, _: usize, _: Option<Rect>| done < 4;
        let result = encoder.encode(&mut ByteWriter::new(&mut sink), &mut stop_at_half);

        assert!(matches!(result, Err(PngEncodeErrors::Interrupted)));
        assert!(sink.is_empty());
    }
}
