/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use std::io::Read;

use imcodec_core::bytestream::{ByteIoError, ByteReader};
use imcodec_core::monitor::{Rect, RowMonitor};
use imcodec_core::options::DecoderLimits;
use imcodec_core::pixel::PixelType;
use log::{trace, warn};

use crate::common::{scale_5_bits, ImageType, TgaHeader, HEADER_SIZE, ORIGIN_RIGHT, ORIGIN_TOP};
use crate::errors::TgaDecoderErrors;

/// State of the run length packet being decoded.
///
/// Packets may continue into the next scanline, so this
/// outlives a single row.
#[derive(Default)]
struct RlePacket {
    remaining: usize,
    repeat:    bool,
    pixel:     [u8; 4]
}

/// A TGA decoder
///
/// ```no_run
/// use imcodec_core::bytestream::ByteReader;
/// use imcodec_core::monitor::NoopMonitor;
/// use imcodec_tga::TgaDecoder;
///
/// let data = std::fs::read("image.tga").unwrap();
/// let mut stream = ByteReader::new(&data[..]);
/// let mut decoder = TgaDecoder::new(&mut stream);
///
/// let pixels = decoder.decode(&mut NoopMonitor).unwrap();
/// ```
pub struct TgaDecoder<'r, R: Read + ?Sized> {
    stream:     &'r mut ByteReader<R>,
    limits:     DecoderLimits,
    header:     Option<TgaHeader>,
    palette:    Vec<[u8; 4]>,
    pixel_type: PixelType
}

impl<'r, R: Read + ?Sized> TgaDecoder<'r, R> {
    pub fn new(stream: &'r mut ByteReader<R>) -> TgaDecoder<'r, R> {
        TgaDecoder::new_with_limits(stream, DecoderLimits::default())
    }

    pub fn new_with_limits(stream: &'r mut ByteReader<R>, limits: DecoderLimits) -> TgaDecoder<'r, R> {
        TgaDecoder {
            stream,
            limits,
            header: None,
            palette: Vec::new(),
            pixel_type: PixelType::Rgb8
        }
    }

    /// Parse the header and color map.
    ///
    /// Both are peeked, the stream is not moved.
    pub fn decode_headers(&mut self) -> Result<(), TgaDecoderErrors> {
        if self.header.is_some() {
            return Ok(());
        }
        let bytes = self.stream.peek_at(0, HEADER_SIZE)?;
        let header = TgaHeader::parse(bytes).map_err(TgaDecoderErrors::InvalidHeader)?;

        let (width, height) = (usize::from(header.width), usize::from(header.height));

        if let Err((dimension, value)) = self.limits.check_dimensions(width, height) {
            let limit = if dimension == "width" {
                self.limits.get_max_width()
            } else {
                self.limits.get_max_height()
            };
            return Err(TgaDecoderErrors::TooLargeDimensions(dimension, limit, value));
        }
        trace!("Width: {}", width);
        trace!("Height: {}", height);
        trace!("Image type: {:?}, RLE: {}", header.image_type, header.rle);
        trace!("Depth: {}, descriptor: {:#04X}", header.depth, header.descriptor);

        if header.color_map_type == 1 {
            let entry_size = header.bytes_per_map_entry();
            let entries = self.stream.peek_at(
                header.color_map_offset(),
                usize::from(header.map_length) * entry_size
            )?;
            self.palette = entries
                .chunks_exact(entry_size)
                .map(|entry| {
                    let mut rgba = [0; 4];
                    convert_true_color(entry, header.map_depth, true, &mut rgba);
                    rgba
                })
                .collect();
        }
        self.pixel_type = match header.image_type {
            ImageType::ColorMapped if header.map_depth == 32 => PixelType::Rgba8,
            ImageType::ColorMapped => PixelType::Rgb8,
            ImageType::Gray if header.depth == 16 => PixelType::GrayAlpha8,
            ImageType::Gray => PixelType::Gray8,
            ImageType::TrueColor => match header.depth {
                32 => PixelType::Rgba8,
                16 if header.alpha_bits() == 1 => PixelType::Rgba8,
                _ => PixelType::Rgb8
            }
        };
        trace!("Pixel type: {:?}", self.pixel_type);

        self.header = Some(header);
        Ok(())
    }

    pub fn dimensions(&self) -> Option<(usize, usize)> {
        self.header
            .map(|header| (usize::from(header.width), usize::from(header.height)))
    }

    pub fn pixel_type(&self) -> Option<PixelType> {
        self.header.map(|_| self.pixel_type)
    }

    pub fn output_buf_size(&self) -> Option<usize> {
        let (width, height) = self.dimensions()?;

        width
            .checked_mul(height)?
            .checked_mul(self.pixel_type.bytes_per_pixel())
    }

    /// Decode the image into a top-down, left to right buffer
    pub fn decode(&mut self, monitor: &mut dyn RowMonitor) -> Result<Vec<u8>, TgaDecoderErrors> {
        self.decode_headers()?;

        let header = self
            .header
            .ok_or(TgaDecoderErrors::GenericStatic("Headers not decoded"))?;
        let size = self
            .output_buf_size()
            .ok_or(TgaDecoderErrors::GenericStatic("Image dimensions overflow"))?;
        let (width, height) = (usize::from(header.width), usize::from(header.height));

        if !monitor.rows_done(0, height, None) {
            return Err(TgaDecoderErrors::Interrupted);
        }
        self.stream.skip(header.pixel_data_offset())?;

        let in_bpp = header.bytes_per_pixel();
        let out_bpp = self.pixel_type.bytes_per_pixel();
        let out_stride = width * out_bpp;

        let mut output = vec![0_u8; size];
        let mut raw_row = vec![0_u8; width * in_bpp];
        let mut packet = RlePacket::default();

        for i in 0..height {
            let read = if header.rle {
                self.read_rle_row(&mut packet, in_bpp, &mut raw_row)
            } else {
                self.stream.read_exact_bytes(&mut raw_row)
            };
            if let Err(err) = read {
                if err.is_truncation() && !self.limits.get_strict_mode() {
                    warn!("Pixel data ends after {} of {} rows", i, height);
                    break;
                }
                return Err(err.into());
            }
            let y = if header.descriptor & ORIGIN_TOP != 0 {
                i
            } else {
                height - 1 - i
            };
            let out_row = &mut output[y * out_stride..(y + 1) * out_stride];

            self.convert_row(&header, &raw_row, out_row);

            if header.descriptor & ORIGIN_RIGHT != 0 {
                reverse_pixels(out_row, out_bpp);
            }
            if !monitor.rows_done(i + 1, height, Some(Rect::new(0, y, width, 1))) {
                return Err(TgaDecoderErrors::Interrupted);
            }
        }
        Ok(output)
    }

    fn read_rle_row(&mut self, packet: &mut RlePacket, bpp: usize, row: &mut [u8]) -> Result<(), ByteIoError> {
        for pixel in row.chunks_exact_mut(bpp) {
            if packet.remaining == 0 {
                let control = self.stream.get_u8_err()?;

                packet.remaining = usize::from(control & 0x7F) + 1;
                packet.repeat = control & 0x80 != 0;

                if packet.repeat {
                    self.stream.read_exact_bytes(&mut packet.pixel[..bpp])?;
                }
            }
            if packet.repeat {
                pixel.copy_from_slice(&packet.pixel[..bpp]);
            } else {
                self.stream.read_exact_bytes(pixel)?;
            }
            packet.remaining -= 1;
        }
        Ok(())
    }

    fn convert_row(&self, header: &TgaHeader, raw: &[u8], out: &mut [u8]) {
        let in_bpp = header.bytes_per_pixel();
        let out_bpp = self.pixel_type.bytes_per_pixel();

        for (input, output) in raw.chunks_exact(in_bpp).zip(out.chunks_exact_mut(out_bpp)) {
            match header.image_type {
                ImageType::ColorMapped => {
                    let index = if in_bpp == 2 {
                        usize::from(u16::from_le_bytes([input[0], input[1]]))
                    } else {
                        usize::from(input[0])
                    };
                    let entry = index
                        .checked_sub(usize::from(header.map_first))
                        .and_then(|x| self.palette.get(x))
                        .copied()
                        .unwrap_or([0, 0, 0, 255]);

                    output.copy_from_slice(&entry[..out_bpp]);
                }
                // gray, or gray followed by alpha
                ImageType::Gray => output.copy_from_slice(&input[..out_bpp]),
                ImageType::TrueColor => {
                    let mut rgba = [0; 4];
                    convert_true_color(input, header.depth, out_bpp == 4, &mut rgba);
                    output.copy_from_slice(&rgba[..out_bpp]);
                }
            }
        }
    }
}

/// Convert one little endian BGR(A) pixel of `depth` bits to RGBA.
///
/// The alpha of formats without one is 255, the attribute bit of 16 bit
/// pixels is only used when `use_alpha` is set.
fn convert_true_color(input: &[u8], depth: u8, use_alpha: bool, out: &mut [u8; 4]) {
    match depth {
        15 | 16 => {
            let value = u16::from_le_bytes([input[0], input[1]]);
            let alpha = if depth == 16 && use_alpha && value & 0x8000 == 0 {
                0
            } else {
                255
            };
            *out = [
                scale_5_bits(value >> 10),
                scale_5_bits(value >> 5),
                scale_5_bits(value),
                alpha
            ];
        }
        24 => *out = [input[2], input[1], input[0], 255],
        _ => *out = [input[2], input[1], input[0], input[3]]
    }
}

fn reverse_pixels(row: &mut [u8], bpp: usize) {
    let count = row.len() / bpp;

    for i in 0..count / 2 {
        let j = count - 1 - i;
        let (left, right) = row.split_at_mut(j * bpp);
        left[i * bpp..(i + 1) * bpp].swap_with_slice(&mut right[..bpp]);
    }
}
