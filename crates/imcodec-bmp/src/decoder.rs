/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

// BMP has been extended multiple times, the variants we understand are
// told apart by the size of the information header that follows the
// 14 byte file header.
//
// - 12 bytes: OS/2 v1 and Windows v2. 16 bit dimensions, BGR palette entries.
// - 16 and 64 bytes: OS/2 v2, treated like the Windows v3 header.
// - 40 bytes: Windows v3. Adds compression and palette size. With BITFIELDS
//   compression three (or four) masks follow the header.
// - 52 and 56 bytes: v3 with the masks folded into the header.
// - 108 and 124 bytes: v4 and v5, masks are part of the header and color
//   space information follows.
//
// Headers are parsed from the reader's look-ahead window and never consumed,
// so identification leaves the stream where it found it.

use std::io::Read;

use imcodec_core::bytestream::{ByteIoError, ByteReader};
use imcodec_core::monitor::{Rect, RowMonitor};
use imcodec_core::options::DecoderLimits;
use imcodec_core::pixel::PixelType;
use imcodec_core::utils::expand_bits_to_byte;
use log::{trace, warn};

use crate::common::{padded_stride, Bitfield, CompressionMethod, FILE_HEADER_SIZE};
use crate::BmpDecoderErrors;

/// Probe some bytes to see
/// if they consist of a BMP image
pub fn probe_bmp(bytes: &[u8]) -> bool {
    if let Some(magic_bytes) = bytes.get(0..2) {
        if magic_bytes == b"BM" {
            // skip file_size   -> 4
            // skip reserved    -> 4
            // skip data offset -> 4
            // read information header size
            if let Some(sz) = bytes.get(14..18) {
                let sz = u32::from_le_bytes([sz[0], sz[1], sz[2], sz[3]]);

                return matches!(sz, 12 | 16 | 40 | 52 | 56 | 64 | 108 | 124);
            }
        }
    }
    false
}

/// Everything learned from the headers
#[derive(Clone, Debug)]
struct BmpInfo {
    width:           usize,
    height:          usize,
    flip_vertically: bool,
    depth:           u16,
    compression:     CompressionMethod,
    data_offset:     usize,
    masks:           [Bitfield; 4],
    palette:         Vec<[u8; 3]>,
    pixel_type:      PixelType
}

/// A BMP decoder.
///
/// # Usage
/// The decoder can be used to read image information and or get the pixels out of a valid bmp
/// image.
///
/// ```no_run
/// use imcodec_bmp::BmpDecoder;
/// use imcodec_core::bytestream::ByteReader;
/// use imcodec_core::monitor::NoopMonitor;
///
/// fn main() -> Result<(), imcodec_bmp::BmpDecoderErrors> {
///     let mut source = ByteReader::new(&b"BM"[..]);
///     let mut decoder = BmpDecoder::new(&mut source);
///     decoder.decode_headers()?;
///     // after decoding headers, we can safely access the image metadata
///     let (w, h) = decoder.dimensions().unwrap();
///     println!("Image width: {}\t Image height: {}", w, h);
///
///     let pixels = decoder.decode(&mut NoopMonitor)?;
///     println!("Pixels length:{}", pixels.len());
///     Ok(())
/// }
/// ```
pub struct BmpDecoder<'r, R: Read + ?Sized> {
    stream: &'r mut ByteReader<R>,
    limits: DecoderLimits,
    info:   Option<BmpInfo>
}

impl<'r, R: Read + ?Sized> BmpDecoder<'r, R> {
    /// Create a new bmp decoder that reads data from `stream`
    pub fn new(stream: &'r mut ByteReader<R>) -> BmpDecoder<'r, R> {
        BmpDecoder::new_with_limits(stream, DecoderLimits::default())
    }

    /// Create a new decoder instance with specified limits
    pub fn new_with_limits(stream: &'r mut ByteReader<R>, limits: DecoderLimits) -> BmpDecoder<'r, R> {
        BmpDecoder {
            stream,
            limits,
            info: None
        }
    }

    /// Decode headers stored in the bmp file and store
    /// information in the decode context
    ///
    /// The headers are only peeked, calling this repeatedly is cheap and
    /// does not move the stream.
    pub fn decode_headers(&mut self) -> Result<(), BmpDecoderErrors> {
        if self.info.is_some() {
            return Ok(());
        }
        let fixed = self.stream.peek_at(0, 18)?;

        if &fixed[0..2] != b"BM" {
            return Err(BmpDecoderErrors::InvalidMagicBytes);
        }
        let data_offset = u32::from_le_bytes([fixed[10], fixed[11], fixed[12], fixed[13]]) as usize;
        let ihsize = u32::from_le_bytes([fixed[14], fixed[15], fixed[16], fixed[17]]) as usize;

        if !matches!(ihsize, 12 | 16 | 40 | 52 | 56 | 64 | 108 | 124) {
            return Err(BmpDecoderErrors::Generic(format!(
                "Unknown information header size {ihsize}"
            )));
        }
        if ihsize + FILE_HEADER_SIZE > data_offset {
            return Err(BmpDecoderErrors::GenericStatic("Invalid header size"));
        }
        let header = self.stream.peek_at(FILE_HEADER_SIZE, ihsize)?.to_vec();
        let mut cursor = ByteReader::new(&header[4..]);

        let (width, height): (i64, i64) = if ihsize == 12 {
            (
                i64::from(cursor.get_u16_le_err()?),
                i64::from(cursor.get_u16_le_err()?)
            )
        } else {
            (
                i64::from(cursor.get_i32_le_err()?),
                i64::from(cursor.get_i32_le_err()?)
            )
        };
        if width <= 0 {
            return Err(BmpDecoderErrors::GenericStatic("Width is zero or negative, invalid image"));
        }
        if height == 0 {
            return Err(BmpDecoderErrors::GenericStatic("Height is zero, invalid image"));
        }
        // positive heights are stored bottom-up
        let flip_vertically = height > 0;
        let width = width as usize;
        let height = height.unsigned_abs() as usize;

        if let Err((dimension, value)) = self.limits.check_dimensions(width, height) {
            let limit = if dimension == "width" {
                self.limits.get_max_width()
            } else {
                self.limits.get_max_height()
            };
            return Err(BmpDecoderErrors::TooLargeDimensions(dimension, limit, value));
        }
        trace!("Width: {}", width);
        trace!("Height: {}", height);

        // planes
        if cursor.get_u16_le_err()? != 1 {
            return Err(BmpDecoderErrors::GenericStatic("Invalid BMP header"));
        }
        let depth = cursor.get_u16_le_err()?;

        let compression = if ihsize >= 20 {
            let method = cursor.get_u32_le_err()?;

            CompressionMethod::from_u32(method).ok_or_else(|| {
                BmpDecoderErrors::Generic(format!("Unsupported BMP compression scheme {method}"))
            })?
        } else {
            CompressionMethod::Rgb
        };
        // image size, resolution
        let mut colors_used = 0;

        if ihsize >= 36 {
            cursor.skip(12)?;
            colors_used = cursor.get_u32_le_err()? as usize;
        }

        match (compression, depth) {
            (CompressionMethod::Rgb, 1 | 2 | 4 | 8 | 16 | 24 | 32)
            | (CompressionMethod::Rle8, 8)
            | (CompressionMethod::Rle4, 4)
            | (CompressionMethod::Bitfields | CompressionMethod::AlphaBitfields, 16 | 32) => {}
            _ => {
                return Err(BmpDecoderErrors::Generic(format!(
                    "Depth {depth} unsupported for compression {compression:?}"
                )));
            }
        }
        if depth == 2 {
            warn!("Depth of 2 not officially supported");
        }

        // channel masks, either inside the header or right after it
        let mut palette_offset = FILE_HEADER_SIZE + ihsize;
        let mut raw_masks = [0_u32; 4];

        if compression.has_masks() {
            let mask_count = if compression == CompressionMethod::AlphaBitfields {
                4
            } else {
                3
            };
            if ihsize >= 52 {
                let mut masks = ByteReader::new(&header[40..]);
                let present = if ihsize >= 56 { 4 } else { 3 };

                for mask in raw_masks.iter_mut().take(present) {
                    *mask = masks.get_u32_le_err()?;
                }
            } else {
                let bytes = self.stream.peek_at(palette_offset, mask_count * 4)?;
                let mut masks = ByteReader::new(bytes);

                for mask in raw_masks.iter_mut().take(mask_count) {
                    *mask = masks.get_u32_le_err()?;
                }
                palette_offset += mask_count * 4;
            }
        } else if depth == 16 {
            raw_masks = [0x7C00, 0x03E0, 0x001F, 0];
        }
        let masks = raw_masks.map(Bitfield::from_mask);

        let mut palette = Vec::new();

        if depth <= 8 {
            let max_colors = 1_usize << depth;
            let mut colors = max_colors;

            if colors_used > max_colors {
                let msg = format!("Incorrect number of colors {colors_used} for depth {depth}");
                if self.limits.get_strict_mode() {
                    return Err(BmpDecoderErrors::Generic(msg));
                }
                warn!("{}", msg);
            } else if colors_used != 0 {
                colors = colors_used;
            }
            // OS/2 bitmaps use 3 bytes per palette entry
            let entry_size = if ihsize == 12 { 3 } else { 4 };
            let room = data_offset.saturating_sub(palette_offset) / entry_size;

            if room < colors {
                warn!("Palette truncated from {} to {} entries", colors, room);
                colors = room;
            }
            if colors == 0 {
                return Err(BmpDecoderErrors::GenericStatic("Missing palette for palette image"));
            }
            let entries = self.stream.peek_at(palette_offset, colors * entry_size)?;

            palette = entries
                .chunks_exact(entry_size)
                .map(|entry| [entry[2], entry[1], entry[0]])
                .collect();
        }

        let pixel_type = match depth {
            1 | 2 | 4 | 8 => {
                if palette.iter().all(|[r, g, b]| r == g && g == b) {
                    PixelType::Gray8
                } else {
                    PixelType::Rgb8
                }
            }
            16 | 32 if masks[3].is_present() => PixelType::Rgba8,
            _ => PixelType::Rgb8
        };

        trace!("Pixel type : {:?}", pixel_type);
        trace!("Compression  : {:?}", compression);
        trace!("Bit depth: {:?}", depth);

        self.info = Some(BmpInfo {
            width,
            height,
            flip_vertically,
            depth,
            compression,
            data_offset,
            masks,
            palette,
            pixel_type
        });
        Ok(())
    }

    /// Get dimensions of the image
    ///
    /// This is a tuple of width,height
    ///
    /// # Returns
    /// - `Some((width,height))`  - The image dimensions
    /// - `None`: Indicates that the image headers weren't decoded
    ///    or an error occurred during decoding the headers
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        self.info.as_ref().map(|info| (info.width, info.height))
    }

    /// Get the pixel type decoded pixels will be in, or none if the
    /// headers weren't decoded
    pub fn pixel_type(&self) -> Option<PixelType> {
        self.info.as_ref().map(|info| info.pixel_type)
    }

    /// Return the expected size of the output buffer
    ///
    /// Returns `None` if headers haven't been decoded or if calculation overflows
    pub fn output_buf_size(&self) -> Option<usize> {
        let info = self.info.as_ref()?;

        info.width
            .checked_mul(info.height)?
            .checked_mul(info.pixel_type.bytes_per_pixel())
    }

    /// Decode an image returning the decoded bytes, top row first,
    /// in the pixel type reported by [`pixel_type`](Self::pixel_type).
    ///
    /// The stream is consumed up to the end of the pixel data.
    pub fn decode(&mut self, monitor: &mut dyn RowMonitor) -> Result<Vec<u8>, BmpDecoderErrors> {
        self.decode_headers()?;

        let info = self
            .info
            .clone()
            .ok_or(BmpDecoderErrors::GenericStatic("Headers not decoded"))?;
        let size = self
            .output_buf_size()
            .ok_or(BmpDecoderErrors::OverFlowOccurred)?;

        if !monitor.rows_done(0, info.height, None) {
            return Err(BmpDecoderErrors::Interrupted);
        }
        self.stream.skip(info.data_offset)?;

        let mut output = vec![0_u8; size];

        if info.compression.is_rle() {
            let indices = self.decode_rle(&info, monitor)?;
            let out_stride = info.width * info.pixel_type.bytes_per_pixel();

            for (index_row, out_row) in indices
                .chunks_exact(info.width)
                .zip(output.chunks_exact_mut(out_stride))
            {
                expand_palette(&info, index_row, out_row);
            }
        } else {
            self.decode_uncompressed(&info, &mut output, monitor)?;
        }
        Ok(output)
    }

    fn decode_uncompressed(
        &mut self, info: &BmpInfo, output: &mut [u8], monitor: &mut dyn RowMonitor
    ) -> Result<(), BmpDecoderErrors> {
        let in_stride = padded_stride(info.width, usize::from(info.depth))
            .ok_or(BmpDecoderErrors::OverFlowOccurred)?;
        let out_stride = info.width * info.pixel_type.bytes_per_pixel();

        let mut row = vec![0_u8; in_stride];
        let mut indices = vec![0_u8; info.width];

        for i in 0..info.height {
            self.stream.read_exact_bytes(&mut row)?;

            let y = if info.flip_vertically {
                info.height - 1 - i
            } else {
                i
            };
            let out_row = &mut output[y * out_stride..(y + 1) * out_stride];

            match info.depth {
                1 | 2 | 4 => {
                    expand_bits_to_byte(usize::from(info.depth), false, &row, &mut indices);
                    expand_palette(info, &indices, out_row);
                }
                8 => expand_palette(info, &row[..info.width], out_row),
                16 => {
                    let pixels = row
                        .chunks_exact(2)
                        .map(|px| u32::from(u16::from_le_bytes([px[0], px[1]])));
                    write_masked(info, pixels, out_row);
                }
                24 => {
                    for (pixel, out) in row.chunks_exact(3).zip(out_row.chunks_exact_mut(3)) {
                        out.copy_from_slice(&[pixel[2], pixel[1], pixel[0]]);
                    }
                }
                _ => {
                    if info.compression.has_masks() {
                        let pixels = row
                            .chunks_exact(4)
                            .map(|px| u32::from_le_bytes([px[0], px[1], px[2], px[3]]));
                        write_masked(info, pixels, out_row);
                    } else {
                        // BGRX, the fourth byte is unused
                        for (pixel, out) in row.chunks_exact(4).zip(out_row.chunks_exact_mut(3)) {
                            out.copy_from_slice(&[pixel[2], pixel[1], pixel[0]]);
                        }
                    }
                }
            }
            if !monitor.rows_done(i + 1, info.height, Some(Rect::new(0, y, info.width, 1))) {
                return Err(BmpDecoderErrors::Interrupted);
            }
        }
        Ok(())
    }

    /// Decode RLE4 and RLE8 data into palette indices, one byte per pixel,
    /// top row first
    fn decode_rle(
        &mut self, info: &BmpInfo, monitor: &mut dyn RowMonitor
    ) -> Result<Vec<u8>, BmpDecoderErrors> {
        let (width, height) = (info.width, info.height);
        let is_rle8 = info.compression == CompressionMethod::Rle8;

        let mut indices = vec![0_u8; width * height];
        let mut absolute = Vec::with_capacity(256);

        let mut x = 0_usize;
        let mut line = 0_usize;

        let set = |indices: &mut [u8], x: usize, line: usize, value: u8| {
            if x < width && line < height {
                let row = if info.flip_vertically {
                    height - 1 - line
                } else {
                    line
                };
                indices[row * width + x] = value;
            }
        };

        while line < height {
            let (count, value) = match self.read_rle_pair() {
                Ok(pair) => pair,
                Err(e) if e.is_truncation() && !self.limits.get_strict_mode() => {
                    warn!("RLE data ended before the end of bitmap marker");
                    break;
                }
                Err(e) => return Err(e.into())
            };
            if count > 0 {
                // encoded run
                for k in 0..usize::from(count) {
                    let index = if is_rle8 {
                        value
                    } else if k % 2 == 0 {
                        value >> 4
                    } else {
                        value & 0x0F
                    };
                    set(&mut indices, x, line, index);
                    x += 1;
                }
                continue;
            }
            match value {
                0 => {
                    // end of line
                    x = 0;
                    line += 1;
                    if !monitor.rows_done(line.min(height), height, None) {
                        return Err(BmpDecoderErrors::Interrupted);
                    }
                }
                1 => break,
                2 => {
                    let (dx, dy) = self.read_rle_pair()?;
                    x += usize::from(dx);
                    line += usize::from(dy);
                }
                n => {
                    let n = usize::from(n);
                    let bytes = if is_rle8 { n } else { n.div_ceil(2) };
                    // absolute runs are padded to a 16 bit boundary
                    absolute.resize(bytes + (bytes & 1), 0);
                    self.stream.read_exact_bytes(&mut absolute)?;

                    for k in 0..n {
                        let index = if is_rle8 {
                            absolute[k]
                        } else if k % 2 == 0 {
                            absolute[k / 2] >> 4
                        } else {
                            absolute[k / 2] & 0x0F
                        };
                        set(&mut indices, x, line, index);
                        x += 1;
                    }
                }
            }
        }
        Ok(indices)
    }

    fn read_rle_pair(&mut self) -> Result<(u8, u8), ByteIoError> {
        let [first, second] = self.stream.read_fixed_bytes_or_error::<2>()?;
        Ok((first, second))
    }
}

/// Map palette indices to output pixels, out of range indices become black
fn expand_palette(info: &BmpInfo, indices: &[u8], out: &mut [u8]) {
    const BLACK: [u8; 3] = [0, 0, 0];

    match info.pixel_type {
        PixelType::Gray8 => {
            for (index, out) in indices.iter().zip(out.iter_mut()) {
                *out = info.palette.get(usize::from(*index)).unwrap_or(&BLACK)[0];
            }
        }
        _ => {
            for (index, out) in indices.iter().zip(out.chunks_exact_mut(3)) {
                out.copy_from_slice(info.palette.get(usize::from(*index)).unwrap_or(&BLACK));
            }
        }
    }
}

/// Write pixels described by channel masks
fn write_masked(info: &BmpInfo, pixels: impl Iterator<Item = u32>, out: &mut [u8]) {
    let [red, green, blue, alpha] = info.masks;
    let components = info.pixel_type.components();

    for (pixel, out) in pixels.zip(out.chunks_exact_mut(components)) {
        out[0] = red.extract(pixel);
        out[1] = green.extract(pixel);
        out[2] = blue.extract(pixel);
        if components == 4 {
            out[3] = alpha.extract(pixel);
        }
    }
}
