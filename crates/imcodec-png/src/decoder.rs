/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use std::io::Read;

use imcodec_core::bytestream::{ByteIoError, ByteReader};
use imcodec_core::monitor::{Rect, RowMonitor};
use imcodec_core::options::DecoderLimits;
use imcodec_core::pixel::PixelType;
use imcodec_core::utils::expand_bits_to_byte;
use log::{trace, warn};
use zune_inflate::{DeflateDecoder, DeflateOptions};

use crate::constants::{
    ADAM7_PASSES, IDAT_READ_STEP, IHDR_LENGTH, MAX_CHUNK_LENGTH, MAX_HEADER_SCAN, MAX_PLTE_LENGTH, MAX_TRNS_LENGTH,
    PNG_SIGNATURE
};
use crate::crc::calc_crc;
use crate::enums::{FilterMethod, InterlaceMethod, PngColor};
use crate::error::PngDecodeErrors;
use crate::filters::unfilter_row;
use crate::headers::{PngInfo, Transparency};

/// Returns true if `bytes` start with the PNG signature
pub fn probe_png(bytes: &[u8]) -> bool {
    bytes.starts_with(&PNG_SIGNATURE)
}

/// A PNG decoder
///
/// # Usage
/// ```no_run
/// use imcodec_core::bytestream::ByteReader;
/// use imcodec_core::monitor::NoopMonitor;
/// use imcodec_png::PngDecoder;
///
/// let file = std::fs::File::open("image.png").unwrap();
/// let mut stream = ByteReader::new(file);
/// let mut decoder = PngDecoder::new(&mut stream);
///
/// decoder.decode_headers().unwrap();
/// let (width, height) = decoder.dimensions().unwrap();
/// let pixels = decoder.decode(&mut NoopMonitor).unwrap();
///
/// assert_eq!(pixels.len(), width * height * decoder.pixel_type().unwrap().bytes_per_pixel());
/// ```
pub struct PngDecoder<'r, R: Read + ?Sized> {
    stream: &'r mut ByteReader<R>,
    limits: DecoderLimits,
    info:   Option<PngInfo>
}

impl<'r, R: Read + ?Sized> PngDecoder<'r, R> {
    pub fn new(stream: &'r mut ByteReader<R>) -> PngDecoder<'r, R> {
        PngDecoder::new_with_limits(stream, DecoderLimits::default())
    }

    pub fn new_with_limits(stream: &'r mut ByteReader<R>, limits: DecoderLimits) -> PngDecoder<'r, R> {
        PngDecoder {
            stream,
            limits,
            info: None
        }
    }

    /// Read every chunk up to the first IDAT.
    ///
    /// Chunks are peeked, not consumed, so the stream position is unchanged
    /// and calling this again is a no-op.
    pub fn decode_headers(&mut self) -> Result<(), PngDecodeErrors> {
        if self.info.is_some() {
            return Ok(());
        }
        if self.stream.peek_at(0, 8)? != PNG_SIGNATURE {
            return Err(PngDecodeErrors::BadSignature);
        }
        let mut offset = PNG_SIGNATURE.len();
        let mut info: Option<PngInfo> = None;

        loop {
            if offset > MAX_HEADER_SCAN {
                return Err(PngDecodeErrors::GenericStatic("No image data found in the first chunks"));
            }
            let header = self.stream.peek_at(offset, 8)?;
            let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
            let name = [header[4], header[5], header[6], header[7]];

            if length > MAX_CHUNK_LENGTH {
                return Err(PngDecodeErrors::Generic(format!(
                    "Chunk length {length} exceeds the maximum allowed"
                )));
            }
            let length = length as usize;

            trace!("Chunk {} of length {}", String::from_utf8_lossy(&name), length);

            let Some(png_info) = info.as_mut() else {
                if &name != b"IHDR" {
                    return Err(PngDecodeErrors::GenericStatic("First chunk is not IHDR"));
                }
                let data = self.chunk_data(offset, &name, length)?;
                info = Some(PngInfo::from_ihdr(&data, &self.limits)?);
                offset += length + 12;
                continue;
            };
            match &name {
                b"IHDR" => {
                    return Err(PngDecodeErrors::GenericStatic("Multiple IHDR chunks"));
                }
                b"PLTE" => {
                    let data = self.chunk_data(offset, &name, length)?;
                    if png_info.color == PngColor::Palette {
                        png_info.set_palette(&data)?;
                    }
                }
                b"tRNS" => {
                    let data = self.chunk_data(offset, &name, length)?;
                    if let Err(e) = png_info.set_transparency(&data) {
                        if self.limits.get_strict_mode() {
                            return Err(e);
                        }
                        warn!("Ignoring tRNS chunk: {:?}", e);
                    }
                }
                b"IDAT" => break,
                b"IEND" => {
                    return Err(PngDecodeErrors::GenericStatic("No IDAT chunk before IEND"));
                }
                _ => {
                    // bit 5 of the first byte is clear for critical chunks
                    if name[0] & 0x20 == 0 {
                        return Err(PngDecodeErrors::Generic(format!(
                            "Unknown critical chunk {}",
                            String::from_utf8_lossy(&name)
                        )));
                    }
                }
            }
            offset += length + 12;
        }
        let info = info.ok_or(PngDecodeErrors::GenericStatic("Missing IHDR chunk"))?;

        if info.color == PngColor::Palette && info.palette.is_empty() {
            return Err(PngDecodeErrors::GenericStatic("Palette image without a PLTE chunk"));
        }
        trace!("Width: {}", info.width);
        trace!("Height: {}", info.height);
        trace!("Color: {:?}, depth: {}", info.color, info.depth);
        trace!("Interlace: {:?}", info.interlace);

        self.info = Some(info);
        Ok(())
    }

    /// Peek the data of the chunk starting at `offset` and check its CRC
    fn chunk_data(&mut self, offset: usize, name: &[u8; 4], length: usize) -> Result<Vec<u8>, PngDecodeErrors> {
        check_chunk_length(name, length)?;

        let bytes = self.stream.peek_at(offset + 8, length + 4)?;
        let (data, crc) = bytes.split_at(length);
        let stored = u32::from_be_bytes([crc[0], crc[1], crc[2], crc[3]]);
        let data = data.to_vec();

        self.verify_crc(name, &data, stored)?;
        Ok(data)
    }

    fn verify_crc(&self, name: &[u8; 4], data: &[u8], stored: u32) -> Result<(), PngDecodeErrors> {
        let computed = calc_crc(name, data);

        if computed != stored {
            if self.limits.get_strict_mode() {
                return Err(PngDecodeErrors::BadCrc(*name, stored, computed));
            }
            warn!(
                "CRC mismatch in {} chunk, continuing",
                String::from_utf8_lossy(name)
            );
        }
        Ok(())
    }

    /// Image dimensions as (width, height), or `None` before
    /// the headers are decoded
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        self.info.as_ref().map(|info| (info.width, info.height))
    }

    /// The pixel type of decoded pixels
    pub fn pixel_type(&self) -> Option<PixelType> {
        self.info.as_ref().map(PngInfo::pixel_type)
    }

    /// Whether the image is stored Adam7 interlaced
    pub fn is_interlaced(&self) -> Option<bool> {
        self.info
            .as_ref()
            .map(|info| info.interlace == InterlaceMethod::Adam7)
    }

    pub fn output_buf_size(&self) -> Option<usize> {
        let info = self.info.as_ref()?;

        info.width
            .checked_mul(info.height)?
            .checked_mul(info.pixel_type().bytes_per_pixel())
    }

    /// Decode the image, returning pixels top row first in the layout
    /// reported by [`pixel_type`](Self::pixel_type).
    ///
    /// The stream is consumed up to and including the IEND chunk.
    pub fn decode(&mut self, monitor: &mut dyn RowMonitor) -> Result<Vec<u8>, PngDecodeErrors> {
        self.decode_headers()?;

        let info = self
            .info
            .clone()
            .ok_or(PngDecodeErrors::GenericStatic("Headers not decoded"))?;
        let size = self
            .output_buf_size()
            .ok_or(PngDecodeErrors::GenericStatic("Image dimensions overflow"))?;
        let inflated_size = info
            .inflated_size()
            .ok_or(PngDecodeErrors::GenericStatic("Image dimensions overflow"))?;

        if !monitor.rows_done(0, info.height, None) {
            return Err(PngDecodeErrors::Interrupted);
        }
        self.stream.skip(PNG_SIGNATURE.len())?;

        let idat = self.read_idat_chunks()?;
        let mut raw = self.inflate(&idat, inflated_size)?;

        if raw.len() < inflated_size {
            let msg = format!(
                "Image data too short, expected {inflated_size} bytes but found {}",
                raw.len()
            );
            if self.limits.get_strict_mode() {
                return Err(PngDecodeErrors::Generic(msg));
            }
            warn!("{}", msg);
            raw.resize(inflated_size, 0);
        }
        let mut output = vec![0_u8; size];

        match info.interlace {
            InterlaceMethod::Standard => decode_pass(&info, &raw, info.width, info.height, |y, row| {
                let stride = row.len();
                output[y * stride..(y + 1) * stride].copy_from_slice(row);

                monitor.rows_done(y + 1, info.height, Some(Rect::new(0, y, info.width, 1)))
            })?,
            InterlaceMethod::Adam7 => {
                let out_bpp = info.pixel_type().bytes_per_pixel();
                let out_stride = info.width * out_bpp;
                let mut offset = 0;

                for (pass, ((x0, y0, dx, dy), (width, height))) in
                    ADAM7_PASSES.iter().zip(info.passes()).enumerate()
                {
                    if width == 0 || height == 0 {
                        continue;
                    }
                    let pass_size = (info.row_bytes(width) + 1) * height;

                    decode_pass(&info, &raw[offset..], width, height, |j, row| {
                        let y = y0 + j * dy;

                        for (i, pixel) in row.chunks_exact(out_bpp).enumerate() {
                            let start = y * out_stride + (x0 + i * dx) * out_bpp;
                            output[start..start + out_bpp].copy_from_slice(pixel);
                        }
                        true
                    })?;
                    offset += pass_size;

                    let done = info.height * (pass + 1) / ADAM7_PASSES.len();
                    let dirty = Rect::new(0, 0, info.width, info.height);

                    if !monitor.rows_done(done, info.height, Some(dirty)) {
                        return Err(PngDecodeErrors::Interrupted);
                    }
                }
            }
        }
        Ok(output)
    }

    /// Consume chunks until IEND, returning the concatenated IDAT data
    fn read_idat_chunks(&mut self) -> Result<Vec<u8>, PngDecodeErrors> {
        let mut idat = Vec::new();

        loop {
            let (length, name) = match self.read_chunk_header() {
                Ok(header) => header,
                Err(e) if e.is_truncation() && !idat.is_empty() && !self.limits.get_strict_mode() => {
                    warn!("Stream ended before IEND chunk");
                    break;
                }
                Err(e) => return Err(e.into())
            };
            match &name {
                b"IDAT" => {
                    let start = idat.len();
                    let mut remaining = length;

                    // extend as the bytes arrive, the declared length is untrusted
                    while remaining > 0 {
                        let step = remaining.min(IDAT_READ_STEP);
                        let end = idat.len();
                        idat.resize(end + step, 0);
                        self.stream.read_exact_bytes(&mut idat[end..])?;
                        remaining -= step;
                    }

                    let stored = self.stream.get_u32_be_err()?;
                    self.verify_crc(&name, &idat[start..], stored)?;
                }
                b"IEND" => {
                    self.stream.skip(length + 4)?;
                    break;
                }
                _ => self.stream.skip(length + 4)?
            }
        }
        Ok(idat)
    }

    fn read_chunk_header(&mut self) -> Result<(usize, [u8; 4]), ByteIoError> {
        let length = self.stream.get_u32_be_err()?;

        if length > MAX_CHUNK_LENGTH {
            return Err("Chunk length exceeds the maximum allowed".into());
        }
        let name = self.stream.read_fixed_bytes_or_error::<4>()?;
        Ok((length as usize, name))
    }

    fn inflate(&self, idat: &[u8], size_hint: usize) -> Result<Vec<u8>, PngDecodeErrors> {
        let options = DeflateOptions::default()
            .set_size_hint(size_hint)
            .set_limit(size_hint.saturating_add(size_hint / 8).max(1024))
            .set_confirm_checksum(self.limits.get_strict_mode());

        let mut decoder = DeflateDecoder::new_with_options(idat, options);

        decoder.decode_zlib().map_err(PngDecodeErrors::ZlibDecodeErrors)
    }
}

/// Reject chunk lengths the chunk type cannot legally have
fn check_chunk_length(name: &[u8; 4], length: usize) -> Result<(), PngDecodeErrors> {
    let valid = match name {
        b"IHDR" => length == IHDR_LENGTH,
        b"PLTE" => length <= MAX_PLTE_LENGTH && length % 3 == 0,
        b"tRNS" => length <= MAX_TRNS_LENGTH,
        _ => true
    };
    if !valid {
        return Err(PngDecodeErrors::Generic(format!(
            "Invalid length {length} for {} chunk",
            String::from_utf8_lossy(name)
        )));
    }
    Ok(())
}

/// Unfilter the rows of one (sub) image, calling `on_row` with each
/// row converted to the output pixel type.
///
/// `on_row` returning false stops decoding
fn decode_pass(
    info: &PngInfo, raw: &[u8], width: usize, height: usize,
    mut on_row: impl FnMut(usize, &[u8]) -> bool
) -> Result<(), PngDecodeErrors> {
    let row_bytes = info.row_bytes(width);
    let bpp = info.filter_bpp();

    let mut prev = vec![0_u8; row_bytes];
    let mut current = vec![0_u8; row_bytes];
    let mut samples = vec![0_u8; width];
    let mut expanded = vec![0_u8; width * info.pixel_type().bytes_per_pixel()];

    for (y, filtered) in raw.chunks_exact(row_bytes + 1).take(height).enumerate() {
        let filter = FilterMethod::from_int(filtered[0]).ok_or_else(|| {
            PngDecodeErrors::Generic(format!("Unknown filter type {} in row {y}", filtered[0]))
        })?;
        current.copy_from_slice(&filtered[1..]);
        unfilter_row(filter, &prev, &mut current, bpp);

        expand_row(info, &current, &mut samples, &mut expanded);

        if !on_row(y, &expanded) {
            return Err(PngDecodeErrors::Interrupted);
        }
        std::mem::swap(&mut prev, &mut current);
    }
    Ok(())
}

/// Convert one unfiltered row to the output pixel type
fn expand_row(info: &PngInfo, packed: &[u8], samples: &mut [u8], out: &mut [u8]) {
    let source = if info.depth < 8 {
        expand_bits_to_byte(usize::from(info.depth), false, packed, samples);
        &*samples
    } else {
        packed
    };
    let key = match &info.transparency {
        Some(Transparency::Gray(gray)) => Some([*gray, 0, 0]),
        Some(Transparency::Rgb(rgb)) => Some(*rgb),
        _ => None
    };
    let components = info.color.num_components();
    let out_components = components + usize::from(key.is_some());

    match info.color {
        PngColor::Palette => {
            let alpha = match &info.transparency {
                Some(Transparency::Palette(alpha)) => Some(alpha.as_slice()),
                _ => None
            };
            let out_n = if alpha.is_some() { 4 } else { 3 };

            for (index, pixel) in source.iter().zip(out.chunks_exact_mut(out_n)) {
                let index = usize::from(*index);
                let entry = info.palette.get(index).copied().unwrap_or([0; 3]);

                pixel[..3].copy_from_slice(&entry);

                if let Some(alpha) = alpha {
                    pixel[3] = alpha.get(index).copied().unwrap_or(255);
                }
            }
        }
        _ if info.depth == 16 => {
            for (input, pixel) in source
                .chunks_exact(components * 2)
                .zip(out.chunks_exact_mut(out_components * 2))
            {
                let mut opaque = false;

                for (c, (out_sample, in_sample)) in pixel
                    .chunks_exact_mut(2)
                    .zip(input.chunks_exact(2))
                    .enumerate()
                {
                    let value = u16::from_be_bytes([in_sample[0], in_sample[1]]);
                    out_sample.copy_from_slice(&value.to_ne_bytes());

                    if let Some(key) = key {
                        opaque |= key[c] != value;
                    }
                }
                if key.is_some() {
                    let alpha: u16 = if opaque { u16::MAX } else { 0 };
                    pixel[components * 2..].copy_from_slice(&alpha.to_ne_bytes());
                }
            }
        }
        _ => {
            // only gray goes below eight bits
            let scale = match info.depth {
                1 => 255,
                2 => 85,
                4 => 17,
                _ => 1
            };
            for (input, pixel) in source
                .chunks_exact(components)
                .zip(out.chunks_exact_mut(out_components))
            {
                for (out_sample, in_sample) in pixel.iter_mut().zip(input) {
                    *out_sample = in_sample.wrapping_mul(scale);
                }
                if let Some(key) = key {
                    let opaque = input
                        .iter()
                        .zip(key.iter())
                        .any(|(sample, key)| u16::from(*sample) != *key);

                    pixel[components] = if opaque { 255 } else { 0 };
                }
            }
        }
    }
}
