/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Chunk level parsing and writing

use std::io::Write;

use imcodec_core::bytestream::ByteWriter;
use imcodec_core::options::DecoderLimits;
use imcodec_core::pixel::PixelType;

use crate::constants::ADAM7_PASSES;
use crate::crc::calc_crc;
use crate::enums::{InterlaceMethod, PngColor};
use crate::error::PngDecodeErrors;

/// Transparency information from a tRNS chunk
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Transparency {
    /// Alpha for the leading palette entries
    Palette(Vec<u8>),
    /// The gray sample that is fully transparent
    Gray(u16),
    /// The RGB samples that are fully transparent
    Rgb([u16; 3])
}

#[derive(Clone, Debug)]
pub struct PngInfo {
    pub width:        usize,
    pub height:       usize,
    pub depth:        u8,
    pub color:        PngColor,
    pub interlace:    InterlaceMethod,
    pub palette:      Vec<[u8; 3]>,
    pub transparency: Option<Transparency>
}

impl PngInfo {
    /// Parse the 13 bytes of an IHDR chunk
    pub fn from_ihdr(data: &[u8], limits: &DecoderLimits) -> Result<PngInfo, PngDecodeErrors> {
        if data.len() != 13 {
            return Err(PngDecodeErrors::GenericStatic("IHDR chunk must be 13 bytes"));
        }
        let width = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
        let height = u32::from_be_bytes([data[4], data[5], data[6], data[7]]) as usize;
        let depth = data[8];

        if width == 0 || height == 0 {
            return Err(PngDecodeErrors::GenericStatic("Zero width or height"));
        }
        if let Err((dimension, value)) = limits.check_dimensions(width, height) {
            let limit = if dimension == "width" {
                limits.get_max_width()
            } else {
                limits.get_max_height()
            };
            return Err(PngDecodeErrors::TooLargeDimensions(dimension, limit, value));
        }
        let color = PngColor::from_int(data[9])
            .ok_or_else(|| format!("Unknown PNG color type {}", data[9]))?;

        if !color.allows_depth(depth) {
            return Err(PngDecodeErrors::Generic(format!(
                "Bit depth {depth} not allowed for {color:?}"
            )));
        }
        if data[10] != 0 {
            return Err(PngDecodeErrors::GenericStatic("Unknown compression method"));
        }
        if data[11] != 0 {
            return Err(PngDecodeErrors::GenericStatic("Unknown filter method"));
        }
        let interlace = InterlaceMethod::from_int(data[12])
            .ok_or(PngDecodeErrors::GenericStatic("Unknown interlace method"))?;

        Ok(PngInfo {
            width,
            height,
            depth,
            color,
            interlace,
            palette: Vec::new(),
            transparency: None
        })
    }

    pub fn set_palette(&mut self, data: &[u8]) -> Result<(), PngDecodeErrors> {
        if data.is_empty() || data.len() % 3 != 0 || data.len() > 256 * 3 {
            return Err(PngDecodeErrors::GenericStatic("Invalid PLTE chunk length"));
        }
        self.palette = data.chunks_exact(3).map(|x| [x[0], x[1], x[2]]).collect();
        Ok(())
    }

    pub fn set_transparency(&mut self, data: &[u8]) -> Result<(), PngDecodeErrors> {
        let transparency = match self.color {
            PngColor::Palette => {
                if data.len() > 256 {
                    return Err(PngDecodeErrors::GenericStatic("tRNS has more entries than the palette"));
                }
                Transparency::Palette(data.to_vec())
            }
            PngColor::Luma if data.len() == 2 => Transparency::Gray(u16::from_be_bytes([data[0], data[1]])),
            PngColor::RGB if data.len() == 6 => Transparency::Rgb([
                u16::from_be_bytes([data[0], data[1]]),
                u16::from_be_bytes([data[2], data[3]]),
                u16::from_be_bytes([data[4], data[5]])
            ]),
            PngColor::LumaA | PngColor::RGBA => {
                return Err(PngDecodeErrors::GenericStatic("tRNS not allowed for images with alpha"));
            }
            _ => return Err(PngDecodeErrors::GenericStatic("Invalid tRNS chunk length"))
        };
        self.transparency = Some(transparency);
        Ok(())
    }

    /// The pixel type decoded images are returned in
    pub fn pixel_type(&self) -> PixelType {
        let base = match (self.color, self.depth == 16) {
            (PngColor::Luma, false) => PixelType::Gray8,
            (PngColor::Luma, true) => PixelType::Gray16,
            (PngColor::RGB, false) | (PngColor::Palette, _) => PixelType::Rgb8,
            (PngColor::RGB, true) => PixelType::Rgb16,
            (PngColor::LumaA, false) => PixelType::GrayAlpha8,
            (PngColor::LumaA, true) => PixelType::GrayAlpha16,
            (PngColor::RGBA, false) => PixelType::Rgba8,
            (PngColor::RGBA, true) => PixelType::Rgba16
        };
        if self.transparency.is_some() {
            base.with_alpha()
        } else {
            base
        }
    }

    /// Bytes between a byte and the same byte of the pixel to its left
    pub fn filter_bpp(&self) -> usize {
        (self.color.num_components() * usize::from(self.depth)).div_ceil(8)
    }

    /// Bytes in a packed row of `width` pixels, without the filter byte
    pub fn row_bytes(&self, width: usize) -> usize {
        (width * self.color.num_components() * usize::from(self.depth)).div_ceil(8)
    }

    /// Dimensions of the sub images making up the image data, a single
    /// one for non-interlaced images
    pub fn passes(&self) -> Vec<(usize, usize)> {
        match self.interlace {
            InterlaceMethod::Standard => vec![(self.width, self.height)],
            InterlaceMethod::Adam7 => ADAM7_PASSES
                .iter()
                .map(|(x0, y0, dx, dy)| {
                    (
                        (self.width + dx - 1 - x0) / dx,
                        (self.height + dy - 1 - y0) / dy
                    )
                })
                .collect()
        }
    }

    /// Size of the inflated image data, filter bytes included
    pub fn inflated_size(&self) -> Option<usize> {
        let mut total = 0_usize;

        for (width, height) in self.passes() {
            if width == 0 || height == 0 {
                continue;
            }
            let row = self.row_bytes(width).checked_add(1)?;
            total = total.checked_add(row.checked_mul(height)?)?;
        }
        Some(total)
    }
}

/// Write a chunk, its length and CRC
pub fn write_chunk<W: Write + ?Sized>(
    writer: &mut ByteWriter<W>, name: &[u8; 4], data: &[u8]
) -> Result<(), imcodec_core::bytestream::ByteIoError> {
    writer.write_u32_be_err(data.len() as u32)?;
    writer.write_all(name)?;
    writer.write_all(data)?;
    writer.write_u32_be_err(calc_crc(name, data))?;
    Ok(())
}
