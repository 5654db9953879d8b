/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Conversion between pixel types
//!
//! Identical layouts are copied byte for byte. Everything else passes
//! through one intermediate, a row of `f32` RGBA values scaled to 0.0-1.0:
//!
//! - gray expands to equal red, green and blue, a missing alpha becomes opaque
//! - between integer (sRGB) and float (linear) types the transfer curve is applied
//! - gray outputs use Rec. 601 luma weights
//! - integer outputs are clamped to the valid range and rounded to nearest
use imcodec_core::pixel::{BitDepth, ChannelRole, PixelDescriptor, PixelType, Transfer};

use crate::buffer::{PixelBuffer, PixelSource, PixelViewMut};
use crate::errors::ImageErrors;
use crate::pool::float_pool;

/// Decode an sRGB encoded value to linear light
pub fn srgb_to_linear(value: f32) -> f32 {
    if value <= 0.04045 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

/// Encode a linear light value with the sRGB curve
pub fn linear_to_srgb(value: f32) -> f32 {
    if value <= 0.003_130_8 {
        value * 12.92
    } else {
        1.055 * value.powf(1.0 / 2.4) - 0.055
    }
}

#[inline]
fn read_sample(pixel: &[u8], channel: usize, depth: BitDepth) -> f32 {
    match depth {
        BitDepth::Eight => f32::from(pixel[channel]) / 255.0,
        BitDepth::Sixteen => {
            let at = channel * 2;
            f32::from(u16::from_ne_bytes([pixel[at], pixel[at + 1]])) / 65535.0
        }
        BitDepth::Float32 => {
            let at = channel * 4;
            f32::from_ne_bytes([pixel[at], pixel[at + 1], pixel[at + 2], pixel[at + 3]])
        }
    }
}

#[inline]
fn write_sample(pixel: &mut [u8], channel: usize, depth: BitDepth, value: f32) {
    match depth {
        BitDepth::Eight => {
            pixel[channel] = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
        BitDepth::Sixteen => {
            let sample = (value.clamp(0.0, 1.0) * 65535.0).round() as u16;
            pixel[channel * 2..channel * 2 + 2].copy_from_slice(&sample.to_ne_bytes());
        }
        BitDepth::Float32 => {
            pixel[channel * 4..channel * 4 + 4].copy_from_slice(&value.to_ne_bytes());
        }
    }
}

fn load_rgba(desc: &PixelDescriptor, row: &[u8], rgba: &mut [f32]) {
    for (pixel, out) in row
        .chunks_exact(desc.bytes_per_pixel())
        .zip(rgba.chunks_exact_mut(4))
    {
        let mut value = [0.0, 0.0, 0.0, 1.0];

        for (channel, role) in desc.roles().iter().enumerate() {
            let sample = read_sample(pixel, channel, desc.depth());

            match role {
                ChannelRole::Luma => value[..3].fill(sample),
                ChannelRole::Red => value[0] = sample,
                ChannelRole::Green => value[1] = sample,
                ChannelRole::Blue => value[2] = sample,
                ChannelRole::Alpha => value[3] = sample
            }
        }
        out.copy_from_slice(&value);
    }
}

fn store_rgba(desc: &PixelDescriptor, rgba: &[f32], row: &mut [u8]) {
    for (out, value) in row
        .chunks_exact_mut(desc.bytes_per_pixel())
        .zip(rgba.chunks_exact(4))
    {
        for (channel, role) in desc.roles().iter().enumerate() {
            let sample = match role {
                ChannelRole::Luma => 0.299 * value[0] + 0.587 * value[1] + 0.114 * value[2],
                ChannelRole::Red => value[0],
                ChannelRole::Green => value[1],
                ChannelRole::Blue => value[2],
                ChannelRole::Alpha => value[3]
            };
            write_sample(out, channel, desc.depth(), sample);
        }
    }
}

fn apply_transfer(from: Transfer, to: Transfer, rgba: &mut [f32]) {
    let curve: fn(f32) -> f32 = match (from, to) {
        (Transfer::Srgb, Transfer::Linear) => srgb_to_linear,
        (Transfer::Linear, Transfer::Srgb) => linear_to_srgb,
        _ => return
    };
    for pixel in rgba.chunks_exact_mut(4) {
        for value in &mut pixel[..3] {
            *value = curve(*value);
        }
    }
}

/// Convert one row, `scratch` must hold four floats per pixel
fn convert_row(from: &PixelDescriptor, to: &PixelDescriptor, src: &[u8], dst: &mut [u8], scratch: &mut [f32]) {
    load_rgba(from, src, scratch);
    apply_transfer(from.transfer(), to.transfer(), scratch);
    store_rgba(to, scratch, dst);
}

/// Destinations rows can be written to
trait RowsMut {
    fn row_mut(&mut self, y: usize) -> &mut [u8];
}

impl RowsMut for PixelBuffer {
    fn row_mut(&mut self, y: usize) -> &mut [u8] {
        PixelBuffer::row_mut(self, y)
    }
}

impl RowsMut for PixelViewMut<'_> {
    fn row_mut(&mut self, y: usize) -> &mut [u8] {
        PixelViewMut::row_mut(self, y)
    }
}

fn convert_rows(source: &dyn PixelSource, to: PixelType, dest: &mut dyn RowsMut) {
    let from = source.pixel_type();

    if from == to {
        for y in 0..source.height() {
            dest.row_mut(y).copy_from_slice(source.row(y));
        }
        return;
    }
    let mut scratch = float_pool().acquire_or(Vec::new);
    scratch.resize(source.width() * 4, 0.0);

    for y in 0..source.height() {
        convert_row(from.descriptor(), to.descriptor(), source.row(y), dest.row_mut(y), &mut scratch);
    }
}

/// Convert `source` into a new buffer of pixel type `to`
///
/// # Example
/// ```
/// use imcodec::buffer::{PixelBuffer, PixelSource};
/// use imcodec::convert::convert;
/// use imcodec_core::pixel::PixelType;
///
/// let rgb = PixelBuffer::from_u8(vec![255, 0, 0, 0, 0, 255], 2, 1, PixelType::Rgb8).unwrap();
/// let bgra = convert(&rgb, PixelType::Bgra8).unwrap();
///
/// assert_eq!(bgra.row(0), &[0, 0, 255, 255, 255, 0, 0, 255]);
/// ```
pub fn convert(source: &dyn PixelSource, to: PixelType) -> Result<PixelBuffer, ImageErrors> {
    let (width, height) = source.dimensions();
    let mut out = PixelBuffer::new(width, height, to)?;

    convert_rows(source, to, &mut out);
    Ok(out)
}

/// Convert `source` into existing memory, using the destination's pixel type
pub fn convert_into(source: &dyn PixelSource, dest: &mut PixelViewMut<'_>) -> Result<(), ImageErrors> {
    if source.dimensions() != dest.dimensions() {
        return Err(ImageErrors::argument(format!(
            "cannot convert a {:?} source into a {:?} destination",
            source.dimensions(),
            dest.dimensions()
        )));
    }
    let to = dest.pixel_type();
    convert_rows(source, to, dest);

    Ok(())
}

/// Pick the pixel type from `supported` that loses the least of `source`.
///
/// An exact match wins, after that keeping alpha matters most, then
/// keeping color, then keeping the depth. Ties go to the earlier entry.
pub fn closest_pixel_type(source: PixelType, supported: &[PixelType]) -> Option<PixelType> {
    if supported.contains(&source) {
        return Some(source);
    }
    let score = |candidate: &PixelType| -> u32 {
        let mut score = 0;

        if candidate.has_alpha() == source.has_alpha() {
            score += 8;
        } else if candidate.has_alpha() {
            // an unneeded alpha channel loses nothing
            score += 4;
        }
        if candidate.is_gray() == source.is_gray() {
            score += 2;
        } else if !candidate.is_gray() {
            score += 1;
        }
        if candidate.depth() == source.depth() {
            score += 2;
        } else if candidate.depth().size_of() > source.depth().size_of() {
            score += 1;
        }
        score
    };
    supported
        .iter()
        .copied()
        .rev()
        .max_by_key(score)
}
