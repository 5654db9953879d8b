/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Pixel types, and the descriptions shared between decoders,
//! encoders and the conversion routines
//!
//! A pixel type is fully described by the roles of its channels,
//! the bit depth of every channel and the transfer function its
//! values are encoded with.
//!
//! Integer types store sRGB encoded values, floating point types
//! store linear light. Multi-byte samples are always kept in native
//! endian, codecs swap to and from the file's byte order.

/// The image bit depth.
///
/// Every channel of a pixel uses the same depth
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BitDepth {
    /// Eight bit depth.
    ///
    /// Images with such bit depth use [`u8`] to store
    /// pixels and use the whole range from 0-255.
    ///
    /// For images with bit depths lower than this, they will be scaled
    /// to this bit depth
    Eight,
    /// Sixteen bit depth
    ///
    /// Images with such bit depths use [`u16`] to store values and use the whole range
    /// i.e 0-65535
    Sixteen,
    /// Floating point samples, nominally in the range 0.0 to 1.0
    Float32
}

impl BitDepth {
    /// Size of a single sample of this depth in bytes
    pub const fn size_of(self) -> usize {
        match self {
            BitDepth::Eight => 1,
            BitDepth::Sixteen => 2,
            BitDepth::Float32 => 4
        }
    }

    /// Largest value an integer sample of this depth can hold,
    /// 1.0 for floats
    pub const fn max_value(self) -> f32 {
        match self {
            BitDepth::Eight => 255.0,
            BitDepth::Sixteen => 65535.0,
            BitDepth::Float32 => 1.0
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, BitDepth::Float32)
    }
}

/// What a channel of a pixel means
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChannelRole {
    Luma,
    Red,
    Green,
    Blue,
    Alpha
}

/// Transfer function sample values are encoded with
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Transfer {
    /// Gamma encoded with the sRGB curve
    Srgb,
    /// Linear light
    Linear
}

/// The pixel types images can be stored in
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PixelType {
    Gray8,
    GrayAlpha8,
    Rgb8,
    Rgba8,
    /// Blue, green, red
    Bgr8,
    /// Blue, green, red, alpha
    Bgra8,
    Gray16,
    GrayAlpha16,
    Rgb16,
    Rgba16,
    RgbF32,
    RgbaF32
}

use ChannelRole::{Alpha, Blue, Green, Luma, Red};

const GRAY: &[ChannelRole] = &[Luma];
const GRAY_ALPHA: &[ChannelRole] = &[Luma, Alpha];
const RGB: &[ChannelRole] = &[Red, Green, Blue];
const RGBA: &[ChannelRole] = &[Red, Green, Blue, Alpha];
const BGR: &[ChannelRole] = &[Blue, Green, Red];
const BGRA: &[ChannelRole] = &[Blue, Green, Red, Alpha];

/// Full description of a pixel type
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PixelDescriptor {
    pixel_type: PixelType,
    roles:      &'static [ChannelRole],
    depth:      BitDepth,
    transfer:   Transfer
}

impl PixelDescriptor {
    const fn new(pixel_type: PixelType, roles: &'static [ChannelRole], depth: BitDepth) -> Self {
        let transfer = if depth.is_float() {
            Transfer::Linear
        } else {
            Transfer::Srgb
        };
        PixelDescriptor {
            pixel_type,
            roles,
            depth,
            transfer
        }
    }

    pub const fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    /// Roles of the channels, in memory order
    pub const fn roles(&self) -> &'static [ChannelRole] {
        self.roles
    }

    pub const fn components(&self) -> usize {
        self.roles.len()
    }

    pub const fn depth(&self) -> BitDepth {
        self.depth
    }

    pub const fn transfer(&self) -> Transfer {
        self.transfer
    }

    pub const fn bytes_per_pixel(&self) -> usize {
        self.roles.len() * self.depth.size_of()
    }

    /// Index of the channel with the given role, if present
    pub fn role_index(&self, role: ChannelRole) -> Option<usize> {
        self.roles.iter().position(|r| *r == role)
    }

    pub fn has_alpha(&self) -> bool {
        self.role_index(Alpha).is_some()
    }

    pub fn is_gray(&self) -> bool {
        self.role_index(Luma).is_some()
    }
}

static DESCRIPTORS: [PixelDescriptor; 12] = [
    PixelDescriptor::new(PixelType::Gray8, GRAY, BitDepth::Eight),
    PixelDescriptor::new(PixelType::GrayAlpha8, GRAY_ALPHA, BitDepth::Eight),
    PixelDescriptor::new(PixelType::Rgb8, RGB, BitDepth::Eight),
    PixelDescriptor::new(PixelType::Rgba8, RGBA, BitDepth::Eight),
    PixelDescriptor::new(PixelType::Bgr8, BGR, BitDepth::Eight),
    PixelDescriptor::new(PixelType::Bgra8, BGRA, BitDepth::Eight),
    PixelDescriptor::new(PixelType::Gray16, GRAY, BitDepth::Sixteen),
    PixelDescriptor::new(PixelType::GrayAlpha16, GRAY_ALPHA, BitDepth::Sixteen),
    PixelDescriptor::new(PixelType::Rgb16, RGB, BitDepth::Sixteen),
    PixelDescriptor::new(PixelType::Rgba16, RGBA, BitDepth::Sixteen),
    PixelDescriptor::new(PixelType::RgbF32, RGB, BitDepth::Float32),
    PixelDescriptor::new(PixelType::RgbaF32, RGBA, BitDepth::Float32)
];

impl PixelType {
    /// All pixel types, in declaration order
    pub const ALL: [PixelType; 12] = [
        PixelType::Gray8,
        PixelType::GrayAlpha8,
        PixelType::Rgb8,
        PixelType::Rgba8,
        PixelType::Bgr8,
        PixelType::Bgra8,
        PixelType::Gray16,
        PixelType::GrayAlpha16,
        PixelType::Rgb16,
        PixelType::Rgba16,
        PixelType::RgbF32,
        PixelType::RgbaF32
    ];

    /// Return the full description of this pixel type
    pub fn descriptor(self) -> &'static PixelDescriptor {
        // the table is declared in the same order as the enum
        &DESCRIPTORS[self as usize]
    }

    pub fn components(self) -> usize {
        self.descriptor().components()
    }

    pub fn depth(self) -> BitDepth {
        self.descriptor().depth()
    }

    pub fn bytes_per_pixel(self) -> usize {
        self.descriptor().bytes_per_pixel()
    }

    pub fn has_alpha(self) -> bool {
        self.descriptor().has_alpha()
    }

    pub fn is_gray(self) -> bool {
        self.descriptor().is_gray()
    }

    /// Find the pixel type with exactly these channel roles and depth
    pub fn from_roles(roles: &[ChannelRole], depth: BitDepth) -> Option<PixelType> {
        DESCRIPTORS
            .iter()
            .find(|d| d.roles == roles && d.depth == depth)
            .map(|d| d.pixel_type)
    }

    /// The same layout at a different depth, if one exists.
    ///
    /// Byte swapped layouts map to their RGB counterparts when
    /// leaving eight bits
    pub fn with_depth(self, depth: BitDepth) -> Option<PixelType> {
        let roles = match self.descriptor().roles {
            BGR => RGB,
            BGRA => RGBA,
            roles => roles
        };
        PixelType::from_roles(roles, depth)
            .or_else(|| PixelType::from_roles(self.descriptor().roles, depth))
    }

    /// This type with an alpha channel added, keeping the depth
    pub fn with_alpha(self) -> PixelType {
        match self {
            PixelType::Gray8 => PixelType::GrayAlpha8,
            PixelType::Rgb8 => PixelType::Rgba8,
            PixelType::Bgr8 => PixelType::Bgra8,
            PixelType::Gray16 => PixelType::GrayAlpha16,
            PixelType::Rgb16 => PixelType::Rgba16,
            PixelType::RgbF32 => PixelType::RgbaF32,
            other => other
        }
    }

    /// This type with the alpha channel dropped, keeping the depth
    pub fn without_alpha(self) -> PixelType {
        match self {
            PixelType::GrayAlpha8 => PixelType::Gray8,
            PixelType::Rgba8 => PixelType::Rgb8,
            PixelType::Bgra8 => PixelType::Bgr8,
            PixelType::GrayAlpha16 => PixelType::Gray16,
            PixelType::Rgba16 => PixelType::Rgb16,
            PixelType::RgbaF32 => PixelType::RgbF32,
            other => other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_enum_order() {
        for ty in PixelType::ALL {
            assert_eq!(ty.descriptor().pixel_type(), ty);
        }
    }

    #[test]
    fn float_types_are_linear() {
        for ty in PixelType::ALL {
            let desc = ty.descriptor();
            let expected = if desc.depth().is_float() {
                Transfer::Linear
            } else {
                Transfer::Srgb
            };
            assert_eq!(desc.transfer(), expected);
        }
    }

    #[test]
    fn layout_helpers() {
        assert_eq!(PixelType::Rgba16.bytes_per_pixel(), 8);
        assert_eq!(PixelType::Bgra8.with_depth(BitDepth::Sixteen), Some(PixelType::Rgba16));
        assert_eq!(PixelType::Gray8.with_depth(BitDepth::Float32), None);
        assert_eq!(PixelType::GrayAlpha16.without_alpha(), PixelType::Gray16);
        assert_eq!(PixelType::Rgb8.with_alpha(), PixelType::Rgba8);
        assert_eq!(PixelType::Bgra8.descriptor().role_index(ChannelRole::Red), Some(2));
    }
}
