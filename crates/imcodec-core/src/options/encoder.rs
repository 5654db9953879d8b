/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Per-format encoder options
//!
//! Each format gets its own struct, values outside of the accepted
//! range are clamped by the setters so an option struct is always valid.

/// Pixel data compression used when writing BMP files
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BmpCompression {
    /// Store rows as they are
    #[default]
    None,
    /// Run length encode 8 bit palette indices.
    ///
    /// Images with more than 256 distinct colors are written
    /// uncompressed instead.
    Rle
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BmpOptions {
    compression: BmpCompression
}

impl BmpOptions {
    pub const fn get_compression(&self) -> BmpCompression {
        self.compression
    }

    pub fn set_compression(mut self, compression: BmpCompression) -> Self {
        self.compression = compression;
        self
    }
}

/// Row filter selection for PNG encoding
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PngFilter {
    /// Try every filter per row and keep the one with the
    /// smallest sum of absolute differences
    #[default]
    Adaptive,
    None,
    Sub,
    Up,
    Average,
    Paeth
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PngOptions {
    /// Deflate effort, 0 (store) to 9 (smallest)
    ///
    /// - Default value: 6
    compression_level: u8,
    filter:            PngFilter
}

impl Default for PngOptions {
    fn default() -> Self {
        PngOptions {
            compression_level: 6,
            filter:            PngFilter::Adaptive
        }
    }
}

impl PngOptions {
    pub const fn get_compression_level(&self) -> u8 {
        self.compression_level
    }

    /// Set the deflate effort, values above 9 are clamped to 9
    pub fn set_compression_level(mut self, level: u8) -> Self {
        self.compression_level = level.min(9);
        self
    }

    pub const fn get_filter(&self) -> PngFilter {
        self.filter
    }

    pub fn set_filter(mut self, filter: PngFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Chroma subsampling policy for JPEG encoding
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Subsampling {
    /// Let the encoder decide, subsampling is used below quality 90
    #[default]
    Allow,
    /// Never subsample chroma (4:4:4)
    Disallow,
    /// Always subsample chroma (4:2:0)
    Force
}

impl Subsampling {
    /// Whether chroma should be subsampled at the given quality
    pub const fn subsample_at(self, quality: u8) -> bool {
        match self {
            Subsampling::Allow => quality < 90,
            Subsampling::Disallow => false,
            Subsampling::Force => true
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JpegOptions {
    /// Quality, 0 (worst) to 100 (best)
    ///
    /// - Default value: 80
    quality:     u8,
    subsampling: Subsampling,
    progressive: bool
}

impl Default for JpegOptions {
    fn default() -> Self {
        JpegOptions {
            quality:     80,
            subsampling: Subsampling::Allow,
            progressive: false
        }
    }
}

impl JpegOptions {
    pub const fn get_quality(&self) -> u8 {
        self.quality
    }

    /// Set the quality, values above 100 are clamped to 100
    pub fn set_quality(mut self, quality: u8) -> Self {
        self.quality = quality.min(100);
        self
    }

    pub const fn get_subsampling(&self) -> Subsampling {
        self.subsampling
    }

    pub fn set_subsampling(mut self, subsampling: Subsampling) -> Self {
        self.subsampling = subsampling;
        self
    }

    pub const fn get_progressive(&self) -> bool {
        self.progressive
    }

    pub fn set_progressive(mut self, yes: bool) -> Self {
        self.progressive = yes;
        self
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TgaOptions {
    /// Whether pixel data is run length encoded
    ///
    /// - Default value: false
    rle: bool
}

impl TgaOptions {
    pub const fn get_rle(&self) -> bool {
        self.rle
    }

    pub fn set_rle(mut self, yes: bool) -> Self {
        self.rle = yes;
        self
    }
}

/// How many times a GIF animation plays
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GifRepeat {
    /// Loop forever
    #[default]
    Infinite,
    /// Repeat the given number of times after the first play,
    /// zero omits the looping extension entirely
    Finite(u16)
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GifOptions {
    repeat: GifRepeat
}

impl GifOptions {
    pub const fn get_repeat(&self) -> GifRepeat {
        self.repeat
    }

    pub fn set_repeat(mut self, repeat: GifRepeat) -> Self {
        self.repeat = repeat;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_clamp() {
        assert_eq!(JpegOptions::default().set_quality(250).get_quality(), 100);
        assert_eq!(PngOptions::default().set_compression_level(12).get_compression_level(), 9);
    }

    #[test]
    fn subsampling_policy() {
        assert!(Subsampling::Allow.subsample_at(75));
        assert!(!Subsampling::Allow.subsample_at(95));
        assert!(Subsampling::Force.subsample_at(100));
        assert!(!Subsampling::Disallow.subsample_at(0));
    }
}
