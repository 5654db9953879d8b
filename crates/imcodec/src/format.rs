/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Image format descriptors
//!
//! A format is identified by its [`FormatId`], everything else in the
//! descriptor is information about the format. Two descriptors with the
//! same id compare equal even when the rest differs, the registry is
//! what refuses to bind one id to two different descriptors.
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::time::Duration;

use bitflags::bitflags;

/// Numeric identity of an image format
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct FormatId(pub u32);

bitflags! {
    /// What a file format can carry
    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
    pub struct FormatCapabilities: u32 {
        /// More than one frame per file
        const ANIMATION = 1 << 0;
        /// Pixels survive a round trip unchanged
        const LOSSLESS = 1 << 1;
        /// An alpha channel can be stored
        const ALPHA = 1 << 2;
        /// Pixels are approximated when stored
        const LOSSY = 1 << 3;
    }
}

/// Description of an image format
///
/// Built-in formats are available as associated constants, third party
/// formats are described the same way and handed to a
/// [`CodecRegistry`](crate::registry::CodecRegistry).
///
/// # Example
/// ```
/// use std::time::Duration;
/// use imcodec::format::{FormatCapabilities, FormatId, ImageFormat};
///
/// const QOI: ImageFormat = ImageFormat::new(FormatId(1000), "QOI")
///     .with_header_size(14)
///     .with_extensions(&["qoi"])
///     .with_mime("image/qoi")
///     .with_capabilities(FormatCapabilities::LOSSLESS.union(FormatCapabilities::ALPHA));
///
/// assert_ne!(QOI, ImageFormat::PNG);
/// assert_eq!(QOI.min_frame_delay(), Duration::ZERO);
/// ```
#[derive(Copy, Clone)]
pub struct ImageFormat {
    id:              FormatId,
    name:            &'static str,
    header_size:     usize,
    extensions:      &'static [&'static str],
    mime:            &'static str,
    capabilities:    FormatCapabilities,
    min_frame_delay: Duration
}

impl ImageFormat {
    /// Windows Bitmap Files
    pub const BMP: ImageFormat = ImageFormat::new(FormatId(1), "BMP")
        .with_header_size(18)
        .with_extensions(&["bmp", "dib"])
        .with_mime("image/bmp")
        .with_capabilities(FormatCapabilities::LOSSLESS.union(FormatCapabilities::ALPHA));

    /// Portable Network Graphics
    pub const PNG: ImageFormat = ImageFormat::new(FormatId(2), "PNG")
        .with_header_size(8)
        .with_extensions(&["png"])
        .with_mime("image/png")
        .with_capabilities(FormatCapabilities::LOSSLESS.union(FormatCapabilities::ALPHA));

    /// Joint Photographic Experts Group
    pub const JPEG: ImageFormat = ImageFormat::new(FormatId(3), "JPEG")
        .with_header_size(3)
        .with_extensions(&["jpg", "jpeg", "jpe", "jfif"])
        .with_mime("image/jpeg")
        .with_capabilities(FormatCapabilities::LOSSY);

    /// Graphics Interchange Format
    pub const GIF: ImageFormat = ImageFormat::new(FormatId(4), "GIF")
        .with_header_size(6)
        .with_extensions(&["gif"])
        .with_mime("image/gif")
        .with_capabilities(FormatCapabilities::ANIMATION.union(FormatCapabilities::ALPHA))
        .with_min_frame_delay(Duration::from_millis(20));

    /// Truevision TARGA
    pub const TGA: ImageFormat = ImageFormat::new(FormatId(5), "TGA")
        .with_header_size(18)
        .with_extensions(&["tga", "targa", "icb", "vda", "vst"])
        .with_mime("image/x-tga")
        .with_capabilities(FormatCapabilities::LOSSLESS.union(FormatCapabilities::ALPHA));

    /// Create a format without extensions, capabilities or header
    pub const fn new(id: FormatId, name: &'static str) -> ImageFormat {
        ImageFormat {
            id,
            name,
            header_size: 0,
            extensions: &[],
            mime: "application/octet-stream",
            capabilities: FormatCapabilities::empty(),
            min_frame_delay: Duration::ZERO
        }
    }

    /// Set the number of leading bytes a detector needs to recognise the format
    pub const fn with_header_size(mut self, size: usize) -> ImageFormat {
        self.header_size = size;
        self
    }

    /// File extensions, lower case and without the leading dot
    pub const fn with_extensions(mut self, extensions: &'static [&'static str]) -> ImageFormat {
        self.extensions = extensions;
        self
    }

    pub const fn with_mime(mut self, mime: &'static str) -> ImageFormat {
        self.mime = mime;
        self
    }

    pub const fn with_capabilities(mut self, capabilities: FormatCapabilities) -> ImageFormat {
        self.capabilities = capabilities;
        self
    }

    /// Smallest delay between animation frames the format can express
    pub const fn with_min_frame_delay(mut self, delay: Duration) -> ImageFormat {
        self.min_frame_delay = delay;
        self
    }

    pub const fn id(&self) -> FormatId {
        self.id
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn header_size(&self) -> usize {
        self.header_size
    }

    pub const fn extensions(&self) -> &'static [&'static str] {
        self.extensions
    }

    pub const fn mime(&self) -> &'static str {
        self.mime
    }

    pub const fn capabilities(&self) -> FormatCapabilities {
        self.capabilities
    }

    pub const fn min_frame_delay(&self) -> Duration {
        self.min_frame_delay
    }

    pub const fn supports_animation(&self) -> bool {
        self.capabilities.contains(FormatCapabilities::ANIMATION)
    }

    /// Whether `extension` (without the dot) belongs to this format,
    /// ignoring case
    pub fn matches_extension(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }

    /// Whether every field, not just the id, matches
    pub(crate) fn same_descriptor(&self, other: &ImageFormat) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.header_size == other.header_size
            && self.extensions == other.extensions
            && self.mime == other.mime
            && self.capabilities == other.capabilities
            && self.min_frame_delay == other.min_frame_delay
    }
}

impl PartialEq for ImageFormat {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ImageFormat {}

impl Hash for ImageFormat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Debug for ImageFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.id.0)
    }
}

impl Display for ImageFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}
