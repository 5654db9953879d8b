/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Identification results
use imcodec_core::pixel::PixelType;

use crate::format::ImageFormat;

/// What identification learned about an image, without decoding it
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ImageInfo {
    width:       usize,
    height:      usize,
    pixel_type:  PixelType,
    format:      ImageFormat,
    frame_count: Option<usize>
}

impl ImageInfo {
    pub const fn new(width: usize, height: usize, pixel_type: PixelType, format: ImageFormat) -> ImageInfo {
        ImageInfo {
            width,
            height,
            pixel_type,
            format,
            frame_count: None
        }
    }

    /// Record the number of frames, for formats where it is cheap to know
    pub const fn with_frame_count(mut self, frames: usize) -> ImageInfo {
        self.frame_count = Some(frames);
        self
    }

    pub const fn width(&self) -> usize {
        self.width
    }

    pub const fn height(&self) -> usize {
        self.height
    }

    pub const fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// The pixel type a decode will produce
    pub const fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    pub const fn format(&self) -> ImageFormat {
        self.format
    }

    pub const fn frame_count(&self) -> Option<usize> {
        self.frame_count
    }
}
