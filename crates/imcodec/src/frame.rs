/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Frames and images
//!
//! One or more frames make an image, an image with
//! multiple frames is considered an animated image
use std::time::Duration;

use imcodec_core::pixel::PixelType;

use crate::buffer::{PixelBuffer, PixelSource};
use crate::format::ImageFormat;

/// A single image frame
///
/// Each frame also contains a delay, for animated images
/// this is how long this particular frame should be shown
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    buffer: PixelBuffer,
    delay:  Duration
}

impl Frame {
    /// Create a frame with no delay
    pub fn new(buffer: PixelBuffer) -> Frame {
        Frame {
            buffer,
            delay: Duration::ZERO
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Frame {
        self.delay = delay;
        self
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut PixelBuffer {
        &mut self.buffer
    }

    pub fn into_buffer(self) -> PixelBuffer {
        self.buffer
    }

    pub const fn delay(&self) -> Duration {
        self.delay
    }
}

/// Ordered frames, plus the format they were decoded from
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    frames: Vec<Frame>,
    format: Option<ImageFormat>
}

impl Image {
    /// Create an image from frames, for images built in memory
    pub fn new(frames: Vec<Frame>) -> Image {
        Image { frames, format: None }
    }

    /// A single frame image
    pub fn from_buffer(buffer: PixelBuffer) -> Image {
        Image::new(vec![Frame::new(buffer)])
    }

    pub(crate) fn with_format(mut self, format: ImageFormat) -> Image {
        self.format = Some(format);
        self
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut [Frame] {
        &mut self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    pub fn first_frame(&self) -> Option<&Frame> {
        self.frames.first()
    }

    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }

    /// The format this image was decoded from, `None` for images built in memory
    pub const fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    /// Dimensions of the first frame
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        self.first_frame().map(|f| f.buffer.dimensions())
    }

    /// Pixel type of the first frame
    pub fn pixel_type(&self) -> Option<PixelType> {
        self.first_frame().map(|f| f.buffer.pixel_type())
    }
}
