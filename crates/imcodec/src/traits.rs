/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Traits implemented by format detectors and coders
//!
//! A format plugs into the library by providing some of
//!
//! - a [`FormatDetector`], telling whether a header belongs to the format
//! - an [`InfoDetector`], reading dimensions and pixel type without decoding
//! - a [`Decoder`] and an [`Encoder`]
//!
//! and registering them in a [`CodecRegistry`](crate::registry::CodecRegistry).
//! Coders declare what else they can do with [`CoderCapabilities`].
use std::io::Read;
use std::ops::ControlFlow;
use std::time::Duration;

use bitflags::bitflags;
use imcodec_core::bytestream::ByteReader;
use imcodec_core::monitor::Rect;
use imcodec_core::options::DecoderLimits;
use imcodec_core::pixel::PixelType;

use crate::buffer::PixelSource;
use crate::errors::ImageErrors;
use crate::format::ImageFormat;
use crate::frame::Frame;
use crate::info::ImageInfo;
use crate::state::{DecodeState, EncodeState};

bitflags! {
    /// Optional abilities of a coder
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct CoderCapabilities: u8 {
        /// Reads or writes more than one frame per stream
        const ANIMATED    = 0b0000_0001;
        /// Stops at row or block boundaries when asked to
        const CANCELLABLE = 0b0000_0010;
        /// Reports progress while rows are processed
        const PROGRESS    = 0b0000_0100;
    }
}

/// A progress notice
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Progress {
    /// Completion of the current frame, 0 to 100
    pub percent:     u8,
    /// Area of the frame that changed since the last notice, if the coder knows
    pub dirty:       Option<Rect>,
    /// Zero based index of the frame being processed
    pub frame_index: usize
}

/// Receives progress notices, and may ask for the operation to stop
pub trait ProgressSink {
    /// Returning [`ControlFlow::Break`] interrupts the operation
    fn on_progress(&mut self, progress: Progress) -> ControlFlow<()>;
}

impl<F: FnMut(Progress) -> ControlFlow<()>> ProgressSink for F {
    fn on_progress(&mut self, progress: Progress) -> ControlFlow<()> {
        (self)(progress)
    }
}

/// Recognises the header of one format
pub trait FormatDetector: Send + Sync {
    /// The format this detector recognises
    fn format(&self) -> ImageFormat;

    /// Whether `header` starts an image of this format.
    ///
    /// `header` holds at most `format().header_size()` bytes,
    /// fewer if the stream is shorter than that
    fn detect(&self, header: &[u8]) -> bool;
}

/// Reads image information without decoding pixels
pub trait InfoDetector: Send + Sync {
    fn format(&self) -> ImageFormat;

    /// Read the header from `stream`.
    ///
    /// Implementations only peek, the stream position does not move,
    /// so calling this repeatedly returns the same answer and a decode
    /// can follow on the same stream.
    fn identify(
        &self, stream: &mut ByteReader<dyn Read + '_>, limits: DecoderLimits
    ) -> Result<ImageInfo, ImageErrors>;
}

/// Decodes frames of one format
pub trait Decoder {
    fn format(&self) -> ImageFormat;

    fn capabilities(&self) -> CoderCapabilities;

    /// Read the header of the stream in `state`
    fn read_info(&mut self, state: &mut DecodeState<'_>) -> Result<ImageInfo, ImageErrors>;

    /// Decode the next frame
    fn read_frame(&mut self, state: &mut DecodeState<'_>) -> Result<Frame, ImageErrors>;

    /// Whether [`read_frame`](Self::read_frame) can be called again
    fn has_more_frames(&mut self, state: &mut DecodeState<'_>) -> bool {
        state.frame_index() == 0
    }
}

/// Encodes frames of one format
pub trait Encoder {
    fn format(&self) -> ImageFormat;

    fn capabilities(&self) -> CoderCapabilities;

    /// Pixel types that can be written without conversion
    fn supported_pixel_types(&self) -> &'static [PixelType];

    /// The pixel type `source` should be converted to before writing
    fn preferred_pixel_type(&self, source: PixelType) -> Option<PixelType> {
        crate::convert::closest_pixel_type(source, self.supported_pixel_types())
    }

    /// Write one frame, which is already in a supported pixel type,
    /// returning the number of bytes written
    fn write_frame(
        &mut self, state: &mut EncodeState<'_>, frame: &dyn PixelSource, delay: Duration
    ) -> Result<usize, ImageErrors>;

    /// Write whatever trails the last frame
    fn finish(&mut self, _state: &mut EncodeState<'_>) -> Result<usize, ImageErrors> {
        Ok(0)
    }
}
