/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Decode and encode sessions
//!
//! A session drives one coder over one stream and enforces its lifecycle.
//!
//! A decode session reads frames until the stream runs out. Only a coder
//! of an animated format may read more than one frame, a failed read ends
//! the session.
//!
//! An encode session writes frames and then finishes. Extra frames sent
//! to a coder that cannot animate are skipped, frames in a pixel type the
//! coder cannot write are converted first.
use std::time::Duration;

use log::debug;

use crate::buffer::PixelSource;
use crate::convert::convert;
use crate::errors::{ImageErrors, Stage};
use crate::format::ImageFormat;
use crate::frame::Frame;
use crate::info::ImageInfo;
use crate::state::{DecodeState, EncodeState};
use crate::traits::{CoderCapabilities, Decoder, Encoder};

/// Reads frames from one stream
pub struct DecodeSession<'a> {
    decoder:     Box<dyn Decoder>,
    state:       DecodeState<'a>,
    frames_read: usize,
    failed:      bool
}

impl<'a> DecodeSession<'a> {
    pub fn new(decoder: Box<dyn Decoder>, state: DecodeState<'a>) -> DecodeSession<'a> {
        DecodeSession {
            decoder,
            state,
            frames_read: 0,
            failed: false
        }
    }

    fn is_animated(&self) -> bool {
        self.state.format().supports_animation()
            && self
                .decoder
                .capabilities()
                .contains(CoderCapabilities::ANIMATED)
    }

    /// Read the image header
    pub fn info(&mut self) -> Result<ImageInfo, ImageErrors> {
        self.decoder.read_info(&mut self.state)
    }

    /// Decode the next frame
    pub fn read_frame(&mut self) -> Result<Frame, ImageErrors> {
        let format = self.state.format();

        if self.failed {
            return Err(ImageErrors::unsupported(format, "reading after a failed read"));
        }
        if self.frames_read > 0 && !self.is_animated() {
            return Err(ImageErrors::unsupported(
                format,
                "a second frame was requested from a single frame decoder"
            ));
        }
        if self.state.is_cancelled() {
            self.failed = true;
            return Err(self.state.interrupted(Stage::Decode));
        }
        match self.decoder.read_frame(&mut self.state) {
            Ok(frame) => {
                self.frames_read += 1;
                self.state.advance_frame();
                Ok(frame)
            }
            Err(e) => {
                self.failed = true;
                Err(e)
            }
        }
    }

    /// Whether another [`read_frame`](Self::read_frame) can succeed
    pub fn has_more_frames(&mut self) -> bool {
        if self.failed {
            return false;
        }
        if self.frames_read == 0 {
            return true;
        }
        self.is_animated() && self.decoder.has_more_frames(&mut self.state)
    }

    /// Decode every remaining frame
    pub fn read_all(&mut self) -> Result<Vec<Frame>, ImageErrors> {
        let mut frames = vec![];

        while self.has_more_frames() {
            frames.push(self.read_frame()?);
        }
        Ok(frames)
    }

    pub const fn frames_read(&self) -> usize {
        self.frames_read
    }

    pub const fn format(&self) -> ImageFormat {
        self.state.format()
    }
}

/// Writes frames to one stream
pub struct EncodeSession<'a> {
    encoder:        Box<dyn Encoder>,
    state:          EncodeState<'a>,
    frames_written: usize,
    bytes_written:  usize,
    finished:       bool
}

impl<'a> EncodeSession<'a> {
    pub fn new(encoder: Box<dyn Encoder>, state: EncodeState<'a>) -> EncodeSession<'a> {
        EncodeSession {
            encoder,
            state,
            frames_written: 0,
            bytes_written: 0,
            finished: false
        }
    }

    /// Whether the next frame will be written
    pub fn accepts_more_frames(&self) -> bool {
        if self.finished {
            return false;
        }
        self.frames_written == 0
            || (self.state.format().supports_animation()
                && self
                    .encoder
                    .capabilities()
                    .contains(CoderCapabilities::ANIMATED))
    }

    /// Write one frame.
    ///
    /// Returns `false` if the frame was skipped because the encoder
    /// writes a single frame and already has it
    pub fn write_frame(&mut self, frame: &dyn PixelSource, delay: Duration) -> Result<bool, ImageErrors> {
        let format = self.state.format();

        if self.finished {
            return Err(ImageErrors::unsupported(format, "writing after the encoder finished"));
        }
        if !self.accepts_more_frames() {
            debug!(
                "{format} encoder writes a single frame, skipping frame {}",
                self.frames_written
            );
            return Ok(false);
        }
        if self.state.is_cancelled() {
            return Err(self.state.interrupted(Stage::Encode));
        }
        let pixel_type = frame.pixel_type();
        let target = self.encoder.preferred_pixel_type(pixel_type).ok_or_else(|| {
            ImageErrors::unsupported(format, format!("no pixel type to store {pixel_type:?} in"))
        })?;

        let written = if target == pixel_type {
            self.encoder.write_frame(&mut self.state, frame, delay)?
        } else {
            debug!("Converting {pixel_type:?} to {target:?} for the {format} encoder");
            let converted = convert(frame, target)?;
            self.encoder.write_frame(&mut self.state, &converted, delay)?
        };
        self.bytes_written += written;
        self.frames_written += 1;
        self.state.advance_frame();

        Ok(true)
    }

    /// Write the trailer and flush, returning the total bytes written
    pub fn finish(&mut self) -> Result<usize, ImageErrors> {
        let format = self.state.format();

        if self.finished {
            return Err(ImageErrors::unsupported(format, "the encoder already finished"));
        }
        self.finished = true;
        self.bytes_written += self.encoder.finish(&mut self.state)?;

        self.state
            .stream()
            .flush()
            .map_err(|e| ImageErrors::from_byte_io(e, format, Stage::Encode))?;

        Ok(self.bytes_written)
    }

    pub const fn frames_written(&self) -> usize {
        self.frames_written
    }
}
