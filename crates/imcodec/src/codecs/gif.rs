/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! GIF support
//!
//! Only encoding is supported, done by the delegate library
//! [imcodec-gif](imcodec_gif). GIF files can still be detected and
//! identified, decoding one fails with a missing decoder error.
#![cfg(feature = "gif")]

use std::io::Read;
use std::time::Duration;

use imcodec_core::bytestream::ByteReader;
use imcodec_core::options::DecoderLimits;
use imcodec_core::pixel::PixelType;
pub use imcodec_gif::*;

use crate::buffer::PixelSource;
use crate::codecs::SignatureDetector;
use crate::errors::{ImageErrors, Stage};
use crate::format::ImageFormat;
use crate::info::ImageInfo;
use crate::options::CoderOptions;
use crate::registry::BuiltinTable;
use crate::state::EncodeState;
use crate::traits::{CoderCapabilities, Encoder, InfoDetector};

pub(crate) fn register(table: &mut BuiltinTable<'_>) {
    table.format(ImageFormat::GIF);
    table.detector(SignatureDetector::new(ImageFormat::GIF, probe_gif));
    table.info_detector(GifInfoDetector);
    table.encoder(ImageFormat::GIF, || Box::<GifCodec>::default());
}

/// Reads the logical screen size of a GIF
pub struct GifInfoDetector;

impl InfoDetector for GifInfoDetector {
    fn format(&self) -> ImageFormat {
        ImageFormat::GIF
    }

    fn identify(
        &self, stream: &mut ByteReader<dyn Read + '_>, limits: DecoderLimits
    ) -> Result<ImageInfo, ImageErrors> {
        let header = stream
            .peek_at(0, 10)
            .map_err(|e| ImageErrors::from_byte_io(e, ImageFormat::GIF, Stage::Identify))?;

        let (width, height) = screen_dimensions(header).ok_or_else(|| {
            ImageErrors::malformed(ImageFormat::GIF, Stage::Identify, "bad GIF signature")
        })?;

        if let Err((dimension, value)) = limits.check_dimensions(width, height) {
            return Err(ImageErrors::malformed(
                ImageFormat::GIF,
                Stage::Identify,
                format!("{dimension} {value} exceeds the decoder limits")
            ));
        }
        // counting frames means walking every block, identification stays cheap
        Ok(ImageInfo::new(width, height, PixelType::Rgba8, ImageFormat::GIF))
    }
}

/// Animated GIF encoder
///
/// The first frame fixes the logical screen size, later frames must match it.
#[derive(Default)]
pub struct GifCodec {
    encoder: Option<GifEncoder>
}

impl GifCodec {
    /// The delay in hundredths of a second, never below the
    /// format's minimum frame delay
    fn delay_centis(delay: Duration) -> u16 {
        let delay = delay.max(ImageFormat::GIF.min_frame_delay());
        u16::try_from(delay.as_millis() / 10).unwrap_or(u16::MAX)
    }
}

impl Encoder for GifCodec {
    fn format(&self) -> ImageFormat {
        ImageFormat::GIF
    }

    fn capabilities(&self) -> CoderCapabilities {
        CoderCapabilities::ANIMATED | CoderCapabilities::CANCELLABLE | CoderCapabilities::PROGRESS
    }

    fn supported_pixel_types(&self) -> &'static [PixelType] {
        &[PixelType::Rgba8]
    }

    fn write_frame(
        &mut self, state: &mut EncodeState<'_>, frame: &dyn PixelSource, delay: Duration
    ) -> Result<usize, ImageErrors> {
        let (width, height) = frame.dimensions();

        if frame.pixel_type() != PixelType::Rgba8 {
            return Err(ImageErrors::unsupported(
                ImageFormat::GIF,
                format!("cannot store {:?} pixels", frame.pixel_type())
            ));
        }
        let options = state
            .options()
            .resolve(ImageFormat::GIF, CoderOptions::as_gif);
        let encoder = self
            .encoder
            .get_or_insert_with(|| GifEncoder::new(width, height, options));

        if encoder.dimensions() != (width, height) {
            return Err(ImageErrors::argument(format!(
                "frame of {width}x{height} does not match the {:?} screen",
                encoder.dimensions()
            )));
        }
        let data = frame.to_contiguous();
        let (sink, mut monitor) = state.parts();

        Ok(encoder.write_frame(sink, &data, Self::delay_centis(delay), &mut monitor)?)
    }

    fn finish(&mut self, state: &mut EncodeState<'_>) -> Result<usize, ImageErrors> {
        match self.encoder.as_mut() {
            Some(encoder) => Ok(encoder.finish(state.stream())?),
            None => Ok(0)
        }
    }
}

impl From<GifEncoderErrors> for ImageErrors {
    fn from(value: GifEncoderErrors) -> Self {
        let format = ImageFormat::GIF;

        match value {
            GifEncoderErrors::Interrupted => ImageErrors::Interrupted {
                format,
                stage: Stage::Encode
            },
            GifEncoderErrors::AlreadyFinished => {
                ImageErrors::unsupported(format, "writing after the trailer")
            }
            GifEncoderErrors::IoErrors(e) => ImageErrors::from_byte_io(e, format, Stage::Encode),
            e => ImageErrors::argument(format!("gif: {e:?}").trim_end())
        }
    }
}
