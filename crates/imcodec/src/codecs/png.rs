/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! PNG support
//!
//! Decoding and encoding is done by the delegate library [imcodec-png](imcodec_png)
#![cfg(feature = "png")]

use std::io::Read;
use std::time::Duration;

pub use imcodec_png::*;
use imcodec_core::bytestream::ByteReader;
use imcodec_core::options::DecoderLimits;
use imcodec_core::pixel::PixelType;

use crate::buffer::{PixelBuffer, PixelSource};
use crate::codecs::SignatureDetector;
use crate::errors::{ImageErrors, Stage};
use crate::format::ImageFormat;
use crate::frame::Frame;
use crate::info::ImageInfo;
use crate::options::CoderOptions;
use crate::registry::BuiltinTable;
use crate::state::{DecodeState, EncodeState};
use crate::traits::{CoderCapabilities, Decoder, Encoder, InfoDetector};

pub(crate) fn register(table: &mut BuiltinTable<'_>) {
    table.format(ImageFormat::PNG);
    table.detector(SignatureDetector::new(ImageFormat::PNG, probe_png));
    table.info_detector(PngInfoDetector);
    table.decoder(ImageFormat::PNG, || Box::new(PngCodec));
    table.encoder(ImageFormat::PNG, || Box::new(PngCodec));
}

fn header_info<R: Read + ?Sized>(decoder: &PngDecoder<'_, R>) -> Result<ImageInfo, ImageErrors> {
    match (decoder.dimensions(), decoder.pixel_type()) {
        (Some((width, height)), Some(pixel_type)) => {
            Ok(ImageInfo::new(width, height, pixel_type, ImageFormat::PNG).with_frame_count(1))
        }
        _ => Err(ImageErrors::malformed(
            ImageFormat::PNG,
            Stage::Identify,
            "headers were not decoded"
        ))
    }
}

/// Reads PNG headers
pub struct PngInfoDetector;

impl InfoDetector for PngInfoDetector {
    fn format(&self) -> ImageFormat {
        ImageFormat::PNG
    }

    fn identify(
        &self, stream: &mut ByteReader<dyn Read + '_>, limits: DecoderLimits
    ) -> Result<ImageInfo, ImageErrors> {
        let mut decoder = PngDecoder::new_with_limits(stream, limits);
        decoder
            .decode_headers()
            .map_err(|e| ImageErrors::from(e).at_stage(Stage::Identify))?;

        header_info(&decoder)
    }
}

/// PNG decoder and encoder
#[derive(Copy, Clone, Debug, Default)]
pub struct PngCodec;

impl Decoder for PngCodec {
    fn format(&self) -> ImageFormat {
        ImageFormat::PNG
    }

    fn capabilities(&self) -> CoderCapabilities {
        CoderCapabilities::CANCELLABLE | CoderCapabilities::PROGRESS
    }

    fn read_info(&mut self, state: &mut DecodeState<'_>) -> Result<ImageInfo, ImageErrors> {
        let limits = state.limits();
        PngInfoDetector.identify(state.stream(), limits)
    }

    fn read_frame(&mut self, state: &mut DecodeState<'_>) -> Result<Frame, ImageErrors> {
        let limits = state.limits();
        let (stream, mut monitor) = state.parts();
        let mut decoder = PngDecoder::new_with_limits(stream, limits);

        let pixels = decoder.decode(&mut monitor)?;
        let info = header_info(&decoder).map_err(|e| e.at_stage(Stage::Decode))?;

        let buffer = PixelBuffer::from_u8(pixels, info.width(), info.height(), info.pixel_type())?;
        Ok(Frame::new(buffer))
    }
}

impl Encoder for PngCodec {
    fn format(&self) -> ImageFormat {
        ImageFormat::PNG
    }

    fn capabilities(&self) -> CoderCapabilities {
        CoderCapabilities::CANCELLABLE | CoderCapabilities::PROGRESS
    }

    fn supported_pixel_types(&self) -> &'static [PixelType] {
        PngEncoder::supported_pixel_types()
    }

    fn write_frame(
        &mut self, state: &mut EncodeState<'_>, frame: &dyn PixelSource, _: Duration
    ) -> Result<usize, ImageErrors> {
        let options = state
            .options()
            .resolve(ImageFormat::PNG, CoderOptions::as_png);
        let data = frame.to_contiguous();
        let (width, height) = frame.dimensions();

        let encoder = PngEncoder::new(&data, width, height, frame.pixel_type(), options);
        let (sink, mut monitor) = state.parts();

        Ok(encoder.encode(sink, &mut monitor)?)
    }
}

impl From<PngDecodeErrors> for ImageErrors {
    fn from(value: PngDecodeErrors) -> Self {
        let format = ImageFormat::PNG;

        match value {
            PngDecodeErrors::Interrupted => ImageErrors::Interrupted {
                format,
                stage: Stage::Decode
            },
            PngDecodeErrors::IoErrors(e) => ImageErrors::from_byte_io(e, format, Stage::Decode),
            e => ImageErrors::malformed(format, Stage::Decode, format!("{e:?}").trim_end())
        }
    }
}

impl From<PngEncodeErrors> for ImageErrors {
    fn from(value: PngEncodeErrors) -> Self {
        let format = ImageFormat::PNG;

        match value {
            PngEncodeErrors::UnsupportedPixelType(pixel_type) => {
                ImageErrors::unsupported(format, format!("cannot store {pixel_type:?} pixels"))
            }
            PngEncodeErrors::Interrupted => ImageErrors::Interrupted {
                format,
                stage: Stage::Encode
            },
            PngEncodeErrors::IoErrors(e) => ImageErrors::from_byte_io(e, format, Stage::Encode),
            e => ImageErrors::argument(format!("png: {e:?}").trim_end())
        }
    }
}
