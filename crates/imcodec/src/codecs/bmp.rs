/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! BMP support
//!
//! Decoding and encoding is done by the delegate library [imcodec-bmp](imcodec_bmp)
#![cfg(feature = "bmp")]

use std::io::Read;
use std::time::Duration;

pub use imcodec_bmp::*;
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
    table.format(ImageFormat::BMP);
    table.detector(SignatureDetector::new(ImageFormat::BMP, probe_bmp));
    table.info_detector(BmpInfoDetector);
    table.decoder(ImageFormat::BMP, || Box::new(BmpCodec));
    table.encoder(ImageFormat::BMP, || Box::new(BmpCodec));
}

fn header_info<R: Read + ?Sized>(decoder: &BmpDecoder<'_, R>) -> Result<ImageInfo, ImageErrors> {
    match (decoder.dimensions(), decoder.pixel_type()) {
        (Some((width, height)), Some(pixel_type)) => {
            Ok(ImageInfo::new(width, height, pixel_type, ImageFormat::BMP).with_frame_count(1))
        }
        _ => Err(ImageErrors::malformed(
            ImageFormat::BMP,
            Stage::Identify,
            "headers were not decoded"
        ))
    }
}

/// Reads BMP headers
pub struct BmpInfoDetector;

impl InfoDetector for BmpInfoDetector {
    fn format(&self) -> ImageFormat {
        ImageFormat::BMP
    }

    fn identify(
        &self, stream: &mut ByteReader<dyn Read + '_>, limits: DecoderLimits
    ) -> Result<ImageInfo, ImageErrors> {
        let mut decoder = BmpDecoder::new_with_limits(stream, limits);
        decoder
            .decode_headers()
            .map_err(|e| ImageErrors::from(e).at_stage(Stage::Identify))?;

        header_info(&decoder)
    }
}

/// BMP decoder and encoder
#[derive(Copy, Clone, Debug, Default)]
pub struct BmpCodec;

impl Decoder for BmpCodec {
    fn format(&self) -> ImageFormat {
        ImageFormat::BMP
    }

    fn capabilities(&self) -> CoderCapabilities {
        CoderCapabilities::CANCELLABLE | CoderCapabilities::PROGRESS
    }

    fn read_info(&mut self, state: &mut DecodeState<'_>) -> Result<ImageInfo, ImageErrors> {
        let limits = state.limits();
        BmpInfoDetector.identify(state.stream(), limits)
    }

    fn read_frame(&mut self, state: &mut DecodeState<'_>) -> Result<Frame, ImageErrors> {
        let limits = state.limits();
        let (stream, mut monitor) = state.parts();
        let mut decoder = BmpDecoder::new_with_limits(stream, limits);

        let pixels = decoder.decode(&mut monitor)?;
        let info = header_info(&decoder).map_err(|e| e.at_stage(Stage::Decode))?;

        let buffer = PixelBuffer::from_u8(pixels, info.width(), info.height(), info.pixel_type())?;
        Ok(Frame::new(buffer))
    }
}

impl Encoder for BmpCodec {
    fn format(&self) -> ImageFormat {
        ImageFormat::BMP
    }

    fn capabilities(&self) -> CoderCapabilities {
        CoderCapabilities::CANCELLABLE | CoderCapabilities::PROGRESS
    }

    fn supported_pixel_types(&self) -> &'static [PixelType] {
        BmpEncoder::supported_pixel_types()
    }

    fn write_frame(
        &mut self, state: &mut EncodeState<'_>, frame: &dyn PixelSource, _: Duration
    ) -> Result<usize, ImageErrors> {
        let options = state
            .options()
            .resolve(ImageFormat::BMP, CoderOptions::as_bmp);
        let data = frame.to_contiguous();
        let (width, height) = frame.dimensions();

        let encoder = BmpEncoder::new(&data, width, height, frame.pixel_type(), options);
        let (sink, mut monitor) = state.parts();

        Ok(encoder.encode(sink, &mut monitor)?)
    }
}

impl From<BmpDecoderErrors> for ImageErrors {
    fn from(value: BmpDecoderErrors) -> Self {
        let format = ImageFormat::BMP;

        match value {
            BmpDecoderErrors::Interrupted => ImageErrors::Interrupted {
                format,
                stage: Stage::Decode
            },
            BmpDecoderErrors::IoErrors(e) => ImageErrors::from_byte_io(e, format, Stage::Decode),
            e => ImageErrors::malformed(format, Stage::Decode, format!("{e:?}").trim_end())
        }
    }
}

impl From<BmpEncoderErrors> for ImageErrors {
    fn from(value: BmpEncoderErrors) -> Self {
        let format = ImageFormat::BMP;

        match value {
            BmpEncoderErrors::UnsupportedPixelType(pixel_type) => {
                ImageErrors::unsupported(format, format!("cannot store {pixel_type:?} pixels"))
            }
            BmpEncoderErrors::Interrupted => ImageErrors::Interrupted {
                format,
                stage: Stage::Encode
            },
            BmpEncoderErrors::IoErrors(e) => ImageErrors::from_byte_io(e, format, Stage::Encode),
            e => ImageErrors::argument(format!("bmp: {e:?}").trim_end())
        }
    }
}

#[cfg(test)]
mod tests {
    use imcodec_core::bytestream::ByteWriter;

    use super::*;
    use crate::state::CoderState;

    #[test]
    fn identify_leaves_the_stream_alone() {
        let pixels = [1_u8, 2, 3, 4, 5, 6];
        let mut encoded = ByteWriter::new(Vec::new());
        {
            let sink: &mut ByteWriter<dyn std::io::Write + '_> = &mut encoded;
            let mut state = CoderState::new(sink, ImageFormat::BMP);
            let source = PixelBuffer::from_u8(pixels.to_vec(), 2, 1, PixelType::Rgb8).unwrap();
            BmpCodec.write_frame(&mut state, &source, Duration::ZERO).unwrap();
        }
        let bytes = encoded.consume();
        let mut reader = ByteReader::new(bytes.as_slice());
        let first = BmpInfoDetector.identify(&mut reader, DecoderLimits::default()).unwrap();
        let second = BmpInfoDetector.identify(&mut reader, DecoderLimits::default()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.dimensions(), (2, 1));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn encoder_errors_become_argument_errors() {
        let err = ImageErrors::from(BmpEncoderErrors::WrongInputSize(12, 3));
        assert!(matches!(err, ImageErrors::Argument(_)));

        let err = ImageErrors::from(BmpDecoderErrors::InvalidMagicBytes);
        assert_eq!(err.format(), Some(ImageFormat::BMP));
    }
}
