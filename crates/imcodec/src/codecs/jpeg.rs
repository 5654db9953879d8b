/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! JPEG support
//!
//! Decoding is done by [zune-jpeg](zune_jpeg), encoding by
//! [jpeg-encoder](jpeg_encoder). Neither reports progress row by row,
//! so JPEG coders report coarse progress, 0% before and 100% after the
//! whole image is processed, and check for cancellation at those points.
#![cfg(feature = "jpeg")]

use std::io::Read;
use std::time::Duration;

use imcodec_core::bytestream::ByteReader;
use imcodec_core::monitor::{Rect, RowMonitor};
use imcodec_core::options::DecoderLimits;
use imcodec_core::pixel::PixelType;
use jpeg_encoder::{ColorType, SamplingFactor};
use log::trace;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

use crate::buffer::{PixelBuffer, PixelSource};
use crate::codecs::SignatureDetector;
use crate::errors::{ImageErrors, Stage};
use crate::format::ImageFormat;
use crate::frame::Frame;
use crate::info::ImageInfo;
use crate::options::CoderOptions;
use crate::pool::byte_pool;
use crate::registry::BuiltinTable;
use crate::state::{DecodeState, EncodeState};
use crate::traits::{CoderCapabilities, Decoder, Encoder, InfoDetector};

/// How far into the stream the frame header is searched for
const MAX_MARKER_SCAN: usize = 1 << 20;

pub(crate) fn register(table: &mut BuiltinTable<'_>) {
    table.format(ImageFormat::JPEG);
    table.detector(SignatureDetector::new(ImageFormat::JPEG, probe_jpeg));
    table.info_detector(JpegInfoDetector);
    table.decoder(ImageFormat::JPEG, || Box::new(JpegCodec));
    table.encoder(ImageFormat::JPEG, || Box::new(JpegCodec));
}

/// Returns true if `bytes` start with a JPEG start of image marker
pub fn probe_jpeg(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0xFF, 0xD8, 0xFF])
}

/// Start of frame markers, every `0xC0-0xCF` except DHT, JPG and DAC
const fn is_start_of_frame(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

fn malformed(reason: impl Into<String>) -> ImageErrors {
    ImageErrors::malformed(ImageFormat::JPEG, Stage::Identify, reason)
}

/// Walk the markers up to the frame header, returning width, height
/// and the number of components.
///
/// Everything is peeked, the stream does not move.
fn scan_frame_header<R: Read + ?Sized>(stream: &mut ByteReader<R>) -> Result<(usize, usize, u8), ImageErrors> {
    let io_error = |e| ImageErrors::from_byte_io(e, ImageFormat::JPEG, Stage::Identify);

    if stream.peek_at(0, 2).map_err(io_error)? != [0xFF, 0xD8] {
        return Err(malformed("missing start of image marker"));
    }
    let mut position = 2;

    loop {
        if position > MAX_MARKER_SCAN {
            return Err(malformed("no frame header in the first megabyte"));
        }
        if stream.peek_at(position, 1).map_err(io_error)?[0] != 0xFF {
            return Err(malformed(format!("expected a marker at offset {position}")));
        }
        // any number of fill bytes may precede a marker
        while stream.peek_at(position + 1, 1).map_err(io_error)?[0] == 0xFF {
            position += 1;
        }
        let marker = stream.peek_at(position + 1, 1).map_err(io_error)?[0];
        position += 2;

        match marker {
            0x01 | 0xD0..=0xD7 => continue,
            0xD9 | 0xDA => return Err(malformed("image data starts before the frame header")),
            _ => ()
        }
        let length = stream.peek_at(position, 2).map_err(io_error)?;
        let length = usize::from(u16::from_be_bytes([length[0], length[1]]));

        if length < 2 {
            return Err(malformed(format!("segment length {length} is too short")));
        }
        if is_start_of_frame(marker) {
            let frame = stream.peek_at(position + 2, 6).map_err(io_error)?;
            let precision = frame[0];
            let height = usize::from(u16::from_be_bytes([frame[1], frame[2]]));
            let width = usize::from(u16::from_be_bytes([frame[3], frame[4]]));
            let components = frame[5];

            trace!("SOF marker {marker:#04X}, precision {precision}");
            trace!("Width: {width}, height: {height}, components: {components}");

            return Ok((width, height, components));
        }
        position += length;
    }
}

/// Reads JPEG frame headers
pub struct JpegInfoDetector;

impl InfoDetector for JpegInfoDetector {
    fn format(&self) -> ImageFormat {
        ImageFormat::JPEG
    }

    fn identify(
        &self, stream: &mut ByteReader<dyn Read + '_>, limits: DecoderLimits
    ) -> Result<ImageInfo, ImageErrors> {
        let (width, height, components) = scan_frame_header(stream)?;

        if width == 0 || height == 0 {
            return Err(malformed(format!("invalid dimensions {width}x{height}")));
        }
        if let Err((dimension, value)) = limits.check_dimensions(width, height) {
            return Err(malformed(format!("{dimension} {value} exceeds the decoder limits")));
        }
        let pixel_type = match components {
            1 => PixelType::Gray8,
            3 | 4 => PixelType::Rgb8,
            n => return Err(malformed(format!("unsupported number of components {n}")))
        };
        Ok(ImageInfo::new(width, height, pixel_type, ImageFormat::JPEG).with_frame_count(1))
    }
}

/// JPEG decoder and encoder
#[derive(Copy, Clone, Debug, Default)]
pub struct JpegCodec;

impl JpegCodec {
    fn interrupted(stage: Stage) -> ImageErrors {
        ImageErrors::Interrupted {
            format: ImageFormat::JPEG,
            stage
        }
    }
}

impl Decoder for JpegCodec {
    fn format(&self) -> ImageFormat {
        ImageFormat::JPEG
    }

    fn capabilities(&self) -> CoderCapabilities {
        CoderCapabilities::CANCELLABLE | CoderCapabilities::PROGRESS
    }

    fn read_info(&mut self, state: &mut DecodeState<'_>) -> Result<ImageInfo, ImageErrors> {
        let limits = state.limits();
        JpegInfoDetector.identify(state.stream(), limits)
    }

    fn read_frame(&mut self, state: &mut DecodeState<'_>) -> Result<Frame, ImageErrors> {
        let limits = state.limits();
        let info = JpegInfoDetector
            .identify(state.stream(), limits)
            .map_err(|e| e.at_stage(Stage::Decode))?;
        let (width, height) = info.dimensions();
        let (stream, mut monitor) = state.parts();

        if !monitor.rows_done(0, height, None) {
            return Err(Self::interrupted(Stage::Decode));
        }
        let mut data = byte_pool().acquire_or(Vec::new);
        stream
            .read_remaining(&mut data)
            .map_err(|e| ImageErrors::from_byte_io(e, ImageFormat::JPEG, Stage::Decode))?;

        let colorspace = match info.pixel_type() {
            PixelType::Gray8 => ColorSpace::Luma,
            _ => ColorSpace::RGB
        };
        let options = DecoderOptions::default()
            .set_max_width(limits.get_max_width())
            .set_max_height(limits.get_max_height())
            .set_strict_mode(limits.get_strict_mode())
            .jpeg_set_out_colorspace(colorspace);

        let mut decoder = JpegDecoder::new_with_options(data.as_slice(), options);
        let pixels = decoder.decode().map_err(|e| {
            ImageErrors::malformed(ImageFormat::JPEG, Stage::Decode, format!("{e:?}"))
        })?;

        if !monitor.rows_done(height, height, Some(Rect::new(0, 0, width, height))) {
            return Err(Self::interrupted(Stage::Decode));
        }
        let buffer = PixelBuffer::from_u8(pixels, width, height, info.pixel_type()).map_err(|_| {
            ImageErrors::malformed(
                ImageFormat::JPEG,
                Stage::Decode,
                "decoded size does not match the frame header"
            )
        })?;
        Ok(Frame::new(buffer))
    }
}

impl Encoder for JpegCodec {
    fn format(&self) -> ImageFormat {
        ImageFormat::JPEG
    }

    fn capabilities(&self) -> CoderCapabilities {
        CoderCapabilities::CANCELLABLE | CoderCapabilities::PROGRESS
    }

    fn supported_pixel_types(&self) -> &'static [PixelType] {
        &[PixelType::Gray8, PixelType::Rgb8, PixelType::Rgba8]
    }

    fn write_frame(
        &mut self, state: &mut EncodeState<'_>, frame: &dyn PixelSource, _: Duration
    ) -> Result<usize, ImageErrors> {
        let options = state
            .options()
            .resolve(ImageFormat::JPEG, CoderOptions::as_jpeg);
        let (width, height) = frame.dimensions();

        let (Ok(w), Ok(h)) = (u16::try_from(width), u16::try_from(height)) else {
            return Err(ImageErrors::argument(format!(
                "{width}x{height} is too large for a JPEG image"
            )));
        };
        if w == 0 || h == 0 {
            return Err(ImageErrors::argument(format!("cannot encode a {width}x{height} image")));
        }
        let color = match frame.pixel_type() {
            PixelType::Gray8 => ColorType::Luma,
            PixelType::Rgb8 => ColorType::Rgb,
            PixelType::Rgba8 => ColorType::Rgba,
            other => {
                return Err(ImageErrors::unsupported(
                    ImageFormat::JPEG,
                    format!("cannot store {other:?} pixels")
                ))
            }
        };
        let data = frame.to_contiguous();
        let (sink, mut monitor) = state.parts();

        if !monitor.rows_done(0, height, None) {
            return Err(Self::interrupted(Stage::Encode));
        }
        let quality = options.get_quality().max(1);
        let subsample = options.get_subsampling().subsample_at(quality);
        let sampling = if subsample {
            SamplingFactor::R_4_2_0
        } else {
            SamplingFactor::R_4_4_4
        };
        trace!("Quality: {quality}, chroma subsampling: {subsample}");

        let mut encoded = byte_pool().acquire_or(Vec::new);
        let mut encoder = jpeg_encoder::Encoder::new(&mut *encoded, quality);
        encoder.set_sampling_factor(sampling);
        encoder.set_progressive(options.get_progressive());

        encoder.encode(&data, w, h, color).map_err(|e| {
            ImageErrors::unsupported(ImageFormat::JPEG, format!("encoder failed: {e:?}"))
        })?;

        if !monitor.rows_done(height, height, Some(Rect::new(0, 0, width, height))) {
            return Err(Self::interrupted(Stage::Encode));
        }
        sink.write_all(&encoded)
            .map_err(|e| ImageErrors::from_byte_io(e, ImageFormat::JPEG, Stage::Encode))?;

        Ok(encoded.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identify(bytes: &[u8]) -> Result<ImageInfo, ImageErrors> {
        let mut reader = ByteReader::new(bytes);
        JpegInfoDetector.identify(&mut reader, DecoderLimits::default())
    }

    #[test]
    fn frame_header_is_found_past_other_segments() {
        let mut file = vec![0xFF, 0xD8];
        // APP0 with a four byte payload, preceded by a fill byte
        file.extend_from_slice(&[0xFF, 0xFF, 0xE0, 0x00, 0x06, 1, 2, 3, 4]);
        // DQT stub
        file.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x02]);
        // SOF2, 8 bits, 300 high, 641 wide, one component
        file.extend_from_slice(&[0xFF, 0xC2, 0x00, 0x0B, 8, 0x01, 0x2C, 0x02, 0x81, 1, 1, 0x11, 0]);

        let info = identify(&file).unwrap();

        assert_eq!(info.dimensions(), (641, 300));
        assert_eq!(info.pixel_type(), PixelType::Gray8);
        assert_eq!(identify(&file).unwrap(), info);
    }

    #[test]
    fn scans_before_frames_are_malformed() {
        let file = [0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x02];

        assert!(matches!(
            identify(&file),
            Err(ImageErrors::MalformedData {
                stage: Stage::Identify,
                ..
            })
        ));
        assert!(identify(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]).is_err());
    }

    #[test]
    fn hierarchy_markers_are_not_frames() {
        assert!(is_start_of_frame(0xC0));
        assert!(is_start_of_frame(0xCF));
        assert!(!is_start_of_frame(0xC4));
        assert!(!is_start_of_frame(0xCC));
        assert!(!is_start_of_frame(0xDB));
    }
}
