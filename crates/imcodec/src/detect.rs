/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Format detection
//!
//! Detection peeks a window as large as the largest header any registered
//! detector declares, then asks the detectors in registration order. The
//! first one that recognises the header wins. Nothing is consumed from
//! the stream, so a decode can follow without rewinding.
use std::io::Read;

use imcodec_core::bytestream::{ByteIoError, ByteReader};
use log::{debug, trace};

use crate::errors::ImageErrors;
use crate::format::ImageFormat;
use crate::registry::CodecRegistry;

/// The first format whose detector claims `header`.
///
/// Every detector sees at most its own header size of the bytes.
pub fn guess_format(header: &[u8], registry: &CodecRegistry) -> Option<ImageFormat> {
    registry.detectors().iter().find_map(|detector| {
        let format = detector.format();
        let window = &header[..header.len().min(format.header_size())];

        trace!("Trying {format} detector on {} bytes", window.len());
        detector.detect(window).then_some(format)
    })
}

/// Detect the format of the image at the current position of `stream`
pub fn detect_format(
    stream: &mut ByteReader<dyn Read + '_>, registry: &CodecRegistry
) -> Result<ImageFormat, ImageErrors> {
    let window = registry.max_header_size();

    if window == 0 {
        return Err(ImageErrors::UnknownFormat);
    }
    let header = stream.peek(window).map_err(|e| match e {
        ByteIoError::StdIoError(err) => ImageErrors::Io(err),
        _ => ImageErrors::UnknownFormat
    })?;

    match guess_format(header, registry) {
        Some(format) => {
            debug!("Detected {format}");
            Ok(format)
        }
        None => Err(ImageErrors::UnknownFormat)
    }
}

#[cfg(test)]
#[cfg(all(feature = "bmp", feature = "png", feature = "jpeg", feature = "tga", feature = "gif"))]
mod tests {
    use super::*;

    #[test]
    fn detection_does_not_consume() {
        let registry = CodecRegistry::with_builtins();
        let bytes = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;";
        let mut reader = ByteReader::new(&bytes[..]);

        assert_eq!(detect_format(&mut reader, &registry).unwrap(), ImageFormat::GIF);
        assert_eq!(detect_format(&mut reader, &registry).unwrap(), ImageFormat::GIF);
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn unknown_and_empty_streams() {
        let registry = CodecRegistry::with_builtins();

        let mut reader = ByteReader::new(&b"hello world, not an image"[..]);
        assert!(matches!(
            detect_format(&mut reader, &registry),
            Err(ImageErrors::UnknownFormat)
        ));
        let mut reader = ByteReader::new(&b""[..]);
        assert!(matches!(
            detect_format(&mut reader, &registry),
            Err(ImageErrors::UnknownFormat)
        ));
        let mut reader = ByteReader::new(&b"\xFF\xD8\xFF"[..]);
        assert!(matches!(
            detect_format(&mut reader, &CodecRegistry::new()),
            Err(ImageErrors::UnknownFormat)
        ));
    }

    #[test]
    fn short_streams_still_match() {
        let registry = CodecRegistry::with_builtins();
        assert_eq!(guess_format(b"\xFF\xD8\xFF", &registry), Some(ImageFormat::JPEG));
        assert_eq!(guess_format(b"\x89PNG", &registry), None);
    }
}
