/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Entry point for all supported codecs the library understands
//!
//! The codecs here can be enabled and disabled at will through cargo
//! features, the ones compiled in are registered with
//! [`CodecRegistry::with_builtins`](crate::registry::CodecRegistry::with_builtins).
//!
//! | Format | Detect | Identify | Decode | Encode |
//! |--------|--------|----------|--------|--------|
//! | PNG    | yes    | yes      | yes    | yes    |
//! | JPEG   | yes    | yes      | yes    | yes    |
//! | GIF    | yes    | yes      | no     | yes    |
//! | BMP    | yes    | yes      | yes    | yes    |
//! | TGA    | yes    | yes      | yes    | yes    |
//!
//! Detectors run in the order above. TGA has no signature, its header is
//! validated structurally, so it goes last.
#![allow(unused_imports)]

use crate::format::ImageFormat;
use crate::registry::BuiltinTable;
use crate::traits::FormatDetector;

pub mod bmp;
pub mod gif;
pub mod jpeg;
pub mod png;
pub mod tga;

/// A detector comparing the header against a fixed probe function
#[derive(Copy, Clone)]
pub struct SignatureDetector {
    format: ImageFormat,
    probe:  fn(&[u8]) -> bool
}

impl SignatureDetector {
    pub const fn new(format: ImageFormat, probe: fn(&[u8]) -> bool) -> SignatureDetector {
        SignatureDetector { format, probe }
    }
}

impl FormatDetector for SignatureDetector {
    fn format(&self) -> ImageFormat {
        self.format
    }

    fn detect(&self, header: &[u8]) -> bool {
        (self.probe)(header)
    }
}

pub(crate) fn register_builtins(table: &mut BuiltinTable<'_>) {
    #[cfg(feature = "png")]
    png::register(table);
    #[cfg(feature = "jpeg")]
    jpeg::register(table);
    #[cfg(feature = "gif")]
    gif::register(table);
    #[cfg(feature = "bmp")]
    bmp::register(table);
    #[cfg(feature = "tga")]
    tga::register(table);
}
