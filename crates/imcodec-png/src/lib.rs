/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! A PNG decoder and encoder
//!
//! # Decoding
//! - All color types, at all bit depths the format allows (1 to 16 bits)
//! - Adam7 interlaced images
//! - Transparency chunks, turned into an alpha channel
//! - CRC and zlib checksum verification, relaxed when the decoder limits are not strict
//!
//! Samples narrower than eight bits are scaled up to eight bits, palette images
//! are expanded to RGB(A) and sixteen bit samples are returned in native endian.
//!
//! # Encoding
//! - Gray, gray alpha, RGB and RGBA at eight and sixteen bits
//! - Per row filter selection with a configurable deflate effort
//!
//! Inflating is done by `zune-inflate`, deflating by `flate2`
pub use crate::decoder::{probe_png, PngDecoder};
pub use crate::encoder::PngEncoder;
pub use crate::error::{PngDecodeErrors, PngEncodeErrors};

mod constants;
mod crc;
mod decoder;
mod encoder;
mod enums;
mod error;
mod filters;
mod headers;
