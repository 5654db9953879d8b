/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! A BMP decoder and encoder
//!
//! # Supported formats (decoding)
//! - RLE (4 bit and 8 bit)
//! - Paletted images (1 bit, 2 bits, 4 bits and 8 bits), gray palettes decode to gray
//! - Masked images (16 bit and 32 bit formats)
//! - Plain 24 and 32 bit images, stored bottom-up or top-down
//!
//! # Supported formats (encoding)
//! - Gray, as 8 bit images with a gray palette, optionally RLE8 compressed
//! - RGB, as 24 bit images, or RLE8 palette images when there are at most 256 colors
//! - RGBA, as 32 bit images with a V4 header carrying the channel masks
//!
//! # Unsupported formats
//! - Embedded PNG and JPEGs
//!
//! Both directions report each finished row to a
//! [`RowMonitor`](imcodec_core::monitor::RowMonitor), which can stop the operation.

pub use crate::decoder::{probe_bmp, BmpDecoder};
pub use crate::encoder::BmpEncoder;
pub use crate::errors::{BmpDecoderErrors, BmpEncoderErrors};

mod common;
mod decoder;
mod encoder;
mod errors;
