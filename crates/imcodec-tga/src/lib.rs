/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! A TGA (Truevision TARGA) decoder and encoder
//!
//! # Decoding
//! - Color mapped, true color and grayscale images
//! - Raw and run length encoded pixel data, runs may cross scanlines
//! - 8, 15, 16, 24 and 32 bits per pixel
//! - All four image origins
//!
//! # Encoding
//! - Gray8, Rgb8 and Rgba8 pixels, raw or run length encoded
//! - Images are written top-down, followed by a TGA 2.0 footer
//!
//! TGA has no magic bytes, [`probe_tga`] validates the 18 byte header
//! structurally instead. It should be asked after every format that
//! does have a signature.

pub use crate::common::probe_tga;
pub use crate::decoder::TgaDecoder;
pub use crate::encoder::TgaEncoder;
pub use crate::errors::{TgaDecoderErrors, TgaEncoderErrors};

mod common;
mod decoder;
mod encoder;
mod errors;
