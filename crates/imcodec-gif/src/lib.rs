/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! A GIF encoder
//!
//! Writes GIF89a files one RGBA frame at a time. Every frame carries its
//! own color table, built exactly when the frame has few enough colors
//! and by median cut quantization otherwise. Pixels with an alpha below
//! 128 become transparent.
//!
//! Only the identification side of decoding is provided, see
//! [`probe_gif`] and [`screen_dimensions`].

pub use crate::encoder::{probe_gif, screen_dimensions, GifEncoder};
pub use crate::errors::GifEncoderErrors;

mod encoder;
mod errors;
mod lzw;
mod quantize;
