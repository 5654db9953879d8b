/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Decoder limits and per-format encoder options
//!
//! Decoders share one [`DecoderLimits`] struct, encoders each get an
//! option struct of their own since the knobs of one format rarely
//! mean anything to another.
pub use decoder::DecoderLimits;
pub use encoder::{
    BmpCompression, BmpOptions, GifOptions, GifRepeat, JpegOptions, PngFilter, PngOptions,
    Subsampling, TgaOptions
};

mod decoder;
mod encoder;
