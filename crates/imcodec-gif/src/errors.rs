/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use std::fmt::{Debug, Display, Formatter};

use imcodec_core::bytestream::ByteIoError;

/// Errors that can occur during GIF encoding
#[non_exhaustive]
pub enum GifEncoderErrors {
    /// Expected, found
    WrongInputSize(usize, usize),
    /// GIF stores dimensions in 16 bits
    InvalidDimensions(usize, usize),
    /// A frame was written after the trailer
    AlreadyFinished,
    /// The row monitor asked us to stop
    Interrupted,
    IoErrors(ByteIoError)
}

impl Debug for GifEncoderErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongInputSize(expected, found) => {
                writeln!(f, "Expected {expected} bytes of RGBA pixels but found {found}")
            }
            Self::InvalidDimensions(width, height) => {
                writeln!(f, "Invalid dimensions {width}x{height}, GIF supports 1 to 65535")
            }
            Self::AlreadyFinished => writeln!(f, "Frame written after the trailer"),
            Self::Interrupted => writeln!(f, "Encoding interrupted"),
            Self::IoErrors(err) => writeln!(f, "{:?}", err)
        }
    }
}

impl Display for GifEncoderErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

impl std::error::Error for GifEncoderErrors {}

impl From<ByteIoError> for GifEncoderErrors {
    fn from(value: ByteIoError) -> Self {
        GifEncoderErrors::IoErrors(value)
    }
}
