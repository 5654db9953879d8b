/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use std::fmt::{Debug, Display, Formatter};

use imcodec_core::bytestream::ByteIoError;
use imcodec_core::pixel::PixelType;

/// BMP errors that can occur during decoding
#[non_exhaustive]
pub enum BmpDecoderErrors {
    /// The file/bytes do not start with `BM`
    InvalidMagicBytes,
    /// Generic message
    GenericStatic(&'static str),
    /// Generic allocated message
    Generic(String),
    /// Too large dimensions for a given width or
    /// height
    TooLargeDimensions(&'static str, usize, usize),
    /// A calculation overflowed
    OverFlowOccurred,
    /// The row monitor asked us to stop
    Interrupted,
    IoErrors(ByteIoError)
}

impl Debug for BmpDecoderErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMagicBytes => {
                writeln!(f, "Invalid magic bytes, file does not start with BM")
            }
            Self::GenericStatic(header) => {
                writeln!(f, "{}", header)
            }
            Self::TooLargeDimensions(dimension, expected, found) => {
                writeln!(
                    f,
                    "Too large dimensions for {dimension} , {found} exceeds {expected}"
                )
            }
            Self::Generic(message) => {
                writeln!(f, "{}", message)
            }
            Self::OverFlowOccurred => {
                writeln!(f, "Overflow occurred")
            }
            Self::Interrupted => {
                writeln!(f, "Decoding interrupted")
            }
            Self::IoErrors(err) => {
                writeln!(f, "{:?}", err)
            }
        }
    }
}

impl Display for BmpDecoderErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

impl std::error::Error for BmpDecoderErrors {}

impl From<ByteIoError> for BmpDecoderErrors {
    fn from(value: ByteIoError) -> Self {
        BmpDecoderErrors::IoErrors(value)
    }
}

/// BMP errors that can occur during encoding
#[non_exhaustive]
pub enum BmpEncoderErrors {
    /// The pixel type cannot be stored in a BMP file
    UnsupportedPixelType(PixelType),
    /// Pixel data length does not match the dimensions,
    /// expected, found
    WrongInputSize(usize, usize),
    /// Width or height is zero or does not fit in the header
    InvalidDimensions(usize, usize),
    /// The row monitor asked us to stop
    Interrupted,
    IoErrors(ByteIoError)
}

impl Debug for BmpEncoderErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedPixelType(ty) => {
                writeln!(f, "Pixel type {ty:?} cannot be encoded to BMP")
            }
            Self::WrongInputSize(expected, found) => {
                writeln!(f, "Expected input of {expected} bytes but found {found}")
            }
            Self::InvalidDimensions(width, height) => {
                writeln!(f, "Invalid dimensions {width}x{height} for BMP")
            }
            Self::Interrupted => {
                writeln!(f, "Encoding interrupted")
            }
            Self::IoErrors(err) => {
                writeln!(f, "{:?}", err)
            }
        }
    }
}

impl Display for BmpEncoderErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

impl std::error::Error for BmpEncoderErrors {}

impl From<ByteIoError> for BmpEncoderErrors {
    fn from(value: ByteIoError) -> Self {
        BmpEncoderErrors::IoErrors(value)
    }
}
