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

/// Errors that can occur during TGA decoding
#[non_exhaustive]
pub enum TgaDecoderErrors {
    /// The header failed structural validation
    InvalidHeader(&'static str),
    GenericStatic(&'static str),
    Generic(String),
    TooLargeDimensions(&'static str, usize, usize),
    /// The row monitor asked us to stop
    Interrupted,
    IoErrors(ByteIoError)
}

impl Debug for TgaDecoderErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidHeader(reason) => writeln!(f, "Invalid TGA header: {reason}"),
            Self::GenericStatic(message) => writeln!(f, "{}", message),
            Self::Generic(message) => writeln!(f, "{}", message),
            Self::TooLargeDimensions(dimension, expected, found) => {
                writeln!(
                    f,
                    "Too large dimensions for {dimension} , {found} exceeds {expected}"
                )
            }
            Self::Interrupted => writeln!(f, "Decoding interrupted"),
            Self::IoErrors(err) => writeln!(f, "{:?}", err)
        }
    }
}

impl Display for TgaDecoderErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

impl std::error::Error for TgaDecoderErrors {}

impl From<ByteIoError> for TgaDecoderErrors {
    fn from(value: ByteIoError) -> Self {
        TgaDecoderErrors::IoErrors(value)
    }
}

/// Errors that can occur during TGA encoding
#[non_exhaustive]
pub enum TgaEncoderErrors {
    UnsupportedPixelType(PixelType),
    /// Expected, found
    WrongInputSize(usize, usize),
    /// TGA stores dimensions in 16 bits
    InvalidDimensions(usize, usize),
    Interrupted,
    IoErrors(ByteIoError)
}

impl Debug for TgaEncoderErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedPixelType(ty) => {
                writeln!(f, "Pixel type {ty:?} cannot be encoded to TGA")
            }
            Self::WrongInputSize(expected, found) => {
                writeln!(f, "Expected input of {expected} bytes but found {found}")
            }
            Self::InvalidDimensions(width, height) => {
                writeln!(f, "Invalid dimensions {width}x{height}, TGA supports 1 to 65535")
            }
            Self::Interrupted => writeln!(f, "Encoding interrupted"),
            Self::IoErrors(err) => writeln!(f, "{:?}", err)
        }
    }
}

impl Display for TgaEncoderErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

impl std::error::Error for TgaEncoderErrors {}

impl From<ByteIoError> for TgaEncoderErrors {
    fn from(value: ByteIoError) -> Self {
        TgaEncoderErrors::IoErrors(value)
    }
}
