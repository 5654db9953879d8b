/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use std::fmt::{Debug, Display, Formatter};

use imcodec_core::bytestream::ByteIoError;
use imcodec_core::pixel::PixelType;
use zune_inflate::errors::InflateDecodeErrors;

pub enum PngDecodeErrors {
    BadSignature,
    GenericStatic(&'static str),
    Generic(String),
    /// Chunk name, stored crc, computed crc
    BadCrc([u8; 4], u32, u32),
    TooLargeDimensions(&'static str, usize, usize),
    ZlibDecodeErrors(InflateDecodeErrors),
    /// The row monitor asked us to stop
    Interrupted,
    IoErrors(ByteIoError)
}

impl Debug for PngDecodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadSignature => writeln!(f, "Bad PNG signature, not a png"),
            Self::GenericStatic(val) => writeln!(f, "{}", val),
            Self::Generic(val) => writeln!(f, "{}", val),
            Self::BadCrc(name, stored, computed) => writeln!(
                f,
                "CRC mismatch in {} chunk, stored {stored:#010X}, computed {computed:#010X}",
                String::from_utf8_lossy(name)
            ),
            Self::TooLargeDimensions(dimension, expected, found) => {
                writeln!(
                    f,
                    "Too large dimensions for {dimension} , {found} exceeds {expected}"
                )
            }
            Self::ZlibDecodeErrors(err) => writeln!(f, "Error decoding idat chunks {:?}", err),
            Self::Interrupted => writeln!(f, "Decoding interrupted"),
            Self::IoErrors(err) => writeln!(f, "{:?}", err)
        }
    }
}

impl Display for PngDecodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

impl std::error::Error for PngDecodeErrors {}

impl From<&'static str> for PngDecodeErrors {
    fn from(val: &'static str) -> Self {
        Self::GenericStatic(val)
    }
}

impl From<String> for PngDecodeErrors {
    fn from(val: String) -> Self {
        Self::Generic(val)
    }
}

impl From<ByteIoError> for PngDecodeErrors {
    fn from(val: ByteIoError) -> Self {
        Self::IoErrors(val)
    }
}

pub enum PngEncodeErrors {
    UnsupportedPixelType(PixelType),
    /// Expected, found
    WrongInputSize(usize, usize),
    InvalidDimensions(usize, usize),
    Interrupted,
    IoErrors(ByteIoError)
}

impl Debug for PngEncodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedPixelType(ty) => writeln!(f, "Pixel type {ty:?} cannot be encoded to PNG"),
            Self::WrongInputSize(expected, found) => {
                writeln!(f, "Expected input of {expected} bytes but found {found}")
            }
            Self::InvalidDimensions(width, height) => {
                writeln!(f, "Invalid dimensions {width}x{height} for PNG")
            }
            Self::Interrupted => writeln!(f, "Encoding interrupted"),
            Self::IoErrors(err) => writeln!(f, "{:?}", err)
        }
    }
}

impl Display for PngEncodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

impl std::error::Error for PngEncodeErrors {}

impl From<ByteIoError> for PngEncodeErrors {
    fn from(val: ByteIoError) -> Self {
        Self::IoErrors(val)
    }
}

impl From<std::io::Error> for PngEncodeErrors {
    fn from(val: std::io::Error) -> Self {
        Self::IoErrors(ByteIoError::StdIoError(val))
    }
}
