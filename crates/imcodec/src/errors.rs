/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Errors possible during image processing
//!
//! Every format crate has its own error enum, they are converted into
//! [`ImageErrors`] by the codec adapters in [`codecs`](crate::codecs),
//! carrying the format they came from and the stage they happened in.
use std::fmt::{Debug, Display, Formatter};

use imcodec_core::bytestream::ByteIoError;

use crate::format::ImageFormat;

/// The kind of coder a registry lookup was for
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CoderKind {
    Decoder,
    Encoder,
    Detector,
    InfoDetector
}

/// Where in an operation an error happened
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Stage {
    Detect,
    Identify,
    Decode,
    Encode
}

/// All errors possible during image processing
pub enum ImageErrors {
    /// Invalid caller input, raised before any I/O
    Argument(String),
    /// No registered detector recognised the header
    UnknownFormat,
    /// The registry has no coder of this kind for the format
    MissingCoder {
        capability: CoderKind,
        format:     ImageFormat
    },
    /// The format or coder cannot do what was asked
    UnsupportedOperation {
        format: ImageFormat,
        detail: String
    },
    /// The header matched but the data is invalid or truncated
    MalformedData {
        format: ImageFormat,
        stage:  Stage,
        reason: String
    },
    /// Cancelled by a progress callback or a stop token
    Interrupted { format: ImageFormat, stage: Stage },
    /// The caller's stream or the file system failed
    Io(std::io::Error)
}

impl ImageErrors {
    pub(crate) fn argument(reason: impl Into<String>) -> ImageErrors {
        ImageErrors::Argument(reason.into())
    }

    pub(crate) fn malformed(format: ImageFormat, stage: Stage, reason: impl Into<String>) -> ImageErrors {
        ImageErrors::MalformedData {
            format,
            stage,
            reason: reason.into()
        }
    }

    pub(crate) fn unsupported(format: ImageFormat, detail: impl Into<String>) -> ImageErrors {
        ImageErrors::UnsupportedOperation {
            format,
            detail: detail.into()
        }
    }

    /// Wrap a low level reader or writer fault.
    ///
    /// Failures of the stream itself stay I/O errors, running out of
    /// bytes means the data is malformed
    pub(crate) fn from_byte_io(error: ByteIoError, format: ImageFormat, stage: Stage) -> ImageErrors {
        match error {
            ByteIoError::StdIoError(err) if !matches!(err.kind(), std::io::ErrorKind::UnexpectedEof) => {
                ImageErrors::Io(err)
            }
            err => ImageErrors::malformed(format, stage, format!("{err:?}").trim_end())
        }
    }

    /// Move an error raised while decoding into another stage.
    ///
    /// Format crates do not know whether they were called to identify
    /// or to decode, adapters correct the stage after conversion
    pub fn at_stage(self, stage: Stage) -> ImageErrors {
        match self {
            ImageErrors::MalformedData { format, reason, .. } => ImageErrors::MalformedData {
                format,
                stage,
                reason
            },
            ImageErrors::Interrupted { format, .. } => ImageErrors::Interrupted { format, stage },
            other => other
        }
    }

    /// The format this error relates to, when known
    pub fn format(&self) -> Option<ImageFormat> {
        match self {
            ImageErrors::MissingCoder { format, .. }
            | ImageErrors::UnsupportedOperation { format, .. }
            | ImageErrors::MalformedData { format, .. }
            | ImageErrors::Interrupted { format, .. } => Some(*format),
            _ => None
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, ImageErrors::Interrupted { .. })
    }
}

impl Debug for ImageErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageErrors::Argument(reason) => writeln!(f, "Invalid argument: {reason}"),
            ImageErrors::UnknownFormat => writeln!(f, "No registered format recognised the header"),
            ImageErrors::MissingCoder { capability, format } => {
                writeln!(f, "No {capability:?} registered for {format}")
            }
            ImageErrors::UnsupportedOperation { format, detail } => {
                writeln!(f, "Unsupported {format} operation: {detail}")
            }
            ImageErrors::MalformedData {
                format,
                stage,
                reason
            } => writeln!(f, "Malformed {format} data during {stage:?}: {reason}"),
            ImageErrors::Interrupted { format, stage } => {
                writeln!(f, "{format} {stage:?} was interrupted")
            }
            ImageErrors::Io(err) => writeln!(f, "I/O error: {err}")
        }
    }
}

impl Display for ImageErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

impl std::error::Error for ImageErrors {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImageErrors::Io(err) => Some(err),
            _ => None
        }
    }
}

impl From<std::io::Error> for ImageErrors {
    fn from(value: std::io::Error) -> Self {
        ImageErrors::Io(value)
    }
}
