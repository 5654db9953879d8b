/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Loading and saving images
//!
//! [`LoadRequest`] and [`SaveRequest`] bundle everything an operation
//! needs, the free functions at the bottom of this module use the
//! defaults and the global registry.
//!
//! # Example
//! Save a gray image as a BMP in memory and read it back
//! ```
//! use imcodec::buffer::PixelBuffer;
//! use imcodec::format::ImageFormat;
//! use imcodec::imageio::{load, save};
//! use imcodec_core::pixel::PixelType;
//!
//! let buffer = PixelBuffer::from_u8(vec![0, 64, 128, 255], 2, 2, PixelType::Gray8).unwrap();
//! let mut bytes = vec![];
//! let outcome = save(&buffer, ImageFormat::BMP, &mut bytes).unwrap();
//! assert_eq!(outcome.frames_written, 1);
//!
//! let image = load(bytes.as_slice()).unwrap();
//! assert_eq!(image.dimensions(), Some((2, 2)));
//! ```
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

use enough::Stop;
use imcodec_core::bytestream::{ByteReader, ByteWriter};
use imcodec_core::options::DecoderLimits;
use log::{debug, info, warn};

use crate::buffer::PixelSource;
use crate::detect::detect_format;
use crate::errors::ImageErrors;
use crate::format::ImageFormat;
use crate::frame::Image;
use crate::info::ImageInfo;
use crate::options::CoderOptions;
use crate::registry::CodecRegistry;
use crate::session::{DecodeSession, EncodeSession};
use crate::state::CoderState;
use crate::traits::{Encoder, ProgressSink};

/// What a save wrote
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SaveOutcome {
    /// Frames that made it into the file, single frame formats stop after one
    pub frames_written: usize,
    pub bytes_written:  usize
}

/// Options for loading or identifying an image
///
/// The format is detected from the stream unless one is given.
#[derive(Default)]
pub struct LoadRequest<'a> {
    format:   Option<ImageFormat>,
    limits:   DecoderLimits,
    options:  CoderOptions,
    progress: Option<Box<dyn ProgressSink + 'a>>,
    stop:     Option<&'a dyn Stop>,
    registry: Option<&'a CodecRegistry>
}

impl<'a> LoadRequest<'a> {
    pub fn new() -> LoadRequest<'a> {
        LoadRequest::default()
    }

    /// Skip detection and decode as `format`
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_limits(mut self, limits: DecoderLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_options(mut self, options: impl Into<CoderOptions>) -> Self {
        self.options = options.into();
        self
    }

    pub fn with_progress(mut self, sink: impl ProgressSink + 'a) -> Self {
        self.progress = Some(Box::new(sink));
        self
    }

    pub fn with_stop(mut self, stop: &'a dyn Stop) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Use `registry` instead of [`CodecRegistry::global`]
    pub fn with_registry(mut self, registry: &'a CodecRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    fn resolve_format(
        &self, stream: &mut ByteReader<dyn Read + '_>, registry: &CodecRegistry
    ) -> Result<ImageFormat, ImageErrors> {
        match self.format {
            Some(format) => Ok(format),
            None => detect_format(stream, registry)
        }
    }

    fn open<'s>(self, stream: &'s mut ByteReader<dyn Read + 's>) -> Result<DecodeSession<'s>, ImageErrors>
    where
        'a: 's
    {
        let registry = self.registry.unwrap_or_else(|| CodecRegistry::global());
        let format = self.resolve_format(stream, registry)?;
        let decoder = registry.decoder(format)?;

        let mut state = CoderState::new(stream, format)
            .with_options(self.options)
            .with_limits(self.limits);

        if let Some(stop) = self.stop {
            state = state.with_stop(stop);
        }
        if let Some(sink) = self.progress {
            state = state.with_progress(sink);
        }
        Ok(DecodeSession::new(decoder, state))
    }

    /// Decode the first frame of the image in `stream`
    pub fn load_from<R: Read>(self, stream: &mut ByteReader<R>) -> Result<Image, ImageErrors> {
        let mut session = self.open(stream)?;
        let frame = session.read_frame()?;

        Ok(Image::new(vec![frame]).with_format(session.format()))
    }

    /// Decode every frame of the image in `stream`
    pub fn load_all_from<R: Read>(self, stream: &mut ByteReader<R>) -> Result<Image, ImageErrors> {
        let mut session = self.open(stream)?;
        let frames = session.read_all()?;

        Ok(Image::new(frames).with_format(session.format()))
    }

    /// Decode the first frame of the image in `reader`
    pub fn load<R: Read>(self, reader: R) -> Result<Image, ImageErrors> {
        self.load_from(&mut ByteReader::new(reader))
    }

    /// Decode every frame of the image in `reader`
    pub fn load_all<R: Read>(self, reader: R) -> Result<Image, ImageErrors> {
        self.load_all_from(&mut ByteReader::new(reader))
    }

    /// Decode the first frame of the image at `path`
    pub fn load_path<P: AsRef<Path>>(self, path: P) -> Result<Image, ImageErrors> {
        let path = path.as_ref();
        let file = open_file(path)?;

        info!("Loading {path:?}");
        self.load(file)
    }

    /// Read the header of the image in `stream`.
    ///
    /// Nothing is consumed, the stream can be handed to
    /// [`load_from`](Self::load_from) afterwards.
    pub fn identify_from<R: Read>(self, stream: &mut ByteReader<R>) -> Result<ImageInfo, ImageErrors> {
        let stream: &mut ByteReader<dyn Read + '_> = stream;
        let registry = self.registry.unwrap_or_else(|| CodecRegistry::global());
        let format = self.resolve_format(stream, registry)?;

        registry.info_detector(format)?.identify(stream, self.limits)
    }

    /// Read the header of the image in `reader`
    pub fn identify<R: Read>(self, reader: R) -> Result<ImageInfo, ImageErrors> {
        self.identify_from(&mut ByteReader::new(reader))
    }

    /// Read the header of the image at `path`
    pub fn identify_path<P: AsRef<Path>>(self, path: P) -> Result<ImageInfo, ImageErrors> {
        self.identify(open_file(path.as_ref())?)
    }
}

fn open_file(path: &Path) -> Result<File, ImageErrors> {
    if path.as_os_str().is_empty() {
        return Err(ImageErrors::argument("empty path"));
    }
    Ok(File::open(path)?)
}

/// Options for saving an image
#[derive(Default)]
pub struct SaveRequest<'a> {
    format:   Option<ImageFormat>,
    options:  CoderOptions,
    progress: Option<Box<dyn ProgressSink + 'a>>,
    stop:     Option<&'a dyn Stop>,
    registry: Option<&'a CodecRegistry>
}

impl<'a> SaveRequest<'a> {
    pub fn new() -> SaveRequest<'a> {
        SaveRequest::default()
    }

    /// Encode as `format`.
    ///
    /// Saving to a path infers the format from the extension
    /// when this isn't set.
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_options(mut self, options: impl Into<CoderOptions>) -> Self {
        self.options = options.into();
        self
    }

    pub fn with_progress(mut self, sink: impl ProgressSink + 'a) -> Self {
        self.progress = Some(Box::new(sink));
        self
    }

    pub fn with_stop(mut self, stop: &'a dyn Stop) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Use `registry` instead of [`CodecRegistry::global`]
    pub fn with_registry(mut self, registry: &'a CodecRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    fn registry(&self) -> &'a CodecRegistry {
        self.registry.unwrap_or_else(|| CodecRegistry::global())
    }

    fn write_frames<'f, W: Write>(
        self, format: ImageFormat, encoder: Box<dyn Encoder>,
        frames: impl IntoIterator<Item = (&'f dyn PixelSource, Duration)>, writer: W
    ) -> Result<SaveOutcome, ImageErrors> {
        let mut sink = ByteWriter::new(writer);
        let stream: &mut ByteWriter<dyn Write + '_> = &mut sink;

        let mut state = CoderState::new(stream, format).with_options(self.options);

        if let Some(stop) = self.stop {
            state = state.with_stop(stop);
        }
        if let Some(sink) = self.progress {
            state = state.with_progress(sink);
        }
        let mut session = EncodeSession::new(encoder, state);

        for (frame, delay) in frames {
            if !session.accepts_more_frames() {
                debug!("{format} stores a single frame, ignoring the rest");
                break;
            }
            session.write_frame(frame, delay)?;
        }
        let bytes_written = session.finish()?;

        Ok(SaveOutcome {
            frames_written: session.frames_written(),
            bytes_written
        })
    }

    /// Encode a single frame into `writer`.
    ///
    /// The format must have been set with [`with_format`](Self::with_format).
    /// Passing `&mut W` leaves the writer usable afterwards.
    pub fn save<W: Write>(self, source: &dyn PixelSource, writer: W) -> Result<SaveOutcome, ImageErrors> {
        let format = self
            .format
            .ok_or_else(|| ImageErrors::argument("no format to save in"))?;
        let encoder = self.registry().encoder(format)?;

        self.write_frames(format, encoder, [(source, Duration::ZERO)], writer)
    }

    /// Encode every frame of `image` into `writer`.
    ///
    /// Without an explicit format the one the image was decoded from is used.
    pub fn save_all<W: Write>(self, image: &Image, writer: W) -> Result<SaveOutcome, ImageErrors> {
        let format = self
            .format
            .or(image.format())
            .ok_or_else(|| ImageErrors::argument("no format to save in"))?;

        self.save_image(format, image, writer)
    }

    fn save_image<W: Write>(
        self, format: ImageFormat, image: &Image, writer: W
    ) -> Result<SaveOutcome, ImageErrors> {
        if image.frames().is_empty() {
            return Err(ImageErrors::argument("image has no frames"));
        }
        let encoder = self.registry().encoder(format)?;
        let frames = image
            .frames()
            .iter()
            .map(|frame| (frame.buffer() as &dyn PixelSource, frame.delay()));

        self.write_frames(format, encoder, frames, writer)
    }

    /// Encode every frame of `image` to a file at `path`.
    ///
    /// Everything that can be checked is checked before the file is
    /// created, a file left half written by a failed encode is removed.
    pub fn save_to_path<P: AsRef<Path>>(self, image: &Image, path: P) -> Result<SaveOutcome, ImageErrors> {
        let path = path.as_ref();

        if path.as_os_str().is_empty() {
            return Err(ImageErrors::argument("empty path"));
        }
        let format = match self.format {
            Some(format) => format,
            None => {
                let extension = path
                    .extension()
                    .and_then(|x| x.to_str())
                    .ok_or_else(|| ImageErrors::argument(format!("{path:?} has no extension")))?;

                self.registry()
                    .format_by_extension(extension)
                    .ok_or_else(|| {
                        ImageErrors::argument(format!("no format is known by the extension {extension}"))
                    })?
            }
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(ImageErrors::argument(format!(
                    "directory {parent:?} does not exist"
                )));
            }
        }
        if image.frames().is_empty() {
            return Err(ImageErrors::argument("image has no frames"));
        }
        // fail on a missing encoder before touching the file system
        self.registry().encoder(format)?;

        info!("Saving {path:?} as {format}");
        let file = BufWriter::new(File::create(path)?);

        let result = self.save_image(format, image, file);

        if result.is_err() {
            if let Err(e) = std::fs::remove_file(path) {
                warn!("Could not remove partial file {path:?}: {e}");
            }
        }
        result
    }
}

/// Decode the first frame of an image, detecting its format
pub fn load<R: Read>(reader: R) -> Result<Image, ImageErrors> {
    LoadRequest::new().load(reader)
}

/// Decode every frame of an image, detecting its format
pub fn load_all<R: Read>(reader: R) -> Result<Image, ImageErrors> {
    LoadRequest::new().load_all(reader)
}

/// Decode the first frame of the image stored at `path`
pub fn load_path<P: AsRef<Path>>(path: P) -> Result<Image, ImageErrors> {
    LoadRequest::new().load_path(path)
}

/// Read the header of an image without decoding pixels
pub fn identify<R: Read>(reader: R) -> Result<ImageInfo, ImageErrors> {
    LoadRequest::new().identify(reader)
}

/// Read the header of the image stored at `path`
pub fn identify_path<P: AsRef<Path>>(path: P) -> Result<ImageInfo, ImageErrors> {
    LoadRequest::new().identify_path(path)
}

/// Encode `source` as `format` into `writer`
pub fn save<W: Write>(
    source: &dyn PixelSource, format: ImageFormat, writer: W
) -> Result<SaveOutcome, ImageErrors> {
    SaveRequest::new().with_format(format).save(source, writer)
}

/// Encode every frame of `image` as `format` into `writer`
pub fn save_all<W: Write>(image: &Image, format: ImageFormat, writer: W) -> Result<SaveOutcome, ImageErrors> {
    SaveRequest::new().with_format(format).save_all(image, writer)
}

/// Encode `image` to `path`, picking the format from the extension
pub fn save_to_path<P: AsRef<Path>>(image: &Image, path: P) -> Result<SaveOutcome, ImageErrors> {
    SaveRequest::new().save_to_path(image, path)
}
