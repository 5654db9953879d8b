/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use std::io::Write;

use imcodec_core::bytestream::ByteWriter;
use imcodec_core::monitor::{Rect, RowMonitor};
use imcodec_core::options::{GifOptions, GifRepeat};
use log::trace;

use crate::errors::GifEncoderErrors;
use crate::lzw::lzw_encode;
use crate::quantize::{build_color_table, IndexMapper};

const EXTENSION_INTRODUCER: u8 = 0x21;
const GRAPHIC_CONTROL_LABEL: u8 = 0xF9;
const APPLICATION_LABEL: u8 = 0xFF;
const IMAGE_SEPARATOR: u8 = 0x2C;
const TRAILER: u8 = 0x3B;

/// Disposal method 2, restore the frame area to the background
const DISPOSE_TO_BACKGROUND: u8 = 2 << 2;

/// Returns true if `bytes` start with a GIF signature
pub fn probe_gif(bytes: &[u8]) -> bool {
    matches!(bytes.get(0..6), Some(b"GIF87a" | b"GIF89a"))
}

/// Logical screen width and height from the first ten bytes of a GIF
pub fn screen_dimensions(bytes: &[u8]) -> Option<(usize, usize)> {
    if !probe_gif(bytes) {
        return None;
    }
    let screen = bytes.get(6..10)?;
    let width = u16::from_le_bytes([screen[0], screen[1]]);
    let height = u16::from_le_bytes([screen[2], screen[3]]);

    Some((usize::from(width), usize::from(height)))
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum EncoderState {
    Created,
    Writing,
    Finished
}

/// A frame by frame GIF encoder
///
/// All frames share the logical screen size given at construction.
///
/// # Example
/// ```
/// use imcodec_core::bytestream::ByteWriter;
/// use imcodec_core::monitor::NoopMonitor;
/// use imcodec_core::options::GifOptions;
/// use imcodec_gif::GifEncoder;
///
/// let red = [255, 0, 0, 255].repeat(4);
/// let blue = [0, 0, 255, 255].repeat(4);
///
/// let mut sink = ByteWriter::new(Vec::new());
/// let mut encoder = GifEncoder::new(2, 2, GifOptions::default());
///
/// encoder.write_frame(&mut sink, &red, 50, &mut NoopMonitor).unwrap();
/// encoder.write_frame(&mut sink, &blue, 50, &mut NoopMonitor).unwrap();
/// encoder.finish(&mut sink).unwrap();
///
/// assert!(imcodec_gif::probe_gif(&sink.consume()));
/// ```
pub struct GifEncoder {
    width:   usize,
    height:  usize,
    options: GifOptions,
    state:   EncoderState,
    frames:  usize
}

impl GifEncoder {
    pub fn new(width: usize, height: usize, options: GifOptions) -> GifEncoder {
        GifEncoder {
            width,
            height,
            options,
            state: EncoderState::Created,
            frames: 0
        }
    }

    /// Logical screen size as (width, height)
    pub const fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Number of frames written so far
    pub const fn frames_written(&self) -> usize {
        self.frames
    }

    fn check_dimensions(&self) -> Result<(), GifEncoderErrors> {
        let max = usize::from(u16::MAX);

        if self.width == 0 || self.height == 0 || self.width > max || self.height > max {
            return Err(GifEncoderErrors::InvalidDimensions(self.width, self.height));
        }
        Ok(())
    }

    fn write_header<W: Write + ?Sized>(&mut self, sink: &mut ByteWriter<W>) -> Result<(), GifEncoderErrors> {
        sink.write_all(b"GIF89a")?;
        sink.write_u16_le_err(self.width as u16)?;
        sink.write_u16_le_err(self.height as u16)?;
        // no global color table, background index, no aspect ratio
        sink.write_all(&[0, 0, 0])?;

        let loops = match self.options.get_repeat() {
            GifRepeat::Infinite => Some(0),
            GifRepeat::Finite(0) => None,
            GifRepeat::Finite(count) => Some(count)
        };
        if let Some(loops) = loops {
            sink.write_all(&[EXTENSION_INTRODUCER, APPLICATION_LABEL, 11])?;
            sink.write_all(b"NETSCAPE2.0")?;
            sink.write_all(&[3, 1])?;
            sink.write_u16_le_err(loops)?;
            sink.write_u8_err(0)?;
        }
        self.state = EncoderState::Writing;
        Ok(())
    }

    /// Write one frame of RGBA pixels shown for `delay` hundredths of a second.
    ///
    /// The file header goes out with the first frame. Nothing is written
    /// when the monitor refuses to start.
    pub fn write_frame<W: Write + ?Sized>(
        &mut self, sink: &mut ByteWriter<W>, rgba: &[u8], delay: u16, monitor: &mut dyn RowMonitor
    ) -> Result<usize, GifEncoderErrors> {
        self.check_dimensions()?;

        if self.state == EncoderState::Finished {
            return Err(GifEncoderErrors::AlreadyFinished);
        }
        let expected = self.width * self.height * 4;

        if rgba.len() != expected {
            return Err(GifEncoderErrors::WrongInputSize(expected, rgba.len()));
        }
        if !monitor.rows_done(0, self.height, None) {
            return Err(GifEncoderErrors::Interrupted);
        }
        let table = build_color_table(rgba);
        let bits = table.bits();

        trace!(
            "Frame {}: {} colors, transparent: {:?}",
            self.frames,
            table.colors.len(),
            table.transparent
        );

        let mut indices = vec![0_u8; self.width * self.height];
        let mut mapper = IndexMapper::new(&table);

        for (y, (row, out)) in rgba
            .chunks_exact(self.width * 4)
            .zip(indices.chunks_exact_mut(self.width))
            .enumerate()
        {
            mapper.map_row(row, out);

            if !monitor.rows_done(y + 1, self.height, Some(Rect::new(0, y, self.width, 1))) {
                return Err(GifEncoderErrors::Interrupted);
            }
        }
        let min_code_size = bits.max(2);
        let mut compressed = Vec::with_capacity(indices.len() / 2);
        lzw_encode(&indices, min_code_size, &mut compressed);

        let start = sink.bytes_written();

        if self.state == EncoderState::Created {
            self.write_header(sink)?;
        }
        // graphic control extension
        let (flags, transparent_index) = match table.transparent {
            Some(index) => (DISPOSE_TO_BACKGROUND | 1, index),
            None => (0, 0)
        };
        sink.write_all(&[EXTENSION_INTRODUCER, GRAPHIC_CONTROL_LABEL, 4, flags])?;
        sink.write_u16_le_err(delay)?;
        sink.write_all(&[transparent_index, 0])?;

        // image descriptor with a local color table
        sink.write_u8_err(IMAGE_SEPARATOR)?;
        sink.write_u16_le_err(0)?;
        sink.write_u16_le_err(0)?;
        sink.write_u16_le_err(self.width as u16)?;
        sink.write_u16_le_err(self.height as u16)?;
        sink.write_u8_err(0x80 | (bits - 1))?;
        sink.write_all(&table.to_bytes())?;

        sink.write_u8_err(min_code_size)?;

        for block in compressed.chunks(255) {
            sink.write_u8_err(block.len() as u8)?;
            sink.write_all(block)?;
        }
        sink.write_u8_err(0)?;

        self.frames += 1;

        Ok(sink.bytes_written() - start)
    }

    /// Write the trailer, completing the file.
    ///
    /// A file without frames still gets its header.
    pub fn finish<W: Write + ?Sized>(&mut self, sink: &mut ByteWriter<W>) -> Result<usize, GifEncoderErrors> {
        let start = sink.bytes_written();

        match self.state {
            EncoderState::Finished => return Ok(0),
            EncoderState::Created => {
                self.check_dimensions()?;
                self.write_header(sink)?;
            }
            EncoderState::Writing => {}
        }
        sink.write_u8_err(TRAILER)?;
        sink.flush()?;

        self.state = EncoderState::Finished;
        Ok(sink.bytes_written() - start)
    }
}
