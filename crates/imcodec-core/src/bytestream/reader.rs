/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use std::fmt::Formatter;
use std::io::{ErrorKind, Read};

use log::trace;

/// Size of the look-ahead buffer allocated on first use
const DEFAULT_CAPACITY: usize = 8192;

/// Size of the scratch used when skipping bytes the caller never sees
const SKIP_CHUNK: usize = 4096;

pub enum ByteIoError {
    StdIoError(std::io::Error),
    // requested, read
    NotEnoughBytes(usize, usize),
    Generic(&'static str)
}

impl ByteIoError {
    /// Returns true if this error was caused by the source
    /// ending before the requested bytes were available
    pub fn is_truncation(&self) -> bool {
        match self {
            ByteIoError::NotEnoughBytes(..) => true,
            ByteIoError::StdIoError(err) => err.kind() == ErrorKind::UnexpectedEof,
            ByteIoError::Generic(_) => false
        }
    }
}

impl std::fmt::Debug for ByteIoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ByteIoError::StdIoError(err) => {
                writeln!(f, "Underlying I/O error {}", err)
            }
            ByteIoError::NotEnoughBytes(expected, found) => {
                writeln!(f, "Not enough bytes, expected {expected} but found {found}")
            }
            ByteIoError::Generic(err) => {
                writeln!(f, "Generic I/O error: {err}")
            }
        }
    }
}

impl std::fmt::Display for ByteIoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

impl std::error::Error for ByteIoError {}

impl From<std::io::Error> for ByteIoError {
    fn from(value: std::io::Error) -> Self {
        ByteIoError::StdIoError(value)
    }
}

impl From<&'static str> for ByteIoError {
    fn from(value: &'static str) -> Self {
        ByteIoError::Generic(value)
    }
}

/// A forward-only reader with a look-ahead window
///
/// Bytes can be peeked without consuming them, the peeked bytes
/// stay buffered and are handed out by the next read. This is what
/// allows format detection and header identification on streams
/// which cannot seek.
///
/// The source is the last field so that a `ByteReader<File>` can be
/// used where a `ByteReader<dyn Read>` is expected.
pub struct ByteReader<R: ?Sized> {
    buffer:   Vec<u8>,
    start:    usize,
    end:      usize,
    position: u64,
    eof:      bool,
    inner:    R
}

impl<R: Read> ByteReader<R> {
    /// Create a new reader for the source
    pub fn new(source: R) -> ByteReader<R> {
        ByteReader {
            buffer:   Vec::new(),
            start:    0,
            end:      0,
            position: 0,
            eof:      false,
            inner:    source
        }
    }

    /// Destroy this reader returning the underlying source.
    ///
    /// Bytes that were peeked but not consumed are lost.
    pub fn consume(self) -> R {
        self.inner
    }
}

impl<R: Read + ?Sized> ByteReader<R> {
    /// Make sure at least `wanted` bytes are buffered, or the source
    /// has been exhausted.
    ///
    /// Returns the number of buffered bytes
    fn fill(&mut self, wanted: usize) -> Result<usize, ByteIoError> {
        let available = self.end - self.start;

        if available >= wanted || self.eof {
            return Ok(available);
        }
        if self.start > 0 {
            self.buffer.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }
        while self.end < wanted {
            if self.end == self.buffer.len() {
                // grow only once the current allocation has been filled
                let new_len = wanted.min(DEFAULT_CAPACITY.max(self.buffer.len() * 2));
                trace!("Growing look-ahead buffer from {} to {new_len} bytes", self.buffer.len());
                self.buffer.resize(new_len, 0);
            }
            match self.inner.read(&mut self.buffer[self.end..]) {
                Ok(0) => {
                    self.eof = true;
                    break;
                }
                Ok(n) => self.end += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ByteIoError::StdIoError(e))
            }
        }
        Ok(self.end - self.start)
    }

    /// Look ahead at most `num_bytes` without consuming them.
    ///
    /// The returned slice is shorter than requested only when the
    /// source ends first.
    pub fn peek(&mut self, num_bytes: usize) -> Result<&[u8], ByteIoError> {
        let available = self.fill(num_bytes)?;
        let len = available.min(num_bytes);
        Ok(&self.buffer[self.start..self.start + len])
    }

    /// Look ahead position bytes and return a reference
    /// to num_bytes from that position, or an error if the
    /// peek would be out of bounds.
    ///
    /// This doesn't increment the position.
    pub fn peek_at(&mut self, position: usize, num_bytes: usize) -> Result<&[u8], ByteIoError> {
        let wanted = position
            .checked_add(num_bytes)
            .ok_or(ByteIoError::Generic("Peek range overflows"))?;
        let available = self.fill(wanted)?;

        if available < wanted {
            return Err(ByteIoError::NotEnoughBytes(wanted, available));
        }
        let start = self.start + position;
        Ok(&self.buffer[start..start + num_bytes])
    }

    /// Read exactly `buf.len()` bytes or return an error
    pub fn read_exact_bytes(&mut self, buf: &mut [u8]) -> Result<(), ByteIoError> {
        let buffered = (self.end - self.start).min(buf.len());

        buf[..buffered].copy_from_slice(&self.buffer[self.start..self.start + buffered]);
        self.start += buffered;

        let mut written = buffered;

        while written < buf.len() {
            if self.eof {
                self.position += written as u64;
                return Err(ByteIoError::NotEnoughBytes(buf.len(), written));
            }
            match self.inner.read(&mut buf[written..]) {
                Ok(0) => self.eof = true,
                Ok(n) => written += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ByteIoError::StdIoError(e))
            }
        }
        self.position += written as u64;
        Ok(())
    }

    /// Read up to `buf.len()` bytes, returning how many were read.
    ///
    /// Zero means the source is exhausted.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, ByteIoError> {
        if self.start == self.end {
            if buf.len() >= DEFAULT_CAPACITY && !self.eof {
                // large reads go straight to the source
                loop {
                    match self.inner.read(buf) {
                        Ok(n) => {
                            if n == 0 {
                                self.eof = true;
                            }
                            self.position += n as u64;
                            return Ok(n);
                        }
                        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                        Err(e) => return Err(ByteIoError::StdIoError(e))
                    }
                }
            }
            self.fill(1)?;
        }
        let len = (self.end - self.start).min(buf.len());
        buf[..len].copy_from_slice(&self.buffer[self.start..self.start + len]);
        self.start += len;
        self.position += len as u64;
        Ok(len)
    }

    #[inline]
    pub fn read_fixed_bytes_or_error<const N: usize>(&mut self) -> Result<[u8; N], ByteIoError> {
        let mut byte_store: [u8; N] = [0; N];
        self.read_exact_bytes(&mut byte_store)?;
        Ok(byte_store)
    }

    #[inline]
    pub fn get_u8_err(&mut self) -> Result<u8, ByteIoError> {
        if self.start < self.end {
            let byte = self.buffer[self.start];
            self.start += 1;
            self.position += 1;
            return Ok(byte);
        }
        let [byte] = self.read_fixed_bytes_or_error::<1>()?;
        Ok(byte)
    }

    /// Skip `num` bytes, erroring out if the source ends first
    pub fn skip(&mut self, num: usize) -> Result<(), ByteIoError> {
        let buffered = (self.end - self.start).min(num);

        self.start += buffered;
        self.position += buffered as u64;

        let mut remaining = num - buffered;
        let mut scratch = [0_u8; SKIP_CHUNK];

        while remaining > 0 {
            let chunk = remaining.min(SKIP_CHUNK);
            let read = self.read_bytes(&mut scratch[..chunk])?;

            if read == 0 {
                return Err(ByteIoError::NotEnoughBytes(num, num - remaining));
            }
            remaining -= read;
        }
        Ok(())
    }

    /// Read everything left in the source into `sink`, returning
    /// the number of bytes appended
    pub fn read_remaining(&mut self, sink: &mut Vec<u8>) -> Result<usize, ByteIoError> {
        let initial = sink.len();

        sink.extend_from_slice(&self.buffer[self.start..self.end]);
        self.start = self.end;

        if !self.eof {
            self.inner.read_to_end(sink)?;
            self.eof = true;
        }
        let appended = sink.len() - initial;
        self.position += appended as u64;
        Ok(appended)
    }

    /// Returns true if there are no more bytes to read
    pub fn eof(&mut self) -> Result<bool, ByteIoError> {
        Ok(self.fill(1)? == 0)
    }

    /// Number of bytes consumed since this reader was created
    #[inline]
    pub const fn position(&self) -> u64 {
        self.position
    }

    /// Mutable access to the underlying source.
    ///
    /// Reading from it directly bypasses the look-ahead window
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }
}

enum Mode {
    // Big endian
    BE,
    // Little Endian
    LE
}

macro_rules! get_single_type {
    ($name:tt,$name2:tt,$name3:tt,$int_type:tt) => {
        impl<R: Read + ?Sized> ByteReader<R> {
            #[inline(always)]
            fn $name(&mut self, mode: Mode) -> Result<$int_type, ByteIoError> {
                const SIZE_OF_VAL: usize = core::mem::size_of::<$int_type>();

                let space = self.read_fixed_bytes_or_error::<SIZE_OF_VAL>()?;

                match mode {
                    Mode::BE => Ok($int_type::from_be_bytes(space)),
                    Mode::LE => Ok($int_type::from_le_bytes(space))
                }
            }

            #[doc=concat!("Read ",stringify!($int_type)," as a big endian integer")]
            #[doc=concat!("Returning an error if the underlying source cannot support a ",stringify!($int_type)," read.")]
            #[inline]
            pub fn $name2(&mut self) -> Result<$int_type, ByteIoError> {
                self.$name(Mode::BE)
            }

            #[doc=concat!("Read ",stringify!($int_type)," as a little endian integer")]
            #[doc=concat!("Returning an error if the underlying source cannot support a ",stringify!($int_type)," read.")]
            #[inline]
            pub fn $name3(&mut self) -> Result<$int_type, ByteIoError> {
                self.$name(Mode::LE)
            }
        }
    };
}

get_single_type!(get_u16_inner_or_die, get_u16_be_err, get_u16_le_err, u16);
get_single_type!(get_u32_inner_or_die, get_u32_be_err, get_u32_le_err, u32);
get_single_type!(get_i32_inner_or_die, get_i32_be_err, get_i32_le_err, i32);

impl<R: Read + ?Sized> Read for ByteReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.read_bytes(buf).map_err(|e| match e {
            ByteIoError::StdIoError(err) => err,
            e => std::io::Error::new(ErrorKind::Other, format!("{:?}", e))
        })
    }
}
