/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use std::io::Write;

use crate::bytestream::ByteIoError;

enum Mode {
    // Big endian
    BE,
    // Little Endian
    LE
}

/// Encapsulates a simple byte writer with
/// support for endian aware writes
///
/// Every byte that reaches the sink is counted, see [`bytes_written`](Self::bytes_written)
pub struct ByteWriter<W: ?Sized> {
    bytes_written: usize,
    inner:         W
}

impl<W: Write> ByteWriter<W> {
    /// Create a new writer for the sink
    pub fn new(sink: W) -> ByteWriter<W> {
        ByteWriter {
            bytes_written: 0,
            inner:         sink
        }
    }

    /// Destroy this writer returning the underlying sink
    pub fn consume(self) -> W {
        self.inner
    }
}

impl<W: Write + ?Sized> ByteWriter<W> {
    /// Write all bytes in `buf` or return an error
    #[inline]
    pub fn write_all(&mut self, buf: &[u8]) -> Result<(), ByteIoError> {
        self.inner.write_all(buf)?;
        self.bytes_written += buf.len();
        Ok(())
    }

    #[inline]
    pub fn write_u8_err(&mut self, byte: u8) -> Result<(), ByteIoError> {
        self.write_all(&[byte])
    }

    /// Flush the underlying sink
    pub fn flush(&mut self) -> Result<(), ByteIoError> {
        self.inner.flush()?;
        Ok(())
    }

    /// Return the number of bytes the writer has written
    #[inline]
    pub const fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }
}

macro_rules! write_single_type {
    ($name:tt,$name2:tt,$name3:tt,$int_type:tt) => {
        impl<W: Write + ?Sized> ByteWriter<W> {
            #[inline(always)]
            fn $name(&mut self, byte: $int_type, mode: Mode) -> Result<(), ByteIoError> {
                let bytes = match mode {
                    Mode::BE => byte.to_be_bytes(),
                    Mode::LE => byte.to_le_bytes()
                };
                self.write_all(&bytes)
            }

            #[doc=concat!("Write ",stringify!($int_type)," as a big endian integer")]
            #[inline]
            pub fn $name2(&mut self, byte: $int_type) -> Result<(), ByteIoError> {
                self.$name(byte, Mode::BE)
            }

            #[doc=concat!("Write ",stringify!($int_type)," as a little endian integer")]
            #[inline]
            pub fn $name3(&mut self, byte: $int_type) -> Result<(), ByteIoError> {
                self.$name(byte, Mode::LE)
            }
        }
    };
}

write_single_type!(write_u16_inner_or_die, write_u16_be_err, write_u16_le_err, u16);
write_single_type!(write_u32_inner_or_die, write_u32_be_err, write_u32_le_err, u32);
write_single_type!(write_i32_inner_or_die, write_i32_be_err, write_i32_le_err, i32);

impl<W: Write + ?Sized> Write for ByteWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.bytes_written += written;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::ByteWriter;

    #[test]
    fn endian_writes_are_counted() {
        let mut sink = Vec::new();
        let mut writer = ByteWriter::new(&mut sink);

        writer.write_u16_le_err(0x0102).unwrap();
        writer.write_u32_be_err(0x0A0B0C0D).unwrap();
        writer.write_u8_err(7).unwrap();

        assert_eq!(writer.bytes_written(), 7);
        assert_eq!(sink, [2, 1, 0x0A, 0x0B, 0x0C, 0x0D, 7]);
    }
}
