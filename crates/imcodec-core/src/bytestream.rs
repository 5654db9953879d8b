/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! A simple implementation of a bytestream reader
//! and writer.
//!
//! The reader is forward only, it never seeks the underlying source.
//! Format detection and header identification work on a look-ahead
//! window which is kept in the reader's buffer, so bytes that were
//! only peeked are still delivered to whoever reads next.
//!
//! The writer counts every byte that reaches the sink, which is
//! how callers learn how large an encoded image was.
pub use reader::{ByteIoError, ByteReader};
pub use writer::ByteWriter;

mod reader;
mod writer;
