/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Core routines shared by all imcodec libraries
//!
//! This crate provides a set of core routines shared
//! by the decoders and encoders under the `imcodec` umbrella
//!
//! It currently contains
//!
//! - A forward-only bytestream reader with look-ahead, and a counting writer,
//!   both with endian aware reads and writes
//! - Pixel type descriptions shared by images (channel roles, bit depth and transfer)
//! - Per-format encoder options and decoder limits
//! - A row monitor, the hook through which codecs report progress
//!   and learn about cancellation
//!
//! # Features
//!  - `serde`: Enables serializing of options and pixel descriptions
//!
pub mod bytestream;
pub mod monitor;
pub mod options;
pub mod pixel;
pub mod utils;
