/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Image coding for the imcodec family of codecs
//!
//! This crate ties the per-format codecs together. It provides
//!
//! - A registry of formats and their detectors, identifiers, decoders and encoders
//! - Format detection from the first bytes of a stream
//! - Pixel buffers and views, with cropping and pixel type conversion
//! - Decode and encode sessions that enforce the coder lifecycle
//! - [`load`](imageio::load), [`save`](imageio::save) and
//!   [`identify`](imageio::identify) for the common cases
//! - Progress reporting and cooperative cancellation
//!
//! # Features
//! Each format can be compiled out with its feature, `bmp`, `png`, `jpeg`,
//! `tga` and `gif`, all are enabled by default.
//!
//! - `serde-support`: Serialize pixel descriptions and options
pub mod buffer;
pub mod codecs;
pub mod convert;
pub mod crop;
pub mod detect;
pub mod errors;
pub mod format;
pub mod frame;
pub mod imageio;
pub mod info;
pub mod options;
pub mod pool;
pub mod registry;
pub mod session;
pub mod state;
pub mod traits;

pub use imcodec_core;
