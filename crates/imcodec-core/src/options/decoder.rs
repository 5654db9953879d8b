/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Global decoder limits

/// Limits shared by all decoders
///
/// Decoders refuse to decode images larger than the configured
/// dimensions before allocating anything for them.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecoderLimits {
    /// Maximum width for which decoders will
    /// not try to decode images larger than
    /// the specified width.
    ///
    /// - Default value: 16384
    max_width:   usize,
    /// Maximum height for which decoders will not
    /// try to decode images larger than the
    /// specified height
    ///
    /// - Default value: 16384
    max_height:  usize,
    /// Whether decoders should treat recoverable problems
    /// (bad checksums, trailing garbage) as errors
    ///
    /// - Default value: true
    strict_mode: bool
}

impl Default for DecoderLimits {
    fn default() -> Self {
        DecoderLimits {
            max_width:   1 << 14,
            max_height:  1 << 14,
            strict_mode: true
        }
    }
}

impl DecoderLimits {
    /// Limits which only reject what cannot be represented
    pub fn unlimited() -> DecoderLimits {
        DecoderLimits {
            max_width:   usize::MAX,
            max_height:  usize::MAX,
            strict_mode: false
        }
    }

    pub const fn get_max_width(&self) -> usize {
        self.max_width
    }

    pub const fn get_max_height(&self) -> usize {
        self.max_height
    }

    pub const fn get_strict_mode(&self) -> bool {
        self.strict_mode
    }

    /// Set the maximum width for which the decoder will not
    /// try to decode images larger than the specified width
    pub fn set_max_width(mut self, width: usize) -> Self {
        self.max_width = width;
        self
    }

    pub fn set_max_height(mut self, height: usize) -> Self {
        self.max_height = height;
        self
    }

    /// Whether checksum mismatches and similar recoverable
    /// problems should abort decoding
    pub fn set_strict_mode(mut self, yes: bool) -> Self {
        self.strict_mode = yes;
        self
    }

    /// Check dimensions against these limits, returning the
    /// offending dimension name and value on failure
    pub fn check_dimensions(&self, width: usize, height: usize) -> Result<(), (&'static str, usize)> {
        if width > self.max_width {
            return Err(("width", width));
        }
        if height > self.max_height {
            return Err(("height", height));
        }
        Ok(())
    }
}
