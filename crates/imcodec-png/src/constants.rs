/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Size of the IDAT chunks the encoder emits
pub const IDAT_CHUNK_SIZE: usize = 8192;

/// Bytes we are willing to look ahead while searching for the first IDAT chunk
pub const MAX_HEADER_SCAN: usize = 16 << 20;

/// Largest chunk length the format allows
pub const MAX_CHUNK_LENGTH: u32 = (1 << 31) - 1;

/// Largest piece of IDAT data read at once
pub const IDAT_READ_STEP: usize = 1 << 16;

/// Exact length of an IHDR chunk
pub const IHDR_LENGTH: usize = 13;

/// Longest PLTE chunk, 256 RGB entries
pub const MAX_PLTE_LENGTH: usize = 256 * 3;

/// Longest tRNS chunk, one alpha per palette entry
pub const MAX_TRNS_LENGTH: usize = 256;

/// Adam7 passes as (x start, y start, x step, y step)
pub const ADAM7_PASSES: [(usize, usize, usize, usize); 7] = [
    (0, 0, 8, 8),
    (4, 0, 8, 8),
    (0, 4, 4, 8),
    (2, 0, 4, 4),
    (0, 2, 2, 4),
    (1, 0, 2, 2),
    (0, 1, 1, 2)
];
