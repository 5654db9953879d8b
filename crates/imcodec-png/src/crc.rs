/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Chunk CRC, computed over the chunk name followed by its data
use flate2::Crc;

pub fn calc_crc(name: &[u8; 4], data: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(name);
    crc.update(data);
    crc.sum()
}

#[test]
fn iend_crc() {
    // every PNG file ends with this
    assert_eq!(calc_crc(b"IEND", &[]), 0xAE42_6082);
}
