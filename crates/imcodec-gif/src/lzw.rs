/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Variable width LZW as used by GIF
//!
//! Codes are packed least significant bit first. The code width grows
//! by one bit once the next free code no longer fits, up to 12 bits,
//! after which a clear code resets the table.

use std::collections::HashMap;

const MAX_CODE_SIZE: u8 = 12;
const MAX_CODES: u16 = 1 << MAX_CODE_SIZE;

struct BitWriter<'a> {
    out:   &'a mut Vec<u8>,
    acc:   u32,
    nbits: u8
}

impl<'a> BitWriter<'a> {
    fn new(out: &'a mut Vec<u8>) -> BitWriter<'a> {
        BitWriter { out, acc: 0, nbits: 0 }
    }

    #[inline]
    fn write(&mut self, code: u16, size: u8) {
        self.acc |= u32::from(code) << self.nbits;
        self.nbits += size;

        while self.nbits >= 8 {
            self.out.push((self.acc & 0xFF) as u8);
            self.acc >>= 8;
            self.nbits -= 8;
        }
    }

    fn flush(self) {
        if self.nbits > 0 {
            self.out.push((self.acc & 0xFF) as u8);
        }
    }
}

/// Compress palette indices, appending the packed codes to `out`.
///
/// `min_code_size` is the value stored before the image data, between
/// 2 and 8, and every index must be below `1 << min_code_size`.
pub fn lzw_encode(indices: &[u8], min_code_size: u8, out: &mut Vec<u8>) {
    let clear = 1_u16 << min_code_size;
    let end = clear + 1;

    let mut writer = BitWriter::new(out);
    let mut table: HashMap<(u16, u8), u16> = HashMap::new();
    let mut size = min_code_size + 1;
    let mut next = end + 1;

    writer.write(clear, size);

    let mut prefix: Option<u16> = None;

    for &index in indices {
        let Some(current) = prefix else {
            prefix = Some(u16::from(index));
            continue;
        };
        if let Some(&code) = table.get(&(current, index)) {
            prefix = Some(code);
            continue;
        }
        writer.write(current, size);

        table.insert((current, index), next);
        next += 1;

        if next > (1 << size) && size < MAX_CODE_SIZE {
            size += 1;
        }
        if next == MAX_CODES {
            writer.write(clear, size);
            table.clear();
            size = min_code_size + 1;
            next = end + 1;
        }
        prefix = Some(u16::from(index));
    }
    if let Some(current) = prefix {
        writer.write(current, size);
        // the reader widens its codes after this one, before the end code
        if next + 1 > (1 << size) && size < MAX_CODE_SIZE {
            size += 1;
        }
    }
    writer.write(end, size);
    writer.flush();
}

#[cfg(test)]
mod tests {
    use super::lzw_encode;

    #[test]
    fn single_pixel() {
        let mut out = Vec::new();
        lzw_encode(&[1], 2, &mut out);

        // clear (4), index 1, end (5), three bits each
        assert_eq!(out, [0b01_001_100, 0b0000_0001]);
    }

    #[test]
    fn repeated_indices_compress() {
        let mut out = Vec::new();
        lzw_encode(&[0; 10_000], 2, &mut out);

        assert!(out.len() < 200);
    }
}
