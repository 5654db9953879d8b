/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Scanline filters
//!
//! `bpp` is the distance in bytes to the corresponding byte of the
//! pixel on the left, at least one even for sub-byte depths.
//! `prev` is the previous reconstructed row, all zeros for the first row.

use crate::enums::FilterMethod;

#[inline(always)]
pub fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let a = i16::from(a);
    let b = i16::from(b);
    let c = i16::from(c);
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();

    if pa <= pb && pa <= pc {
        a as u8
    } else if pb <= pc {
        b as u8
    } else {
        c as u8
    }
}

/// Reverse a filter in place, `row` holds the filtered bytes on entry
/// and the reconstructed bytes on exit
pub fn unfilter_row(filter: FilterMethod, prev: &[u8], row: &mut [u8], bpp: usize) {
    match filter {
        FilterMethod::None => {}
        FilterMethod::Sub => {
            for i in bpp..row.len() {
                row[i] = row[i].wrapping_add(row[i - bpp]);
            }
        }
        FilterMethod::Up => {
            for (out, above) in row.iter_mut().zip(prev) {
                *out = out.wrapping_add(*above);
            }
        }
        FilterMethod::Average => {
            for i in 0..row.len() {
                let left = if i >= bpp { u16::from(row[i - bpp]) } else { 0 };
                // this needs to be performed with at least 9 bits of precision
                let avg = ((left + u16::from(prev[i])) >> 1) as u8;
                row[i] = row[i].wrapping_add(avg);
            }
        }
        FilterMethod::Paeth => {
            for i in 0..row.len() {
                let (left, upper_left) = if i >= bpp {
                    (row[i - bpp], prev[i - bpp])
                } else {
                    (0, 0)
                };
                row[i] = row[i].wrapping_add(paeth(left, prev[i], upper_left));
            }
        }
    }
}

/// Apply a filter to `row`, writing the filtered bytes to `out`
pub fn filter_row(filter: FilterMethod, prev: &[u8], row: &[u8], out: &mut [u8], bpp: usize) {
    match filter {
        FilterMethod::None => out.copy_from_slice(row),
        FilterMethod::Sub => {
            for i in 0..row.len() {
                let left = if i >= bpp { row[i - bpp] } else { 0 };
                out[i] = row[i].wrapping_sub(left);
            }
        }
        FilterMethod::Up => {
            for i in 0..row.len() {
                out[i] = row[i].wrapping_sub(prev[i]);
            }
        }
        FilterMethod::Average => {
            for i in 0..row.len() {
                let left = if i >= bpp { u16::from(row[i - bpp]) } else { 0 };
                let avg = ((left + u16::from(prev[i])) >> 1) as u8;
                out[i] = row[i].wrapping_sub(avg);
            }
        }
        FilterMethod::Paeth => {
            for i in 0..row.len() {
                let (left, upper_left) = if i >= bpp {
                    (row[i - bpp], prev[i - bpp])
                } else {
                    (0, 0)
                };
                out[i] = row[i].wrapping_sub(paeth(left, prev[i], upper_left));
            }
        }
    }
}

/// Pick the filter with the smallest sum of absolute values,
/// treating filtered bytes as signed.
///
/// Leaves the winning filtered row in `out`
pub fn choose_and_filter(prev: &[u8], row: &[u8], out: &mut [u8], scratch: &mut [u8], bpp: usize) -> FilterMethod {
    let mut best = FilterMethod::None;
    let mut best_sum = u64::MAX;

    for filter in FilterMethod::ALL {
        filter_row(filter, prev, row, scratch, bpp);

        let sum: u64 = scratch
            .iter()
            .map(|x| u64::from((*x as i8).unsigned_abs()))
            .sum();

        if sum < best_sum {
            best_sum = sum;
            best = filter;
            out.copy_from_slice(scratch);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_filter_reverses() {
        let prev: Vec<u8> = (0..24).map(|x| (x * 37 % 251) as u8).collect();
        let row: Vec<u8> = (0..24).map(|x| (x * 91 % 253) as u8).collect();

        for filter in FilterMethod::ALL {
            for bpp in [1, 3, 4, 8] {
                let mut filtered = vec![0; row.len()];
                filter_row(filter, &prev, &row, &mut filtered, bpp);
                unfilter_row(filter, &prev, &mut filtered, bpp);
                assert_eq!(filtered, row, "{filter:?} bpp {bpp}");
            }
        }
    }

    #[test]
    fn flat_rows_prefer_up() {
        let prev = [10_u8; 12];
        let row = [10_u8, 200, 3, 10, 200, 3, 10, 200, 3, 10, 200, 3];
        let mut out = [0; 12];
        let mut scratch = [0; 12];

        // identical rows make Up produce all zeros
        let same = choose_and_filter(&row, &row, &mut out, &mut scratch, 3);
        assert_eq!(same, FilterMethod::Up);
        assert!(out.iter().all(|x| *x == 0));

        let _ = choose_and_filter(&prev, &row, &mut out, &mut scratch, 3);
    }
}
