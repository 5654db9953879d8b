/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Color table construction
//!
//! Frames with few colors get an exact table. Otherwise the colors are
//! reduced by median cut: the box with the widest channel range is split
//! at its pixel-weighted median until the table is full, and every pixel
//! maps to its nearest table entry.

use std::collections::HashMap;

use log::trace;

/// Pixels with alpha below this are written as the transparent index
pub const ALPHA_THRESHOLD: u8 = 128;

pub struct ColorTable {
    pub colors:      Vec<[u8; 3]>,
    pub transparent: Option<u8>
}

impl ColorTable {
    /// Bits needed to address the table, at least one
    pub fn bits(&self) -> u8 {
        let mut bits = 1;

        while (1_usize << bits) < self.colors.len() {
            bits += 1;
        }
        bits
    }

    /// The table padded to a power of two entries, as stored in the file
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0_u8; (1 << self.bits()) * 3];

        for (entry, color) in bytes.chunks_exact_mut(3).zip(&self.colors) {
            entry.copy_from_slice(color);
        }
        bytes
    }
}

#[derive(Clone)]
struct ColorBox {
    /// Unique colors with their pixel counts
    colors: Vec<([u8; 3], u32)>
}

impl ColorBox {
    fn range(&self, channel: usize) -> u8 {
        let (min, max) = self
            .colors
            .iter()
            .fold((u8::MAX, u8::MIN), |(min, max), (c, _)| {
                (min.min(c[channel]), max.max(c[channel]))
            });
        max.saturating_sub(min)
    }

    /// The channel with the largest range and that range
    fn widest(&self) -> (usize, u8) {
        (0..3)
            .map(|channel| (channel, self.range(channel)))
            .max_by_key(|(_, range)| *range)
            .unwrap_or((0, 0))
    }

    fn split(mut self) -> (ColorBox, ColorBox) {
        let (channel, _) = self.widest();

        self.colors.sort_unstable_by_key(|(c, _)| c[channel]);

        let total: u64 = self.colors.iter().map(|(_, n)| u64::from(*n)).sum();
        let mut seen = 0_u64;
        let mut cut = 1;

        for (pos, (_, count)) in self.colors.iter().enumerate() {
            seen += u64::from(*count);
            if seen * 2 >= total {
                cut = pos + 1;
                break;
            }
        }
        // both halves must keep at least one color
        let cut = cut.clamp(1, self.colors.len() - 1);
        let upper = self.colors.split_off(cut);

        (self, ColorBox { colors: upper })
    }

    fn average(&self) -> [u8; 3] {
        let mut sums = [0_u64; 3];
        let mut total = 0_u64;

        for (color, count) in &self.colors {
            for (sum, c) in sums.iter_mut().zip(color) {
                *sum += u64::from(*c) * u64::from(*count);
            }
            total += u64::from(*count);
        }
        let total = total.max(1);
        sums.map(|sum| ((sum + total / 2) / total) as u8)
    }
}

fn median_cut(histogram: &HashMap<[u8; 3], u32>, max_colors: usize) -> Vec<[u8; 3]> {
    let mut boxes = vec![ColorBox {
        colors: histogram.iter().map(|(c, n)| (*c, *n)).collect()
    }];

    while boxes.len() < max_colors {
        let candidate = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.colors.len() > 1)
            .max_by_key(|(_, b)| b.widest().1)
            .map(|(pos, _)| pos);

        let Some(pos) = candidate else {
            break;
        };
        let (low, high) = boxes.swap_remove(pos).split();
        boxes.push(low);
        boxes.push(high);
    }
    boxes.iter().map(ColorBox::average).collect()
}

fn nearest(colors: &[[u8; 3]], target: [u8; 3]) -> u8 {
    let distance = |c: &[u8; 3]| -> u32 {
        c.iter()
            .zip(&target)
            .map(|(a, b)| {
                let d = i32::from(*a) - i32::from(*b);
                (d * d) as u32
            })
            .sum()
    };
    colors
        .iter()
        .enumerate()
        .min_by_key(|(_, c)| distance(c))
        .map(|(pos, _)| pos as u8)
        .unwrap_or(0)
}

/// Build a color table for an RGBA frame
pub fn build_color_table(rgba: &[u8]) -> ColorTable {
    let mut histogram: HashMap<[u8; 3], u32> = HashMap::new();
    let mut has_transparency = false;

    for pixel in rgba.chunks_exact(4) {
        if pixel[3] < ALPHA_THRESHOLD {
            has_transparency = true;
        } else {
            *histogram.entry([pixel[0], pixel[1], pixel[2]]).or_insert(0) += 1;
        }
    }
    let max_colors = if has_transparency { 255 } else { 256 };

    let mut colors = if histogram.len() <= max_colors {
        let mut exact: Vec<[u8; 3]> = histogram.keys().copied().collect();
        exact.sort_unstable();
        exact
    } else {
        trace!(
            "Quantizing {} colors to {}",
            histogram.len(),
            max_colors
        );
        median_cut(&histogram, max_colors)
    };
    let transparent = if has_transparency {
        colors.push([0, 0, 0]);
        Some((colors.len() - 1) as u8)
    } else {
        None
    };
    if colors.is_empty() {
        colors.push([0, 0, 0]);
    }
    ColorTable { colors, transparent }
}

/// Maps pixels to table indices, remembering earlier lookups
pub struct IndexMapper<'a> {
    table: &'a ColorTable,
    cache: HashMap<[u8; 3], u8>
}

impl<'a> IndexMapper<'a> {
    pub fn new(table: &'a ColorTable) -> IndexMapper<'a> {
        let opaque = table.colors.len() - usize::from(table.transparent.is_some());
        let cache = table.colors[..opaque]
            .iter()
            .enumerate()
            .map(|(pos, c)| (*c, pos as u8))
            .collect();

        IndexMapper { table, cache }
    }

    /// Map a row of RGBA pixels to indices
    pub fn map_row(&mut self, rgba: &[u8], out: &mut [u8]) {
        let opaque = self.table.colors.len() - usize::from(self.table.transparent.is_some());

        for (pixel, index) in rgba.chunks_exact(4).zip(out.iter_mut()) {
            *index = match self.table.transparent {
                Some(transparent) if pixel[3] < ALPHA_THRESHOLD => transparent,
                _ => {
                    let color = [pixel[0], pixel[1], pixel[2]];
                    let table = &self.table.colors[..opaque];

                    *self
                        .cache
                        .entry(color)
                        .or_insert_with(|| nearest(table, color))
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_table_for_few_colors() {
        let rgba = [10, 20, 30, 255, 40, 50, 60, 255, 10, 20, 30, 255];
        let table = build_color_table(&rgba);

        assert_eq!(table.colors, [[10, 20, 30], [40, 50, 60]]);
        assert_eq!(table.transparent, None);
        assert_eq!(table.bits(), 1);

        let mut indices = [0; 3];
        IndexMapper::new(&table).map_row(&rgba, &mut indices);
        assert_eq!(indices, [0, 1, 0]);
    }

    #[test]
    fn transparency_takes_the_last_entry() {
        let rgba = [1, 2, 3, 255, 9, 9, 9, 0, 4, 5, 6, 200];
        let table = build_color_table(&rgba);

        assert_eq!(table.transparent, Some(2));
        assert_eq!(table.bits(), 2);

        let mut indices = [0; 3];
        IndexMapper::new(&table).map_row(&rgba, &mut indices);
        assert_eq!(indices, [0, 2, 1]);
    }

    #[test]
    fn many_colors_are_reduced() {
        let rgba: Vec<u8> = (0..4096_u32)
            .flat_map(|x| [(x & 15) as u8 * 16, ((x >> 4) & 15) as u8 * 16, (x >> 8) as u8 * 16, 255])
            .collect();
        let table = build_color_table(&rgba);

        assert!(table.colors.len() <= 256);
        assert!(table.colors.len() > 200);
        assert_eq!(table.bits(), 8);

        // every pixel lands near its color
        let mut indices = vec![0; 4096];
        IndexMapper::new(&table).map_row(&rgba, &mut indices);

        for (pixel, index) in rgba.chunks_exact(4).zip(&indices) {
            let mapped = table.colors[usize::from(*index)];
            for c in 0..3 {
                assert!((i32::from(pixel[c]) - i32::from(mapped[c])).abs() <= 40);
            }
        }
    }
}
