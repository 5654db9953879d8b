/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Row level progress and interruption hooks
//!
//! Codecs call into a [`RowMonitor`] at row boundaries. The monitor
//! answers whether the operation may continue, which is how
//! cancellation and progress callbacks reach the format crates
//! without them knowing about either.

/// An axis aligned rectangle in pixel coordinates
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub x:      usize,
    pub y:      usize,
    pub width:  usize,
    pub height: usize
}

impl Rect {
    pub const fn new(x: usize, y: usize, width: usize, height: usize) -> Rect {
        Rect {
            x,
            y,
            width,
            height
        }
    }

    /// Whether this rectangle lies completely within a `width` x `height` surface
    pub fn fits_within(&self, width: usize, height: usize) -> bool {
        match (self.x.checked_add(self.width), self.y.checked_add(self.height)) {
            (Some(right), Some(bottom)) => right <= width && bottom <= height,
            _ => false
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Receives row completion notices from codecs
pub trait RowMonitor {
    /// Called after `rows_done` out of `total_rows` rows have been
    /// processed, `dirty` is the region that changed since the last call,
    /// when the codec can tell.
    ///
    /// Codecs call this with `rows_done == 0` before they touch the stream.
    ///
    /// Returns `false` if the operation should stop as soon as possible
    fn rows_done(&mut self, rows_done: usize, total_rows: usize, dirty: Option<Rect>) -> bool;
}

/// A monitor which never interrupts and ignores progress
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopMonitor;

impl RowMonitor for NoopMonitor {
    fn rows_done(&mut self, _: usize, _: usize, _: Option<Rect>) -> bool {
        true
    }
}

impl<F: FnMut(usize, usize, Option<Rect>) -> bool> RowMonitor for F {
    fn rows_done(&mut self, rows_done: usize, total_rows: usize, dirty: Option<Rect>) -> bool {
        (self)(rows_done, total_rows, dirty)
    }
}
