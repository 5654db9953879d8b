/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Rectangular windows into pixel sources
use imcodec_core::monitor::Rect;
use imcodec_core::pixel::PixelType;

use crate::buffer::PixelSource;
use crate::errors::ImageErrors;

/// A rectangle of another [`PixelSource`], nothing is copied
///
/// Coordinates are translated on every access, so crops of crops work
/// and always see the current pixels of the underlying source.
///
/// # Example
/// ```
/// use imcodec::buffer::{PixelBuffer, PixelSource};
/// use imcodec::crop::CropView;
/// use imcodec_core::monitor::Rect;
/// use imcodec_core::pixel::PixelType;
///
/// let buffer = PixelBuffer::from_u8((0..16).collect(), 4, 4, PixelType::Gray8).unwrap();
/// let crop = CropView::new(&buffer, Rect::new(1, 2, 2, 2)).unwrap();
///
/// assert_eq!(crop.row(0), &[9, 10]);
/// assert_eq!(crop.pixel_row(1, 1), buffer.pixel_row(2, 3));
/// ```
pub struct CropView<'a, S: PixelSource + ?Sized> {
    source: &'a S,
    rect:   Rect
}

impl<'a, S: PixelSource + ?Sized> CropView<'a, S> {
    /// Create a window, the rectangle must lie completely within the
    /// source and cover at least one pixel
    pub fn new(source: &'a S, rect: Rect) -> Result<CropView<'a, S>, ImageErrors> {
        let (width, height) = source.dimensions();

        if rect.is_empty() {
            return Err(ImageErrors::argument(format!("crop rectangle {rect:?} is empty")));
        }
        if !rect.fits_within(width, height) {
            return Err(ImageErrors::argument(format!(
                "crop rectangle {rect:?} is outside the {width}x{height} source"
            )));
        }
        Ok(CropView { source, rect })
    }

    /// The rectangle in source coordinates
    pub const fn rect(&self) -> Rect {
        self.rect
    }
}

impl<S: PixelSource + ?Sized> PixelSource for CropView<'_, S> {
    fn width(&self) -> usize {
        self.rect.width
    }

    fn height(&self) -> usize {
        self.rect.height
    }

    fn pixel_type(&self) -> PixelType {
        self.source.pixel_type()
    }

    fn row(&self, y: usize) -> &[u8] {
        assert!(y < self.rect.height, "row {y} out of bounds for height {}", self.rect.height);
        let bpp = self.pixel_type().bytes_per_pixel();
        let start = self.rect.x * bpp;

        &self.source.row(y + self.rect.y)[start..start + self.rect.width * bpp]
    }
}

#[cfg(test)]
mod tests {
    use nanorand::{Rng, WyRand};

    use super::*;
    use crate::buffer::PixelBuffer;

    #[test]
    fn crop_matches_source_pixels() {
        let mut rand = WyRand::new_seed(3);

        for pixel_type in [PixelType::Rgb8, PixelType::GrayAlpha16, PixelType::RgbaF32] {
            let (width, height) = (13, 9);
            let mut data = vec![0_u8; width * height * pixel_type.bytes_per_pixel()];
            rand.fill(&mut data);
            let buffer = PixelBuffer::from_u8(data, width, height, pixel_type).unwrap();

            for _ in 0..50 {
                let x = rand.generate_range(0..width);
                let y = rand.generate_range(0..height);
                let w = rand.generate_range(1..=width - x);
                let h = rand.generate_range(1..=height - y);
                let crop = buffer.crop(Rect::new(x, y, w, h)).unwrap();

                for cy in 0..h {
                    for cx in 0..w {
                        assert_eq!(crop.pixel_row(cx, cy), buffer.pixel_row(cx + x, cy + y));
                    }
                }
            }
        }
    }

    #[test]
    fn crops_compose() {
        let buffer = PixelBuffer::from_u8((0..36).collect(), 6, 6, PixelType::Gray8).unwrap();
        let outer = buffer.crop(Rect::new(1, 1, 4, 4)).unwrap();
        let inner = CropView::new(&outer, Rect::new(1, 2, 2, 1)).unwrap();

        assert_eq!(inner.row(0), &[20, 21]);
        assert_eq!(inner.to_contiguous().as_ref(), &[20, 21]);
    }

    #[test]
    fn out_of_bounds_rectangles_are_rejected() {
        let buffer = PixelBuffer::new(4, 4, PixelType::Rgb8).unwrap();

        assert!(buffer.crop(Rect::new(3, 0, 2, 1)).is_err());
        assert!(buffer.crop(Rect::new(0, 0, 0, 1)).is_err());
        assert!(buffer.crop(Rect::new(usize::MAX, 0, 2, 1)).is_err());
        assert!(buffer.crop(Rect::new(0, 0, 4, 4)).is_ok());
    }
}
