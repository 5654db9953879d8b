/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Pixel buffers and row access
//!
//! Everything that can hand out rows of pixels implements [`PixelSource`].
//! Rows are always untyped bytes in the pixel type's memory layout, with
//! multi-byte samples in native endian. [`TypedRows`] reinterprets them
//! as `u16` or `f32` slices when the memory is suitably aligned.
//!
//! - [`PixelBuffer`] owns its pixels, decoders return these
//! - [`PixelView`] and [`PixelViewMut`] wrap caller memory, optionally with
//!   padding between rows
//! - [`CropView`](crate::crop::CropView) is a window into any other source
use std::borrow::Cow;
use std::fmt::{Debug, Formatter};

use bytemuck::Pod;
use imcodec_core::monitor::Rect;
use imcodec_core::pixel::{BitDepth, PixelType};

use crate::crop::CropView;
use crate::errors::ImageErrors;

/// A source of pixel rows
pub trait PixelSource {
    fn width(&self) -> usize;

    fn height(&self) -> usize;

    fn pixel_type(&self) -> PixelType;

    /// Bytes of row `y`, exactly [`row_bytes`](Self::row_bytes) long.
    ///
    /// # Panics
    /// If `y` is not below the height
    fn row(&self, y: usize) -> &[u8];

    fn dimensions(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    /// Length of a row in bytes, padding excluded
    fn row_bytes(&self) -> usize {
        self.width() * self.pixel_type().bytes_per_pixel()
    }

    /// Bytes of the single pixel at column `x` of row `y`
    ///
    /// # Panics
    /// If the position lies outside the source
    fn pixel_row(&self, x: usize, y: usize) -> &[u8] {
        let bpp = self.pixel_type().bytes_per_pixel();
        &self.row(y)[x * bpp..(x + 1) * bpp]
    }

    /// All rows back to back, if the memory is already laid out that way
    fn as_contiguous(&self) -> Option<&[u8]> {
        None
    }

    /// All rows back to back, copying only when rows are not adjacent in memory
    fn to_contiguous(&self) -> Cow<'_, [u8]> {
        if let Some(bytes) = self.as_contiguous() {
            return Cow::Borrowed(bytes);
        }
        let mut bytes = Vec::with_capacity(self.row_bytes() * self.height());

        for y in 0..self.height() {
            bytes.extend_from_slice(self.row(y));
        }
        Cow::Owned(bytes)
    }
}

/// Typed access to the rows of a [`PixelSource`]
pub trait TypedRows: PixelSource {
    /// Row `y` as samples of type `T`.
    ///
    /// Returns `None` if `T` is not the size of a sample of this pixel
    /// type, or if the row is not aligned for `T`.
    fn typed_row<T: Pod>(&self, y: usize) -> Option<&[T]> {
        if std::mem::size_of::<T>() != self.pixel_type().depth().size_of() {
            return None;
        }
        bytemuck::try_cast_slice(self.row(y)).ok()
    }
}

impl<S: PixelSource + ?Sized> TypedRows for S {}

fn checked_len(width: usize, height: usize, pixel_type: PixelType) -> Result<usize, ImageErrors> {
    width
        .checked_mul(height)
        .and_then(|x| x.checked_mul(pixel_type.bytes_per_pixel()))
        .ok_or_else(|| ImageErrors::argument(format!("{width}x{height} {pixel_type:?} image is too large")))
}

#[derive(Clone, PartialEq)]
enum Storage {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>)
}

impl Storage {
    fn zeroed(depth: BitDepth, len: usize) -> Storage {
        match depth {
            BitDepth::Eight => Storage::U8(vec![0; len]),
            BitDepth::Sixteen => Storage::U16(vec![0; len / 2]),
            BitDepth::Float32 => Storage::F32(vec![0.0; len / 4])
        }
    }

    fn as_bytes(&self) -> &[u8] {
        match self {
            Storage::U8(data) => data,
            Storage::U16(data) => bytemuck::cast_slice(data),
            Storage::F32(data) => bytemuck::cast_slice(data)
        }
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Storage::U8(data) => data,
            Storage::U16(data) => bytemuck::cast_slice_mut(data),
            Storage::F32(data) => bytemuck::cast_slice_mut(data)
        }
    }
}

/// An image owning its pixels
///
/// Samples are stored in a vector of their natural type, so typed row
/// access always succeeds for the buffer's own sample type.
#[derive(Clone, PartialEq)]
pub struct PixelBuffer {
    width:      usize,
    height:     usize,
    pixel_type: PixelType,
    storage:    Storage
}

impl PixelBuffer {
    /// Create a buffer with all samples set to zero
    pub fn new(width: usize, height: usize, pixel_type: PixelType) -> Result<PixelBuffer, ImageErrors> {
        let len = checked_len(width, height, pixel_type)?;

        Ok(PixelBuffer {
            width,
            height,
            pixel_type,
            storage: Storage::zeroed(pixel_type.depth(), len)
        })
    }

    /// Create a buffer from bytes in the pixel type's layout,
    /// multi-byte samples in native endian
    pub fn from_u8(
        data: Vec<u8>, width: usize, height: usize, pixel_type: PixelType
    ) -> Result<PixelBuffer, ImageErrors> {
        let expected = checked_len(width, height, pixel_type)?;

        if data.len() != expected {
            return Err(ImageErrors::argument(format!(
                "{width}x{height} {pixel_type:?} image needs {expected} bytes, found {}",
                data.len()
            )));
        }
        let storage = match pixel_type.depth() {
            BitDepth::Eight => Storage::U8(data),
            BitDepth::Sixteen => Storage::U16(
                data.chunks_exact(2)
                    .map(|x| u16::from_ne_bytes([x[0], x[1]]))
                    .collect()
            ),
            BitDepth::Float32 => Storage::F32(
                data.chunks_exact(4)
                    .map(|x| f32::from_ne_bytes([x[0], x[1], x[2], x[3]]))
                    .collect()
            )
        };
        Ok(PixelBuffer {
            width,
            height,
            pixel_type,
            storage
        })
    }

    /// Create a buffer from sixteen bit samples
    pub fn from_u16(
        data: Vec<u16>, width: usize, height: usize, pixel_type: PixelType
    ) -> Result<PixelBuffer, ImageErrors> {
        Self::check_samples(data.len(), width, height, pixel_type, BitDepth::Sixteen)?;

        Ok(PixelBuffer {
            width,
            height,
            pixel_type,
            storage: Storage::U16(data)
        })
    }

    /// Create a buffer from floating point samples
    pub fn from_f32(
        data: Vec<f32>, width: usize, height: usize, pixel_type: PixelType
    ) -> Result<PixelBuffer, ImageErrors> {
        Self::check_samples(data.len(), width, height, pixel_type, BitDepth::Float32)?;

        Ok(PixelBuffer {
            width,
            height,
            pixel_type,
            storage: Storage::F32(data)
        })
    }

    fn check_samples(
        samples: usize, width: usize, height: usize, pixel_type: PixelType, depth: BitDepth
    ) -> Result<(), ImageErrors> {
        if pixel_type.depth() != depth {
            return Err(ImageErrors::argument(format!(
                "{pixel_type:?} does not store {depth:?} samples"
            )));
        }
        let expected = checked_len(width, height, pixel_type)? / depth.size_of();

        if samples != expected {
            return Err(ImageErrors::argument(format!(
                "{width}x{height} {pixel_type:?} image needs {expected} samples, found {samples}"
            )));
        }
        Ok(())
    }

    /// All pixel bytes, rows back to back
    pub fn as_bytes(&self) -> &[u8] {
        self.storage.as_bytes()
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.storage.as_bytes_mut()
    }

    /// Samples of a sixteen bit buffer
    pub fn as_u16(&self) -> Option<&[u16]> {
        match &self.storage {
            Storage::U16(data) => Some(data),
            _ => None
        }
    }

    /// Samples of a floating point buffer
    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.storage {
            Storage::F32(data) => Some(data),
            _ => None
        }
    }

    /// Mutable bytes of row `y`
    ///
    /// # Panics
    /// If `y` is not below the height
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let row_bytes = self.row_bytes();
        &mut self.as_bytes_mut()[y * row_bytes..(y + 1) * row_bytes]
    }

    /// Borrow the pixels as a view
    pub fn view(&self) -> PixelView<'_> {
        PixelView {
            data:       self.as_bytes(),
            width:      self.width,
            height:     self.height,
            stride:     self.row_bytes(),
            pixel_type: self.pixel_type
        }
    }

    /// A window into this buffer, see [`CropView`]
    pub fn crop(&self, rect: Rect) -> Result<CropView<'_, PixelBuffer>, ImageErrors> {
        CropView::new(self, rect)
    }
}

impl PixelSource for PixelBuffer {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    fn row(&self, y: usize) -> &[u8] {
        assert!(y < self.height, "row {y} out of bounds for height {}", self.height);
        let row_bytes = self.row_bytes();
        &self.as_bytes()[y * row_bytes..(y + 1) * row_bytes]
    }

    fn as_contiguous(&self) -> Option<&[u8]> {
        Some(self.as_bytes())
    }
}

impl Debug for PixelBuffer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixel_type", &self.pixel_type)
            .finish()
    }
}

fn check_view(
    len: usize, width: usize, height: usize, stride: usize, pixel_type: PixelType
) -> Result<(), ImageErrors> {
    let row_bytes = checked_len(width, 1, pixel_type)?;

    if stride < row_bytes {
        return Err(ImageErrors::argument(format!(
            "stride {stride} is shorter than a row of {row_bytes} bytes"
        )));
    }
    let needed = match height {
        0 => 0,
        h => stride
            .checked_mul(h - 1)
            .and_then(|x| x.checked_add(row_bytes))
            .ok_or_else(|| ImageErrors::argument("view dimensions overflow"))?
    };
    if len < needed {
        return Err(ImageErrors::argument(format!(
            "buffer of {len} bytes is too small for a {width}x{height} {pixel_type:?} view, {needed} needed"
        )));
    }
    Ok(())
}

/// Pixels in memory owned by someone else
#[derive(Copy, Clone)]
pub struct PixelView<'a> {
    data:       &'a [u8],
    width:      usize,
    height:     usize,
    stride:     usize,
    pixel_type: PixelType
}

impl<'a> PixelView<'a> {
    /// Wrap tightly packed rows
    pub fn new(
        data: &'a [u8], width: usize, height: usize, pixel_type: PixelType
    ) -> Result<PixelView<'a>, ImageErrors> {
        let stride = checked_len(width, 1, pixel_type)?;
        Self::with_stride(data, width, height, stride, pixel_type)
    }

    /// Wrap rows that start `stride` bytes apart
    pub fn with_stride(
        data: &'a [u8], width: usize, height: usize, stride: usize, pixel_type: PixelType
    ) -> Result<PixelView<'a>, ImageErrors> {
        check_view(data.len(), width, height, stride, pixel_type)?;

        Ok(PixelView {
            data,
            width,
            height,
            stride,
            pixel_type
        })
    }

    pub const fn stride(&self) -> usize {
        self.stride
    }
}

impl PixelSource for PixelView<'_> {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    fn row(&self, y: usize) -> &[u8] {
        assert!(y < self.height, "row {y} out of bounds for height {}", self.height);
        let start = y * self.stride;
        &self.data[start..start + self.row_bytes()]
    }

    fn as_contiguous(&self) -> Option<&[u8]> {
        (self.stride == self.row_bytes()).then(|| &self.data[..self.stride * self.height])
    }
}

/// Writable pixels in memory owned by someone else
pub struct PixelViewMut<'a> {
    data:       &'a mut [u8],
    width:      usize,
    height:     usize,
    stride:     usize,
    pixel_type: PixelType
}

impl<'a> PixelViewMut<'a> {
    pub fn new(
        data: &'a mut [u8], width: usize, height: usize, pixel_type: PixelType
    ) -> Result<PixelViewMut<'a>, ImageErrors> {
        let stride = checked_len(width, 1, pixel_type)?;
        Self::with_stride(data, width, height, stride, pixel_type)
    }

    pub fn with_stride(
        data: &'a mut [u8], width: usize, height: usize, stride: usize, pixel_type: PixelType
    ) -> Result<PixelViewMut<'a>, ImageErrors> {
        check_view(data.len(), width, height, stride, pixel_type)?;

        Ok(PixelViewMut {
            data,
            width,
            height,
            stride,
            pixel_type
        })
    }

    /// Mutable bytes of row `y`
    ///
    /// # Panics
    /// If `y` is not below the height
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        assert!(y < self.height, "row {y} out of bounds for height {}", self.height);
        let start = y * self.stride;
        let row_bytes = self.row_bytes();
        &mut self.data[start..start + row_bytes]
    }
}

impl PixelSource for PixelViewMut<'_> {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    fn row(&self, y: usize) -> &[u8] {
        assert!(y < self.height, "row {y} out of bounds for height {}", self.height);
        let start = y * self.stride;
        &self.data[start..start + self.row_bytes()]
    }

    fn as_contiguous(&self) -> Option<&[u8]> {
        (self.stride == self.row_bytes()).then(|| &self.data[..self.stride * self.height])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixteen_bit_buffers_are_typed() {
        let bytes: Vec<u8> = [1_u16, 2, 300, 65535]
            .iter()
            .flat_map(|x| x.to_ne_bytes())
            .collect();
        let buffer = PixelBuffer::from_u8(bytes, 2, 1, PixelType::GrayAlpha16).unwrap();

        assert_eq!(buffer.typed_row::<u16>(0), Some(&[1, 2, 300, 65535][..]));
        assert_eq!(buffer.typed_row::<f32>(0), None);
        assert_eq!(buffer.as_u16().map(|x| x.len()), Some(4));
    }

    #[test]
    fn overflowing_dimensions_are_rejected() {
        for (width, height) in [(usize::MAX, usize::MAX), (usize::MAX, 1), (usize::MAX / 2, 3)] {
            assert!(matches!(
                PixelBuffer::new(width, height, PixelType::Rgba16),
                Err(ImageErrors::Argument(_))
            ));
        }
        let zeroed = PixelBuffer::new(3, 2, PixelType::Rgba16).unwrap();
        assert_eq!(zeroed.as_bytes(), &[0; 48][..]);
    }

    #[test]
    fn wrong_sizes_are_rejected() {
        assert!(matches!(
            PixelBuffer::from_u8(vec![0; 5], 2, 1, PixelType::Rgb8),
            Err(ImageErrors::Argument(_))
        ));
        assert!(PixelBuffer::from_f32(vec![0.0; 6], 2, 1, PixelType::Rgb16).is_err());
        assert!(PixelBuffer::from_f32(vec![0.0; 6], 2, 1, PixelType::RgbF32).is_ok());
    }

    #[test]
    fn strided_views() {
        // two rows of two gray pixels, three bytes apart
        let data = [1, 2, 99, 3, 4];
        let view = PixelView::with_stride(&data, 2, 2, 3, PixelType::Gray8).unwrap();

        assert_eq!(view.row(1), &[3, 4]);
        assert_eq!(view.pixel_row(1, 0), &[2]);
        assert!(view.as_contiguous().is_none());
        assert_eq!(view.to_contiguous().as_ref(), &[1, 2, 3, 4]);

        assert!(PixelView::with_stride(&data, 2, 2, 4, PixelType::Gray8).is_err());
        assert!(PixelView::with_stride(&data, 2, 2, 1, PixelType::Gray8).is_err());
    }

    #[test]
    fn mutable_views_write_through() {
        let mut data = [0_u8; 12];
        {
            let mut view = PixelViewMut::new(&mut data, 2, 2, PixelType::Rgb8).unwrap();
            view.row_mut(1).copy_from_slice(&[1, 2, 3, 4, 5, 6]);
        }
        assert_eq!(&data[6..], &[1, 2, 3, 4, 5, 6]);
    }
}
