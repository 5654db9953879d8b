/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use imcodec_core::options::PngFilter;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PngColor {
    Luma,
    RGB,
    Palette,
    LumaA,
    RGBA
}

impl PngColor {
    pub fn from_int(int: u8) -> Option<PngColor> {
        match int {
            0 => Some(PngColor::Luma),
            2 => Some(PngColor::RGB),
            3 => Some(PngColor::Palette),
            4 => Some(PngColor::LumaA),
            6 => Some(PngColor::RGBA),
            _ => None
        }
    }

    pub const fn to_int(self) -> u8 {
        match self {
            PngColor::Luma => 0,
            PngColor::RGB => 2,
            PngColor::Palette => 3,
            PngColor::LumaA => 4,
            PngColor::RGBA => 6
        }
    }

    pub const fn num_components(self) -> usize {
        match self {
            PngColor::Luma | PngColor::Palette => 1,
            PngColor::LumaA => 2,
            PngColor::RGB => 3,
            PngColor::RGBA => 4
        }
    }

    /// Whether `depth` is allowed for this color type
    pub const fn allows_depth(self, depth: u8) -> bool {
        match self {
            PngColor::Luma => matches!(depth, 1 | 2 | 4 | 8 | 16),
            PngColor::Palette => matches!(depth, 1 | 2 | 4 | 8),
            PngColor::RGB | PngColor::LumaA | PngColor::RGBA => matches!(depth, 8 | 16)
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FilterMethod {
    None,
    Sub,
    Up,
    Average,
    Paeth
}

impl FilterMethod {
    pub const ALL: [FilterMethod; 5] = [
        FilterMethod::None,
        FilterMethod::Sub,
        FilterMethod::Up,
        FilterMethod::Average,
        FilterMethod::Paeth
    ];

    pub fn from_int(int: u8) -> Option<FilterMethod> {
        match int {
            0 => Some(FilterMethod::None),
            1 => Some(FilterMethod::Sub),
            2 => Some(FilterMethod::Up),
            3 => Some(FilterMethod::Average),
            4 => Some(FilterMethod::Paeth),
            _ => None
        }
    }

    pub const fn to_int(self) -> u8 {
        match self {
            FilterMethod::None => 0,
            FilterMethod::Sub => 1,
            FilterMethod::Up => 2,
            FilterMethod::Average => 3,
            FilterMethod::Paeth => 4
        }
    }

    /// The fixed filter an option asks for, `None` for adaptive selection
    pub const fn from_option(filter: PngFilter) -> Option<FilterMethod> {
        match filter {
            PngFilter::Adaptive => None,
            PngFilter::None => Some(FilterMethod::None),
            PngFilter::Sub => Some(FilterMethod::Sub),
            PngFilter::Up => Some(FilterMethod::Up),
            PngFilter::Average => Some(FilterMethod::Average),
            PngFilter::Paeth => Some(FilterMethod::Paeth)
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InterlaceMethod {
    Standard,
    Adam7
}

impl InterlaceMethod {
    pub fn from_int(int: u8) -> Option<InterlaceMethod> {
        match int {
            0 => Some(InterlaceMethod::Standard),
            1 => Some(InterlaceMethod::Adam7),
            _ => None
        }
    }
}
