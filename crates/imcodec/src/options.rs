/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Options handed to a coder for one operation
use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

pub use imcodec_core::options::*;
use log::warn;

use crate::format::ImageFormat;

/// Encoder options for one operation
///
/// Each built in format reads its own variant, a coder handed options
/// for another format logs a warning and uses its defaults.
/// Coders registered by users can carry their own settings in
/// [`CoderOptions::Custom`].
#[derive(Clone, Default)]
#[non_exhaustive]
pub enum CoderOptions {
    /// Every coder uses its defaults
    #[default]
    Default,
    Bmp(BmpOptions),
    Png(PngOptions),
    Jpeg(JpegOptions),
    Tga(TgaOptions),
    Gif(GifOptions),
    /// Settings for a coder registered outside this crate
    Custom(Arc<dyn Any + Send + Sync>)
}

impl CoderOptions {
    pub fn as_bmp(&self) -> Option<BmpOptions> {
        match self {
            CoderOptions::Bmp(options) => Some(*options),
            _ => None
        }
    }

    pub fn as_png(&self) -> Option<PngOptions> {
        match self {
            CoderOptions::Png(options) => Some(*options),
            _ => None
        }
    }

    pub fn as_jpeg(&self) -> Option<JpegOptions> {
        match self {
            CoderOptions::Jpeg(options) => Some(*options),
            _ => None
        }
    }

    pub fn as_tga(&self) -> Option<TgaOptions> {
        match self {
            CoderOptions::Tga(options) => Some(*options),
            _ => None
        }
    }

    pub fn as_gif(&self) -> Option<GifOptions> {
        match self {
            CoderOptions::Gif(options) => Some(*options),
            _ => None
        }
    }

    /// Custom settings of type `T`, if that is what these options hold
    pub fn custom<T: Any + Send + Sync>(&self) -> Option<&T> {
        match self {
            CoderOptions::Custom(value) => value.downcast_ref::<T>(),
            _ => None
        }
    }

    /// The options `pick` extracts, or the defaults.
    ///
    /// Options meant for another format are ignored with a warning
    pub(crate) fn resolve<T: Default>(
        &self, format: ImageFormat, pick: impl FnOnce(&CoderOptions) -> Option<T>
    ) -> T {
        if let CoderOptions::Default = self {
            return T::default();
        }
        match pick(self) {
            Some(options) => options,
            None => {
                warn!("Ignoring {self:?}, they do not apply to {format}");
                T::default()
            }
        }
    }
}

impl Debug for CoderOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CoderOptions::Default => writeln!(f, "default options"),
            CoderOptions::Bmp(options) => writeln!(f, "{options:?}"),
            CoderOptions::Png(options) => writeln!(f, "{options:?}"),
            CoderOptions::Jpeg(options) => writeln!(f, "{options:?}"),
            CoderOptions::Tga(options) => writeln!(f, "{options:?}"),
            CoderOptions::Gif(options) => writeln!(f, "{options:?}"),
            CoderOptions::Custom(_) => writeln!(f, "custom options")
        }
    }
}

impl From<BmpOptions> for CoderOptions {
    fn from(options: BmpOptions) -> Self {
        CoderOptions::Bmp(options)
    }
}

impl From<PngOptions> for CoderOptions {
    fn from(options: PngOptions) -> Self {
        CoderOptions::Png(options)
    }
}

impl From<JpegOptions> for CoderOptions {
    fn from(options: JpegOptions) -> Self {
        CoderOptions::Jpeg(options)
    }
}

impl From<TgaOptions> for CoderOptions {
    fn from(options: TgaOptions) -> Self {
        CoderOptions::Tga(options)
    }
}

impl From<GifOptions> for CoderOptions {
    fn from(options: GifOptions) -> Self {
        CoderOptions::Gif(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ImageFormat;

    #[test]
    fn options_resolve_per_format() {
        let options = CoderOptions::from(TgaOptions::default().set_rle(true));

        assert!(options.resolve(ImageFormat::TGA, CoderOptions::as_tga).get_rle());
        assert_eq!(
            options.resolve(ImageFormat::PNG, CoderOptions::as_png),
            PngOptions::default()
        );
        assert_eq!(
            CoderOptions::Default.resolve(ImageFormat::JPEG, CoderOptions::as_jpeg),
            JpegOptions::default()
        );
    }

    #[test]
    fn custom_options_downcast() {
        let options = CoderOptions::Custom(Arc::new(42_u32));

        assert_eq!(options.custom::<u32>(), Some(&42));
        assert_eq!(options.custom::<u16>(), None);
        assert_eq!(CoderOptions::Default.custom::<u32>(), None);
    }
}
