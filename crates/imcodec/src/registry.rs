/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! The codec registry
//!
//! A registry maps formats to their detectors and to factories creating
//! decoders and encoders. Lookups work on a snapshot of an immutable table,
//! registrations build a new table and swap it in, so lookups never wait
//! for each other and formats can be added while other threads decode.
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use log::debug;

use crate::errors::{CoderKind, ImageErrors};
use crate::format::{FormatId, ImageFormat};
use crate::traits::{Decoder, Encoder, FormatDetector, InfoDetector};

/// Creates a fresh decoder for every operation
pub type DecoderFactory = Arc<dyn Fn() -> Box<dyn Decoder> + Send + Sync>;

/// Creates a fresh encoder for every operation
pub type EncoderFactory = Arc<dyn Fn() -> Box<dyn Encoder> + Send + Sync>;

#[derive(Clone, Default)]
struct RegistryTable {
    formats:         Vec<ImageFormat>,
    detectors:       Vec<Arc<dyn FormatDetector>>,
    info_detectors:  HashMap<FormatId, Arc<dyn InfoDetector>>,
    decoders:        HashMap<FormatId, DecoderFactory>,
    encoders:        HashMap<FormatId, EncoderFactory>,
    max_header_size: usize
}

impl RegistryTable {
    fn add_format(&mut self, format: ImageFormat) -> Result<(), ImageErrors> {
        match self.formats.iter().find(|x| x.id() == format.id()) {
            Some(known) if known.same_descriptor(&format) => Ok(()),
            Some(known) => Err(ImageErrors::argument(format!(
                "format id {:?} is already bound to {known}, cannot bind it to {format}",
                format.id()
            ))),
            None => {
                self.formats.push(format);
                Ok(())
            }
        }
    }

    fn add_detector(&mut self, detector: Arc<dyn FormatDetector>) {
        let format = detector.format();

        match self.detectors.iter_mut().find(|x| x.format() == format) {
            Some(existing) => *existing = detector,
            None => self.detectors.push(detector)
        }
        self.refresh();
    }

    fn refresh(&mut self) {
        self.max_header_size = self
            .detectors
            .iter()
            .map(|x| x.format().header_size())
            .max()
            .unwrap_or(0);
    }
}

fn check_binding(registered: ImageFormat, reported: ImageFormat, kind: CoderKind) -> Result<(), ImageErrors> {
    if registered.same_descriptor(&reported) {
        return Ok(());
    }
    Err(ImageErrors::argument(format!(
        "{kind:?} registered for {registered} reports {reported:?}"
    )))
}

/// Formats and the coders that handle them
///
/// # Example
/// ```
/// use imcodec::errors::CoderKind;
/// use imcodec::format::ImageFormat;
/// use imcodec::registry::CodecRegistry;
///
/// let registry = CodecRegistry::with_builtins();
/// assert!(registry.encoder(ImageFormat::JPEG).is_ok());
///
/// registry.unregister(ImageFormat::JPEG, CoderKind::Encoder);
/// assert!(registry.encoder(ImageFormat::JPEG).is_err());
/// ```
pub struct CodecRegistry {
    table: RwLock<Arc<RegistryTable>>
}

impl Default for CodecRegistry {
    fn default() -> Self {
        CodecRegistry::new()
    }
}

impl CodecRegistry {
    /// Create a registry without any format
    pub fn new() -> CodecRegistry {
        CodecRegistry {
            table: RwLock::new(Arc::new(RegistryTable::default()))
        }
    }

    /// Create a registry holding every format compiled into this crate
    pub fn with_builtins() -> CodecRegistry {
        let mut table = RegistryTable::default();
        crate::codecs::register_builtins(&mut BuiltinTable(&mut table));
        table.refresh();

        CodecRegistry {
            table: RwLock::new(Arc::new(table))
        }
    }

    /// The registry shared by the whole process, holding the built in formats
    pub fn global() -> &'static CodecRegistry {
        static GLOBAL: OnceLock<CodecRegistry> = OnceLock::new();
        GLOBAL.get_or_init(CodecRegistry::with_builtins)
    }

    fn snapshot(&self) -> Arc<RegistryTable> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&table)
    }

    fn update(&self, change: impl FnOnce(&mut RegistryTable) -> Result<(), ImageErrors>) -> Result<(), ImageErrors> {
        let mut current = self.table.write().unwrap_or_else(PoisonError::into_inner);
        let mut table = RegistryTable::clone(&current);

        change(&mut table)?;
        *current = Arc::new(table);
        Ok(())
    }

    /// Bind a format descriptor to its id.
    ///
    /// Registering the same descriptor again does nothing, registering
    /// a different descriptor under a known id is an error
    pub fn register_format(&self, format: ImageFormat) -> Result<(), ImageErrors> {
        self.update(|table| table.add_format(format))
    }

    /// Add a detector for `format`, replacing any previous one.
    ///
    /// Detectors run in the order they were first registered
    pub fn register_detector(
        &self, format: ImageFormat, detector: impl FormatDetector + 'static
    ) -> Result<(), ImageErrors> {
        check_binding(format, detector.format(), CoderKind::Detector)?;
        debug!("Registering detector for {format}");

        self.update(|table| {
            table.add_format(format)?;
            table.add_detector(Arc::new(detector));
            Ok(())
        })
    }

    pub fn register_info_detector(
        &self, format: ImageFormat, detector: impl InfoDetector + 'static
    ) -> Result<(), ImageErrors> {
        check_binding(format, detector.format(), CoderKind::InfoDetector)?;

        self.update(|table| {
            table.add_format(format)?;
            table.info_detectors.insert(format.id(), Arc::new(detector));
            Ok(())
        })
    }

    /// Add a decoder factory for `format`.
    ///
    /// The factory is called once here, to check that its decoders
    /// report the right format
    pub fn register_decoder(
        &self, format: ImageFormat, factory: impl Fn() -> Box<dyn Decoder> + Send + Sync + 'static
    ) -> Result<(), ImageErrors> {
        check_binding(format, factory().format(), CoderKind::Decoder)?;

        self.update(|table| {
            table.add_format(format)?;
            table.decoders.insert(format.id(), Arc::new(factory));
            Ok(())
        })
    }

    pub fn register_encoder(
        &self, format: ImageFormat, factory: impl Fn() -> Box<dyn Encoder> + Send + Sync + 'static
    ) -> Result<(), ImageErrors> {
        check_binding(format, factory().format(), CoderKind::Encoder)?;

        self.update(|table| {
            table.add_format(format)?;
            table.encoders.insert(format.id(), Arc::new(factory));
            Ok(())
        })
    }

    /// Remove one kind of coder for `format`, returning whether one was registered
    pub fn unregister(&self, format: ImageFormat, kind: CoderKind) -> bool {
        let mut removed = false;

        let _ = self.update(|table| {
            removed = match kind {
                CoderKind::Decoder => table.decoders.remove(&format.id()).is_some(),
                CoderKind::Encoder => table.encoders.remove(&format.id()).is_some(),
                CoderKind::InfoDetector => table.info_detectors.remove(&format.id()).is_some(),
                CoderKind::Detector => {
                    let before = table.detectors.len();
                    table.detectors.retain(|x| x.format() != format);
                    table.refresh();
                    table.detectors.len() != before
                }
            };
            Ok(())
        });
        if removed {
            debug!("Unregistered {kind:?} for {format}");
        }
        removed
    }

    fn missing(format: ImageFormat, capability: CoderKind) -> ImageErrors {
        ImageErrors::MissingCoder { capability, format }
    }

    /// A new decoder for `format`
    pub fn decoder(&self, format: ImageFormat) -> Result<Box<dyn Decoder>, ImageErrors> {
        let table = self.snapshot();
        let factory = table
            .decoders
            .get(&format.id())
            .ok_or_else(|| Self::missing(format, CoderKind::Decoder))?;
        Ok(factory())
    }

    /// A new encoder for `format`
    pub fn encoder(&self, format: ImageFormat) -> Result<Box<dyn Encoder>, ImageErrors> {
        let table = self.snapshot();
        let factory = table
            .encoders
            .get(&format.id())
            .ok_or_else(|| Self::missing(format, CoderKind::Encoder))?;
        Ok(factory())
    }

    pub fn info_detector(&self, format: ImageFormat) -> Result<Arc<dyn InfoDetector>, ImageErrors> {
        self.snapshot()
            .info_detectors
            .get(&format.id())
            .cloned()
            .ok_or_else(|| Self::missing(format, CoderKind::InfoDetector))
    }

    pub fn detector(&self, format: ImageFormat) -> Result<Arc<dyn FormatDetector>, ImageErrors> {
        self.snapshot()
            .detectors
            .iter()
            .find(|x| x.format() == format)
            .cloned()
            .ok_or_else(|| Self::missing(format, CoderKind::Detector))
    }

    /// Detectors in the order they run
    pub fn detectors(&self) -> Vec<Arc<dyn FormatDetector>> {
        self.snapshot().detectors.clone()
    }

    /// The registered format claiming `extension`, ignoring case and a leading dot
    pub fn format_by_extension(&self, extension: &str) -> Option<ImageFormat> {
        let extension = extension.trim_start_matches('.');

        self.snapshot()
            .formats
            .iter()
            .find(|x| x.matches_extension(extension))
            .copied()
    }

    pub fn format_by_id(&self, id: FormatId) -> Option<ImageFormat> {
        self.snapshot()
            .formats
            .iter()
            .find(|x| x.id() == id)
            .copied()
    }

    /// Every registered format, in registration order
    pub fn formats(&self) -> Vec<ImageFormat> {
        self.snapshot().formats.clone()
    }

    /// Bytes of look-ahead detection needs, the largest header of any detector
    pub fn max_header_size(&self) -> usize {
        self.snapshot().max_header_size
    }
}

/// Registration into a table under construction, for the built in
/// formats whose bindings are known to be right
pub(crate) struct BuiltinTable<'t>(&'t mut RegistryTable);

impl BuiltinTable<'_> {
    pub(crate) fn format(&mut self, format: ImageFormat) {
        if !self.0.formats.contains(&format) {
            self.0.formats.push(format);
        }
    }

    pub(crate) fn detector(&mut self, detector: impl FormatDetector + 'static) {
        self.0.add_detector(Arc::new(detector));
    }

    pub(crate) fn info_detector(&mut self, detector: impl InfoDetector + 'static) {
        let id = detector.format().id();
        self.0.info_detectors.insert(id, Arc::new(detector));
    }

    pub(crate) fn decoder(
        &mut self, format: ImageFormat, factory: impl Fn() -> Box<dyn Decoder> + Send + Sync + 'static
    ) {
        self.0.decoders.insert(format.id(), Arc::new(factory));
    }

    pub(crate) fn encoder(
        &mut self, format: ImageFormat, factory: impl Fn() -> Box<dyn Encoder> + Send + Sync + 'static
    ) {
        self.0.encoders.insert(format.id(), Arc::new(factory));
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use imcodec_core::bytestream::ByteReader;
    use imcodec_core::options::DecoderLimits;

    use super::*;
    use crate::format::FormatCapabilities;
    use crate::info::ImageInfo;

    const TOY: ImageFormat = ImageFormat::new(FormatId(1000), "TOY")
        .with_header_size(4)
        .with_extensions(&["toy"])
        .with_capabilities(FormatCapabilities::LOSSLESS);

    struct ToyDetector(ImageFormat);

    impl FormatDetector for ToyDetector {
        fn format(&self) -> ImageFormat {
            self.0
        }

        fn detect(&self, header: &[u8]) -> bool {
            header.starts_with(b"TOY!")
        }
    }

    struct ToyInfo;

    impl InfoDetector for ToyInfo {
        fn format(&self) -> ImageFormat {
            // wrong on purpose
            ImageFormat::BMP
        }

        fn identify(
            &self, _: &mut ByteReader<dyn Read + '_>, _: DecoderLimits
        ) -> Result<ImageInfo, ImageErrors> {
            Err(ImageErrors::UnknownFormat)
        }
    }

    #[test]
    fn formats_are_added_at_runtime() {
        let registry = CodecRegistry::new();
        assert_eq!(registry.max_header_size(), 0);

        registry.register_detector(TOY, ToyDetector(TOY)).unwrap();

        assert_eq!(registry.max_header_size(), 4);
        assert_eq!(registry.format_by_extension(".TOY"), Some(TOY));
        assert_eq!(registry.format_by_id(FormatId(1000)), Some(TOY));
        assert!(registry.detector(TOY).is_ok());
        assert!(matches!(
            registry.decoder(TOY),
            Err(ImageErrors::MissingCoder {
                capability: CoderKind::Decoder,
                ..
            })
        ));
        assert!(registry.unregister(TOY, CoderKind::Detector));
        assert!(!registry.unregister(TOY, CoderKind::Detector));
        assert_eq!(registry.max_header_size(), 0);
    }

    #[test]
    fn mismatched_bindings_are_rejected() {
        let registry = CodecRegistry::new();

        assert!(registry.register_info_detector(TOY, ToyInfo).is_err());
        assert!(registry
            .register_detector(TOY, ToyDetector(ImageFormat::PNG))
            .is_err());

        let impostor = ImageFormat::new(FormatId(1000), "NOT-TOY");
        registry.register_format(TOY).unwrap();
        assert!(registry.register_format(TOY).is_ok());
        assert!(registry.register_format(impostor).is_err());
        assert_eq!(registry.formats(), vec![TOY]);
    }

    #[test]
    #[cfg(all(feature = "bmp", feature = "png", feature = "jpeg", feature = "tga", feature = "gif"))]
    fn builtins_cover_every_format() {
        let registry = CodecRegistry::with_builtins();

        for format in [ImageFormat::BMP, ImageFormat::PNG, ImageFormat::JPEG, ImageFormat::TGA] {
            assert!(registry.decoder(format).is_ok(), "{format}");
            assert!(registry.encoder(format).is_ok(), "{format}");
            assert!(registry.info_detector(format).is_ok(), "{format}");
            assert!(registry.detector(format).is_ok(), "{format}");
        }
        assert!(registry.encoder(ImageFormat::GIF).is_ok());
        assert!(registry.decoder(ImageFormat::GIF).is_err());
        assert_eq!(registry.max_header_size(), 18);
        assert_eq!(
            registry.detectors().last().map(|x| x.format()),
            Some(ImageFormat::TGA)
        );
    }

    #[test]
    fn snapshots_survive_updates() {
        let registry = Arc::new(CodecRegistry::with_builtins());

        std::thread::scope(|s| {
            for _ in 0..4 {
                let registry = Arc::clone(&registry);
                s.spawn(move || {
                    for _ in 0..100 {
                        assert!(registry.encoder(ImageFormat::PNG).is_ok());
                    }
                });
            }
            s.spawn(|| {
                for _ in 0..100 {
                    registry.register_detector(TOY, ToyDetector(TOY)).unwrap();
                    registry.unregister(TOY, CoderKind::Detector);
                }
            });
        });
        assert!(registry.detector(TOY).is_err());
    }
}
