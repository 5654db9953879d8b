/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
#![cfg(all(feature = "bmp", feature = "png", feature = "jpeg", feature = "tga", feature = "gif"))]

use std::path::PathBuf;

use imcodec::buffer::PixelBuffer;
use imcodec::errors::{CoderKind, ImageErrors};
use imcodec::format::ImageFormat;
use imcodec::frame::Image;
use imcodec::imageio::{identify_path, load_path, save_to_path, SaveRequest};
use imcodec::registry::CodecRegistry;
use imcodec_core::pixel::PixelType;

/// A fresh directory for one test
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("imcodec-{}-{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn image() -> Image {
    let pixels = (0..=255).cycle().take(8 * 6 * 3).collect();
    Image::from_buffer(PixelBuffer::from_u8(pixels, 8, 6, PixelType::Rgb8).unwrap())
}

#[test]
fn format_follows_the_extension() {
    let dir = scratch_dir("extension");
    let image = image();

    for (name, format) in [
        ("a.bmp", ImageFormat::BMP),
        ("b.PNG", ImageFormat::PNG),
        ("c.jpeg", ImageFormat::JPEG),
        ("d.tga", ImageFormat::TGA),
        ("e.gif", ImageFormat::GIF)
    ] {
        let path = dir.join(name);
        let outcome = save_to_path(&image, &path).unwrap();

        assert_eq!(outcome.frames_written, 1);
        assert_eq!(std::fs::metadata(&path).unwrap().len() as usize, outcome.bytes_written);

        let info = identify_path(&path).unwrap();
        assert_eq!(info.format(), format, "{name}");
        assert_eq!(info.dimensions(), (8, 6));
    }
    let loaded = load_path(dir.join("a.bmp")).unwrap();
    assert_eq!(loaded.first_frame(), image.first_frame());

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn bad_paths_fail_before_writing() {
    let dir = scratch_dir("bad-paths");
    let image = image();

    let cases = [
        PathBuf::new(),
        dir.join("no_extension"),
        dir.join("unknown.xyz"),
        dir.join("missing").join("a.png")
    ];
    for path in cases {
        let err = save_to_path(&image, &path).unwrap_err();
        assert!(matches!(err, ImageErrors::Argument(_)), "{path:?}: {err:?}");
        assert!(!path.exists());
    }
    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn missing_encoder_leaves_no_file() {
    let dir = scratch_dir("missing-encoder");
    let registry = CodecRegistry::with_builtins();
    registry.unregister(ImageFormat::PNG, CoderKind::Encoder);

    let path = dir.join("a.png");
    let err = SaveRequest::new()
        .with_registry(&registry)
        .save_to_path(&image(), &path)
        .unwrap_err();

    assert!(matches!(
        err,
        ImageErrors::MissingCoder {
            capability: CoderKind::Encoder,
            ..
        }
    ));
    assert!(!path.exists());
    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn failed_encodes_remove_the_file() {
    let dir = scratch_dir("failed-encode");
    let path = dir.join("wide.jpg");

    // wider than a JPEG can describe
    let buffer = PixelBuffer::new(70_000, 1, PixelType::Gray8).unwrap();
    let err = save_to_path(&Image::from_buffer(buffer), &path).unwrap_err();

    assert!(matches!(err, ImageErrors::Argument(_)), "{err:?}");
    assert!(!path.exists());
    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn missing_files_are_io_errors() {
    let dir = scratch_dir("missing-file");

    assert!(matches!(load_path(dir.join("nothing.png")), Err(ImageErrors::Io(_))));
    assert!(matches!(load_path(""), Err(ImageErrors::Argument(_))));
    std::fs::remove_dir_all(dir).unwrap();
}
