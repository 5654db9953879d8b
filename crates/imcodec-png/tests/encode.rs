/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use imcodec_core::bytestream::{ByteReader, ByteWriter};
use imcodec_core::monitor::NoopMonitor;
use imcodec_core::options::{PngFilter, PngOptions};
use imcodec_core::pixel::PixelType;
use imcodec_png::{PngDecoder, PngEncoder};
use nanorand::{Rng, WyRand};

fn random_pixels(len: usize, seed: u64) -> Vec<u8> {
    let mut rand = WyRand::new_seed(seed);
    let mut pixels = vec![0_u8; len];
    rand.fill(&mut pixels);
    pixels
}

fn encode(pixels: &[u8], width: usize, height: usize, pixel_type: PixelType, options: PngOptions) -> Vec<u8> {
    let mut sink = Vec::new();
    PngEncoder::new(pixels, width, height, pixel_type, options)
        .encode(&mut ByteWriter::new(&mut sink), &mut NoopMonitor)
        .unwrap();
    sink
}

#[test]
fn png_crate_reads_our_output() {
    let (width, height) = (31, 17);
    let pixels = random_pixels(width * height * 3, 5);
    let file = encode(&pixels, width, height, PixelType::Rgb8, PngOptions::default());

    let mut decoder = png::Decoder::new(&file[..]);
    decoder.set_transformations(png::Transformations::IDENTITY);
    let mut reader = decoder.read_info().unwrap();
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf).unwrap();

    assert_eq!(info.width as usize, width);
    assert_eq!(info.color_type, png::ColorType::Rgb);
    assert_eq!(&buf[..info.buffer_size()], &pixels[..]);
}

#[test]
fn round_trip_every_pixel_type() {
    let (width, height) = (9, 11);

    for (seed, pixel_type) in PngEncoder::supported_pixel_types().iter().enumerate() {
        let pixels = random_pixels(width * height * pixel_type.bytes_per_pixel(), seed as u64);
        let file = encode(&pixels, width, height, *pixel_type, PngOptions::default());

        let mut stream = ByteReader::new(&file[..]);
        let mut decoder = PngDecoder::new(&mut stream);
        let decoded = decoder.decode(&mut NoopMonitor).unwrap();

        assert_eq!(decoder.pixel_type(), Some(*pixel_type));
        assert_eq!(decoded, pixels, "{pixel_type:?}");
    }
}

#[test]
fn every_filter_and_level_round_trips() {
    let (width, height) = (20, 6);
    let pixels = random_pixels(width * height * 4, 99);
    let filters = [
        PngFilter::Adaptive,
        PngFilter::None,
        PngFilter::Sub,
        PngFilter::Up,
        PngFilter::Average,
        PngFilter::Paeth
    ];
    for filter in filters {
        for level in [0, 6, 9] {
            let options = PngOptions::default()
                .set_filter(filter)
                .set_compression_level(level);
            let file = encode(&pixels, width, height, PixelType::Rgba8, options);

            let mut stream = ByteReader::new(&file[..]);
            let decoded = PngDecoder::new(&mut stream).decode(&mut NoopMonitor).unwrap();
            assert_eq!(decoded, pixels, "{filter:?} level {level}");
        }
    }
}

#[test]
fn large_images_span_multiple_idat_chunks() {
    let (width, height) = (128, 128);
    // random data barely compresses
    let pixels = random_pixels(width * height * 3, 3);
    let file = encode(&pixels, width, height, PixelType::Rgb8, PngOptions::default());

    let idat_count = file.windows(4).filter(|x| *x == b"IDAT").count();
    assert!(idat_count > 1);

    let mut stream = ByteReader::new(&file[..]);
    let decoded = PngDecoder::new(&mut stream).decode(&mut NoopMonitor).unwrap();
    assert_eq!(decoded, pixels);
}

#[test]
fn wrong_input_size() {
    let pixels = [0_u8; 10];
    let result = PngEncoder::new(&pixels, 2, 2, PixelType::Rgb8, PngOptions::default())
        .encode(&mut ByteWriter::new(Vec::new()), &mut NoopMonitor);

    assert!(matches!(
        result,
        Err(imcodec_png::PngEncodeErrors::WrongInputSize(12, 10))
    ));
}
