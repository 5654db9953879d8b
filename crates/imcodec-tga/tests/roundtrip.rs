/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use imcodec_core::bytestream::{ByteReader, ByteWriter};
use imcodec_core::monitor::{NoopMonitor, Rect};
use imcodec_core::options::{DecoderLimits, TgaOptions};
use imcodec_core::pixel::PixelType;
use imcodec_tga::{probe_tga, TgaDecoder, TgaDecoderErrors, TgaEncoder, TgaEncoderErrors};
use nanorand::{Rng, WyRand};

fn header(image_type: u8, width: u16, height: u16, depth: u8, descriptor: u8) -> Vec<u8> {
    let mut bytes = vec![0_u8; 18];
    bytes[2] = image_type;
    bytes[12..14].copy_from_slice(&width.to_le_bytes());
    bytes[14..16].copy_from_slice(&height.to_le_bytes());
    bytes[16] = depth;
    bytes[17] = descriptor;
    bytes
}

fn decode(data: &[u8]) -> Result<(Vec<u8>, PixelType), TgaDecoderErrors> {
    let mut stream = ByteReader::new(data);
    let mut decoder = TgaDecoder::new(&mut stream);
    let pixels = decoder.decode(&mut NoopMonitor)?;
    Ok((pixels, decoder.pixel_type().unwrap()))
}

fn encode(pixels: &[u8], width: usize, height: usize, pixel_type: PixelType, rle: bool) -> Vec<u8> {
    let mut sink = Vec::new();
    let options = TgaOptions::default().set_rle(rle);

    TgaEncoder::new(pixels, width, height, pixel_type, options)
        .encode(&mut ByteWriter::new(&mut sink), &mut NoopMonitor)
        .unwrap();
    sink
}

#[test]
fn bottom_up_true_color() {
    let mut file = header(2, 2, 2, 24, 0);
    // bottom row first, BGR
    file.extend_from_slice(&[255, 0, 0, 255, 255, 255]);
    file.extend_from_slice(&[0, 0, 255, 0, 255, 0]);

    let (pixels, pixel_type) = decode(&file).unwrap();

    assert_eq!(pixel_type, PixelType::Rgb8);
    assert_eq!(pixels, [255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255]);
}

#[test]
fn right_to_left_gray() {
    let mut file = header(3, 3, 1, 8, 0x30);
    file.extend_from_slice(&[1, 2, 3]);

    let (pixels, pixel_type) = decode(&file).unwrap();
    assert_eq!(pixel_type, PixelType::Gray8);
    assert_eq!(pixels, [3, 2, 1]);
}

#[test]
fn color_mapped_rle_crossing_rows() {
    let mut file = header(9, 2, 2, 8, 0x20);
    // color map, 2 entries of 24 bits starting at index 0
    file[1] = 1;
    file[5] = 2;
    file[7] = 24;
    file.extend_from_slice(&[0, 0, 255, 255, 0, 0]);
    // a run of three index 1 pixels followed by a literal index 0
    file.extend_from_slice(&[0x82, 1, 0x00, 0]);

    let (pixels, pixel_type) = decode(&file).unwrap();

    assert_eq!(pixel_type, PixelType::Rgb8);
    assert_eq!(pixels, [0, 0, 255, 0, 0, 255, 0, 0, 255, 255, 0, 0]);
}

#[test]
fn sixteen_bit_with_attribute_alpha() {
    let mut file = header(2, 2, 1, 16, 0x21);
    // opaque pure red, then transparent pure blue
    file.extend_from_slice(&0xFC00_u16.to_le_bytes());
    file.extend_from_slice(&0x001F_u16.to_le_bytes());

    let (pixels, pixel_type) = decode(&file).unwrap();

    assert_eq!(pixel_type, PixelType::Rgba8);
    assert_eq!(pixels, [255, 0, 0, 255, 0, 0, 255, 0]);
}

#[test]
fn round_trip_all_types() {
    let mut rand = WyRand::new_seed(21);

    for pixel_type in TgaEncoder::supported_pixel_types() {
        for rle in [false, true] {
            let (width, height) = (23, 9);
            let mut pixels = vec![0_u8; width * height * pixel_type.bytes_per_pixel()];
            rand.fill(&mut pixels);
            // give the run length encoder something to find
            pixels[..width].fill(200);

            let file = encode(&pixels, width, height, *pixel_type, rle);
            assert!(probe_tga(&file));

            let (decoded, decoded_type) = decode(&file).unwrap();
            assert_eq!(decoded_type, *pixel_type);
            assert_eq!(decoded, pixels, "{pixel_type:?} rle {rle}");
        }
    }
}

#[test]
fn rle_shrinks_flat_images_and_keeps_the_footer() {
    let pixels = vec![90_u8; 64 * 64 * 3];
    let raw = encode(&pixels, 64, 64, PixelType::Rgb8, false);
    let rle = encode(&pixels, 64, 64, PixelType::Rgb8, true);

    assert_eq!(raw[2], 2);
    assert_eq!(rle[2], 10);
    assert!(rle.len() < raw.len() / 10);
    assert!(rle.ends_with(b"TRUEVISION-XFILE.\0"));
}

#[test]
fn headers_do_not_move_the_stream() {
    let file = encode(&[1, 2, 3, 4], 2, 2, PixelType::Gray8, false);
    let mut stream = ByteReader::new(&file[..]);

    {
        let mut decoder = TgaDecoder::new(&mut stream);
        decoder.decode_headers().unwrap();
        decoder.decode_headers().unwrap();
        assert_eq!(decoder.dimensions(), Some((2, 2)));
    }
    assert_eq!(stream.position(), 0);
}

#[test]
fn truncated_data() {
    let file = encode(&[7; 16 * 16 * 3], 16, 16, PixelType::Rgb8, false);
    let truncated = &file[..18 + 16 * 3 * 5];

    assert!(matches!(decode(truncated), Err(TgaDecoderErrors::IoErrors(_))));

    let mut stream = ByteReader::new(truncated);
    let limits = DecoderLimits::default().set_strict_mode(false);
    let pixels = TgaDecoder::new_with_limits(&mut stream, limits)
        .decode(&mut NoopMonitor)
        .unwrap();
    assert_eq!(&pixels[..16 * 3], &[7; 16 * 3]);
    assert!(pixels[16 * 3 * 5..].iter().all(|x| *x == 0));
}

#[test]
fn cancelled_encode_writes_nothing() {
    let mut sink = Vec::new();
    let mut refuse = |_: usize, _: usize, _: Option<Rect>| false;

    let result = TgaEncoder::new(&[0; 12], 2, 2, PixelType::Rgb8, TgaOptions::default())
        .encode(&mut ByteWriter::new(&mut sink), &mut refuse);

    assert!(matches!(result, Err(TgaEncoderErrors::Interrupted)));
    assert!(sink.is_empty());
}

#[test]
fn oversized_images_are_rejected() {
    let result = TgaEncoder::new(&[], 70000, 1, PixelType::Gray8, TgaOptions::default())
        .encode(&mut ByteWriter::new(Vec::new()), &mut NoopMonitor);

    assert!(matches!(result, Err(TgaEncoderErrors::InvalidDimensions(70000, 1))));
}
