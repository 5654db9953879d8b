/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use imcodec_bmp::{BmpDecoder, BmpDecoderErrors, BmpEncoder, BmpEncoderErrors};
use imcodec_core::bytestream::{ByteReader, ByteWriter};
use imcodec_core::monitor::{NoopMonitor, Rect};
use imcodec_core::options::{BmpCompression, BmpOptions};
use imcodec_core::pixel::PixelType;
use nanorand::Rng;

fn encode(pixels: &[u8], width: usize, height: usize, ty: PixelType, options: BmpOptions) -> Vec<u8> {
    let mut sink = Vec::new();
    BmpEncoder::new(pixels, width, height, ty, options)
        .encode(&mut ByteWriter::new(&mut sink), &mut NoopMonitor)
        .unwrap();
    sink
}

fn decode(bytes: &[u8]) -> (Vec<u8>, PixelType, (usize, usize)) {
    let mut reader = ByteReader::new(bytes);
    let mut decoder = BmpDecoder::new(&mut reader);
    decoder.decode_headers().unwrap();
    let ty = decoder.pixel_type().unwrap();
    let dims = decoder.dimensions().unwrap();
    (decoder.decode(&mut NoopMonitor).unwrap(), ty, dims)
}

/// A 2x2 bottom-up 24 bit file with row padding, written by hand
fn hand_made_2x2() -> Vec<u8> {
    let mut file = Vec::new();
    file.extend_from_slice(b"BM");
    file.extend_from_slice(&(54_u32 + 16).to_le_bytes());
    file.extend_from_slice(&0_u32.to_le_bytes());
    file.extend_from_slice(&54_u32.to_le_bytes());
    file.extend_from_slice(&40_u32.to_le_bytes());
    file.extend_from_slice(&2_i32.to_le_bytes());
    file.extend_from_slice(&2_i32.to_le_bytes());
    file.extend_from_slice(&1_u16.to_le_bytes());
    file.extend_from_slice(&24_u16.to_le_bytes());
    file.extend_from_slice(&[0; 24]);
    // bottom row: blue, white
    file.extend_from_slice(&[255, 0, 0, 255, 255, 255, 0, 0]);
    // top row: red, green
    file.extend_from_slice(&[0, 0, 255, 0, 255, 0, 0, 0]);
    file
}

#[test]
fn decode_hand_made_bottom_up() {
    let (pixels, ty, dims) = decode(&hand_made_2x2());

    assert_eq!(ty, PixelType::Rgb8);
    assert_eq!(dims, (2, 2));
    assert_eq!(&pixels[..6], &[255, 0, 0, 0, 255, 0]);
    assert_eq!(&pixels[6..], &[0, 0, 255, 255, 255, 255]);
}

#[test]
fn headers_do_not_consume() {
    let file = hand_made_2x2();
    let mut reader = ByteReader::new(file.as_slice());

    for _ in 0..2 {
        let mut decoder = BmpDecoder::new(&mut reader);
        decoder.decode_headers().unwrap();
    }
    assert_eq!(reader.position(), 0);
}

#[test]
fn rgb_roundtrip_random() {
    let (width, height) = (13, 7);
    let mut pixels = vec![0_u8; width * height * 3];
    nanorand::WyRand::new_seed(7).fill(&mut pixels);

    let (decoded, ty, _) = decode(&encode(&pixels, width, height, PixelType::Rgb8, BmpOptions::default()));
    assert_eq!(ty, PixelType::Rgb8);
    assert_eq!(decoded, pixels);
}

#[test]
fn rgba_roundtrip_keeps_alpha() {
    let (width, height) = (5, 3);
    let mut pixels = vec![0_u8; width * height * 4];
    nanorand::WyRand::new_seed(11).fill(&mut pixels);

    let (decoded, ty, _) = decode(&encode(&pixels, width, height, PixelType::Rgba8, BmpOptions::default()));
    assert_eq!(ty, PixelType::Rgba8);
    assert_eq!(decoded, pixels);
}

#[test]
fn gray_roundtrip_uses_gray_palette() {
    let pixels: Vec<u8> = (0..60).map(|x| (x * 4) as u8).collect();

    for compression in [BmpCompression::None, BmpCompression::Rle] {
        let options = BmpOptions::default().set_compression(compression);
        let (decoded, ty, _) = decode(&encode(&pixels, 10, 6, PixelType::Gray8, options));
        assert_eq!(ty, PixelType::Gray8);
        assert_eq!(decoded, pixels);
    }
}

#[test]
fn rle_roundtrip_with_few_colors() {
    let (width, height) = (17, 9);
    let colors = [[200, 10, 10], [10, 200, 10], [10, 10, 200]];
    let pixels: Vec<u8> = (0..width * height)
        .flat_map(|i| colors[(i / 5) % colors.len()])
        .collect();

    let options = BmpOptions::default().set_compression(BmpCompression::Rle);
    let file = encode(&pixels, width, height, PixelType::Rgb8, options);
    // compression field
    assert_eq!(u32::from_le_bytes(file[30..34].try_into().unwrap()), 1);

    let (decoded, ty, _) = decode(&file);
    assert_eq!(ty, PixelType::Rgb8);
    assert_eq!(decoded, pixels);
}

#[test]
fn rle_falls_back_with_many_colors() {
    let (width, height) = (32, 16);
    let pixels: Vec<u8> = (0..width * height)
        .flat_map(|i| [i as u8, (i >> 8) as u8, 7])
        .collect();

    let options = BmpOptions::default().set_compression(BmpCompression::Rle);
    let file = encode(&pixels, width, height, PixelType::Rgb8, options);
    assert_eq!(u32::from_le_bytes(file[30..34].try_into().unwrap()), 0);
    assert_eq!(decode(&file).0, pixels);
}

#[test]
fn interrupted_encode_writes_nothing() {
    let pixels = [0_u8; 12];
    let mut sink = Vec::new();
    let mut refuse = |_: usize, _: usize, _: Option<Rect>| false;

    let result = BmpEncoder::new(&pixels, 2, 2, PixelType::Rgb8, BmpOptions::default())
        .encode(&mut ByteWriter::new(&mut sink), &mut refuse);

    assert!(matches!(result, Err(BmpEncoderErrors::Interrupted)));
    assert!(sink.is_empty());
}

#[test]
fn interrupted_decode_mid_way() {
    let file = encode(&[9_u8; 4 * 4 * 3], 4, 4, PixelType::Rgb8, BmpOptions::default());
    let mut reader = ByteReader::new(file.as_slice());
    let mut stop_after_two = |done: usize, _: usize, _: Option<Rect>| done < 2;

    let result = BmpDecoder::new(&mut reader).decode(&mut stop_after_two);
    assert!(matches!(result, Err(BmpDecoderErrors::Interrupted)));
}

#[test]
fn truncated_pixels_error() {
    let mut file = hand_made_2x2();
    file.truncate(file.len() - 3);

    let mut reader = ByteReader::new(file.as_slice());
    let result = BmpDecoder::new(&mut reader).decode(&mut NoopMonitor);
    assert!(matches!(result, Err(BmpDecoderErrors::IoErrors(_))));
}

#[test]
fn unsupported_pixel_type() {
    let pixels = [0_u8; 8];
    let mut sink = Vec::new();
    let result = BmpEncoder::new(&pixels, 2, 1, PixelType::Rgba16, BmpOptions::default())
        .encode(&mut ByteWriter::new(&mut sink), &mut NoopMonitor);
    assert!(matches!(
        result,
        Err(BmpEncoderErrors::UnsupportedPixelType(PixelType::Rgba16))
    ));
}
