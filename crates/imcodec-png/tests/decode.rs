/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::{Compression, Crc};
use imcodec_core::bytestream::ByteReader;
use imcodec_core::monitor::{NoopMonitor, Rect};
use imcodec_core::options::DecoderLimits;
use imcodec_core::pixel::PixelType;
use imcodec_png::{PngDecodeErrors, PngDecoder};

fn chunk(out: &mut Vec<u8>, name: &[u8; 4], data: &[u8]) {
    let mut crc = Crc::new();
    crc.update(name);
    crc.update(data);

    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(name);
    out.extend_from_slice(data);
    out.extend_from_slice(&crc.sum().to_be_bytes());
}

/// Build a PNG by hand from already filtered scanlines
fn handmade(width: u32, height: u32, depth: u8, color: u8, interlace: u8, extra: &[(&[u8; 4], Vec<u8>)], raw: &[u8]) -> Vec<u8> {
    let mut out = vec![137, 80, 78, 71, 13, 10, 26, 10];

    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.extend_from_slice(&[depth, color, 0, 0, interlace]);
    chunk(&mut out, b"IHDR", &ihdr);

    for (name, data) in extra {
        chunk(&mut out, name, data);
    }
    let mut compressor = ZlibEncoder::new(Vec::new(), Compression::default());
    compressor.write_all(raw).unwrap();
    chunk(&mut out, b"IDAT", &compressor.finish().unwrap());
    chunk(&mut out, b"IEND", &[]);
    out
}

fn decode(data: &[u8]) -> Result<(Vec<u8>, PixelType), PngDecodeErrors> {
    let mut stream = ByteReader::new(data);
    let mut decoder = PngDecoder::new(&mut stream);
    let pixels = decoder.decode(&mut NoopMonitor)?;
    Ok((pixels, decoder.pixel_type().unwrap()))
}

#[test]
fn decode_png_crate_rgba() {
    let (width, height) = (13, 7);
    let pixels: Vec<u8> = (0..width * height * 4).map(|x| (x * 7 % 256) as u8).collect();

    let mut file = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut file, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(&pixels).unwrap();
    }
    let (decoded, pixel_type) = decode(&file).unwrap();

    assert_eq!(pixel_type, PixelType::Rgba8);
    assert_eq!(decoded, pixels);
}

#[test]
fn sixteen_bit_is_native_endian() {
    let samples: [u16; 4] = [0x0102, 0xFF00, 0x1234, 0xABCD];
    let be: Vec<u8> = samples.iter().flat_map(|x| x.to_be_bytes()).collect();

    let mut file = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut file, 2, 2);
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png::BitDepth::Sixteen);
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(&be).unwrap();
    }
    let (decoded, pixel_type) = decode(&file).unwrap();
    let native: Vec<u8> = samples.iter().flat_map(|x| x.to_ne_bytes()).collect();

    assert_eq!(pixel_type, PixelType::Gray16);
    assert_eq!(decoded, native);
}

#[test]
fn palette_with_transparency() {
    let palette = vec![255, 0, 0, 0, 255, 0, 0, 0, 255];
    let trns = vec![0, 128];
    // one row of four 2 bit indices: 0, 1, 2, 1
    let raw = [0, 0b00_01_10_01];
    let file = handmade(4, 1, 2, 3, 0, &[(b"PLTE", palette), (b"tRNS", trns)], &raw);

    let (decoded, pixel_type) = decode(&file).unwrap();

    assert_eq!(pixel_type, PixelType::Rgba8);
    assert_eq!(
        decoded,
        [255, 0, 0, 0, 0, 255, 0, 128, 0, 0, 255, 255, 0, 255, 0, 128]
    );
}

#[test]
fn one_bit_gray_is_scaled() {
    let raw = [0, 0b1010_0000];
    let file = handmade(3, 1, 1, 0, 0, &[], &raw);
    let (decoded, pixel_type) = decode(&file).unwrap();

    assert_eq!(pixel_type, PixelType::Gray8);
    assert_eq!(decoded, [255, 0, 255]);
}

#[test]
fn gray_color_key_becomes_alpha() {
    let raw = [0, 10, 20, 10];
    let file = handmade(3, 1, 8, 0, 0, &[(b"tRNS", vec![0, 10])], &raw);
    let (decoded, pixel_type) = decode(&file).unwrap();

    assert_eq!(pixel_type, PixelType::GrayAlpha8);
    assert_eq!(decoded, [10, 0, 20, 255, 10, 0]);
}

#[test]
fn adam7_interlaced() {
    // pixel value is its index, y * 3 + x
    let raw = [
        0, 0, // pass 1: (0,0)
        0, 2, // pass 4: (2,0)
        0, 6, 8, // pass 5: (0,2) (2,2)
        0, 1, // pass 6 row 0: (1,0)
        0, 7, // pass 6 row 1: (1,2)
        0, 3, 4, 5 // pass 7: row 1
    ];
    let file = handmade(3, 3, 8, 0, 1, &[], &raw);
    let (decoded, _) = decode(&file).unwrap();

    assert_eq!(decoded, (0..9).collect::<Vec<u8>>());
}

#[test]
fn headers_do_not_move_the_stream() {
    let file = handmade(1, 1, 8, 0, 0, &[], &[0, 42]);
    let mut stream = ByteReader::new(&file[..]);

    {
        let mut decoder = PngDecoder::new(&mut stream);
        decoder.decode_headers().unwrap();
        assert_eq!(decoder.dimensions(), Some((1, 1)));
    }
    assert_eq!(stream.position(), 0);

    let mut decoder = PngDecoder::new(&mut stream);
    assert_eq!(decoder.decode(&mut NoopMonitor).unwrap(), [42]);
    assert!(stream.eof().unwrap());
}

#[test]
fn crc_mismatch_depends_on_strictness() {
    let mut file = handmade(1, 1, 8, 0, 0, &[], &[0, 42]);
    // last byte of the IHDR crc
    file[32] ^= 0xFF;

    let mut stream = ByteReader::new(&file[..]);
    let result = PngDecoder::new(&mut stream).decode_headers();
    assert!(matches!(result, Err(PngDecodeErrors::BadCrc(..))));

    let mut stream = ByteReader::new(&file[..]);
    let limits = DecoderLimits::default().set_strict_mode(false);
    let pixels = PngDecoder::new_with_limits(&mut stream, limits)
        .decode(&mut NoopMonitor)
        .unwrap();
    assert_eq!(pixels, [42]);
}

#[test]
fn unknown_critical_chunk_is_an_error() {
    let file = handmade(1, 1, 8, 0, 0, &[(b"ABCD", vec![1, 2])], &[0, 42]);
    let mut stream = ByteReader::new(&file[..]);

    assert!(PngDecoder::new(&mut stream).decode_headers().is_err());

    // lowercase first letter, ancillary
    let file = handmade(1, 1, 8, 0, 0, &[(b"aBCD", vec![1, 2])], &[0, 42]);
    assert_eq!(decode(&file).unwrap().0, [42]);
}

#[test]
fn dimension_limits() {
    let file = handmade(100, 1, 8, 0, 0, &[], &[0; 101]);
    let mut stream = ByteReader::new(&file[..]);
    let limits = DecoderLimits::default().set_max_width(50);

    let result = PngDecoder::new_with_limits(&mut stream, limits).decode_headers();
    assert!(matches!(result, Err(PngDecodeErrors::TooLargeDimensions(..))));
}

#[test]
fn truncated_file_is_an_error() {
    let file = handmade(16, 16, 8, 2, 0, &[], &[0; 16 * 49]);
    let truncated = &file[..file.len() - 30];

    assert!(decode(truncated).is_err());
}

#[test]
fn monitor_sees_every_row() {
    let file = handmade(2, 3, 8, 0, 0, &[], &[0, 1, 2, 0, 3, 4, 0, 5, 6]);
    let mut stream = ByteReader::new(&file[..]);
    let mut seen = Vec::new();

    let mut monitor = |done: usize, total: usize, dirty: Option<Rect>| {
        seen.push((done, total, dirty));
        true
    };
    PngDecoder::new(&mut stream).decode(&mut monitor).unwrap();

    assert_eq!(seen.len(), 4);
    assert_eq!(seen[0], (0, 3, None));
    assert_eq!(seen[3], (3, 3, Some(Rect::new(0, 2, 2, 1))));
}

/// Signature followed by one chunk header declaring `length` bytes
fn lying_chunk(name: &[u8; 4], length: u32, trailing: usize) -> Vec<u8> {
    let mut out = vec![137, 80, 78, 71, 13, 10, 26, 10];
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(name);
    out.resize(out.len() + trailing, 0);
    out
}

#[test]
fn huge_ihdr_length_is_rejected() {
    // 33 bytes claiming a 2 GiB header
    let file = lying_chunk(b"IHDR", 0x7FFF_FFF0, 17);
    assert_eq!(file.len(), 33);

    let mut stream = ByteReader::new(&file[..]);
    assert!(PngDecoder::new(&mut stream).decode_headers().is_err());
}

#[test]
fn ihdr_length_must_be_thirteen() {
    let mut file = lying_chunk(b"IHDR", 14, 0);
    file.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 1, 8, 0, 0, 0, 0, 0, 0, 0, 0, 0]);

    let mut stream = ByteReader::new(&file[..]);
    let err = PngDecoder::new(&mut stream).decode_headers().unwrap_err();
    assert!(matches!(err, PngDecodeErrors::Generic(_)), "{err:?}");
}

#[test]
fn oversized_palette_chunks_are_rejected() {
    let valid = handmade(1, 1, 8, 3, 0, &[(b"PLTE", vec![0; 3])], &[0, 0]);
    // IHDR chunk ends at 33, the PLTE length follows
    for length in [0x7FFF_FF00_u32, 771, 769] {
        let mut file = valid.clone();
        file[33..37].copy_from_slice(&length.to_be_bytes());

        let mut stream = ByteReader::new(&file[..]);
        assert!(PngDecoder::new(&mut stream).decode_headers().is_err(), "{length}");
    }
    let mut stream = ByteReader::new(&valid[..]);
    assert!(PngDecoder::new(&mut stream).decode_headers().is_ok());
}

#[test]
fn oversized_transparency_chunk_is_rejected() {
    let file = handmade(
        1,
        1,
        8,
        3,
        0,
        &[(b"PLTE", vec![0; 3]), (b"tRNS", vec![0; 257])],
        &[0, 0]
    );
    let mut stream = ByteReader::new(&file[..]);
    assert!(PngDecoder::new(&mut stream).decode_headers().is_err());
}

#[test]
fn huge_idat_length_is_a_truncation() {
    let mut file = handmade(1, 1, 8, 0, 0, &[], &[0, 42]);
    // IDAT chunk starts right after IHDR
    file[33..37].copy_from_slice(&0x7FFF_FFF0_u32.to_be_bytes());

    assert!(decode(&file).is_err());
}
