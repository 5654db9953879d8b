/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! The encoder output is read back by a small GIF reader written for these tests

use imcodec_core::bytestream::ByteWriter;
use imcodec_core::monitor::{NoopMonitor, Rect};
use imcodec_core::options::{GifOptions, GifRepeat};
use imcodec_gif::{probe_gif, screen_dimensions, GifEncoder, GifEncoderErrors};
use nanorand::{Rng, WyRand};

struct Frame {
    delay:  u16,
    pixels: Vec<[u8; 4]>
}

struct Gif {
    width:  usize,
    height: usize,
    loops:  Option<u16>,
    frames: Vec<Frame>
}

fn lzw_decode(data: &[u8], min_code_size: u8) -> Vec<u8> {
    let clear = 1_usize << min_code_size;
    let end = clear + 1;
    let mut size = min_code_size + 1;
    let mut table: Vec<Vec<u8>> = (0..clear).map(|x| vec![x as u8]).collect();
    table.push(Vec::new());
    table.push(Vec::new());

    let mut out = Vec::new();
    let mut prev: Option<usize> = None;
    let mut running = end + 1;
    let (mut acc, mut nbits, mut pos) = (0_u32, 0_u8, 0);

    loop {
        while nbits < size {
            acc |= u32::from(data[pos]) << nbits;
            pos += 1;
            nbits += 8;
        }
        let code = (acc & ((1 << size) - 1)) as usize;
        acc >>= size;
        nbits -= size;

        if code == clear {
            table.truncate(end + 1);
            size = min_code_size + 1;
            running = end + 1;
            prev = None;
            continue;
        }
        if code == end {
            return out;
        }
        let entry = match prev {
            None => table[code].clone(),
            Some(p) => {
                let entry = if code < table.len() {
                    table[code].clone()
                } else {
                    let mut e = table[p].clone();
                    e.push(table[p][0]);
                    e
                };
                if table.len() < 4096 {
                    let mut new = table[p].clone();
                    new.push(entry[0]);
                    table.push(new);
                }
                entry
            }
        };
        out.extend_from_slice(&entry);
        prev = Some(code);

        // every data code reserves the next table slot
        running += 1;
        if running > (1 << size) && size < 12 {
            size += 1;
        }
    }
}

fn read_gif(data: &[u8]) -> Gif {
    assert_eq!(&data[..6], b"GIF89a");
    let u16_at = |pos: usize| u16::from_le_bytes([data[pos], data[pos + 1]]);

    let mut gif = Gif {
        width:  usize::from(u16_at(6)),
        height: usize::from(u16_at(8)),
        loops:  None,
        frames: Vec::new()
    };
    // no global color table
    assert_eq!(data[10] & 0x80, 0);

    let mut pos = 13;
    let mut delay = 0;
    let mut transparent = None;

    loop {
        match data[pos] {
            0x21 if data[pos + 1] == 0xFF => {
                assert_eq!(&data[pos + 3..pos + 14], b"NETSCAPE2.0");
                gif.loops = Some(u16_at(pos + 16));
                pos += 19;
            }
            0x21 if data[pos + 1] == 0xF9 => {
                delay = u16_at(pos + 4);
                transparent = (data[pos + 3] & 1 == 1).then_some(data[pos + 6]);
                pos += 8;
            }
            0x2C => {
                let width = usize::from(u16_at(pos + 5));
                let height = usize::from(u16_at(pos + 7));
                let packed = data[pos + 9];
                assert_eq!(packed & 0x80, 0x80);

                let table_size = 2 << (packed & 7);
                let table = &data[pos + 10..pos + 10 + table_size * 3];
                pos += 10 + table_size * 3;

                let min_code_size = data[pos];
                pos += 1;

                let mut compressed = Vec::new();
                while data[pos] != 0 {
                    let len = usize::from(data[pos]);
                    compressed.extend_from_slice(&data[pos + 1..pos + 1 + len]);
                    pos += 1 + len;
                }
                pos += 1;

                let indices = lzw_decode(&compressed, min_code_size);
                assert_eq!(indices.len(), width * height);

                let pixels = indices
                    .iter()
                    .map(|i| {
                        let i = usize::from(*i);
                        if Some(i as u8) == transparent {
                            [0, 0, 0, 0]
                        } else {
                            [table[i * 3], table[i * 3 + 1], table[i * 3 + 2], 255]
                        }
                    })
                    .collect();
                gif.frames.push(Frame { delay, pixels });
            }
            0x3B => return gif,
            other => panic!("Unexpected block {other:#X}")
        }
    }
}

fn encode(frames: &[(&[u8], u16)], width: usize, height: usize, options: GifOptions) -> Vec<u8> {
    let mut sink = ByteWriter::new(Vec::new());
    let mut encoder = GifEncoder::new(width, height, options);

    for (pixels, delay) in frames {
        encoder
            .write_frame(&mut sink, pixels, *delay, &mut NoopMonitor)
            .unwrap();
    }
    encoder.finish(&mut sink).unwrap();
    sink.consume()
}

#[test]
fn exact_palette_round_trip() {
    let (width, height) = (37, 23);
    let colors = [[255, 0, 0], [0, 255, 0], [0, 0, 255], [12, 34, 56], [200, 200, 10]];
    let mut rand = WyRand::new_seed(7);

    let rgba: Vec<u8> = (0..width * height)
        .flat_map(|_| {
            let [r, g, b] = colors[rand.generate_range(0_usize..colors.len())];
            [r, g, b, 255]
        })
        .collect();

    let file = encode(&[(&rgba[..], 10)], width, height, GifOptions::default());
    let gif = read_gif(&file);

    assert_eq!((gif.width, gif.height), (width, height));
    assert_eq!(gif.frames.len(), 1);
    assert_eq!(gif.frames[0].delay, 10);

    let decoded: Vec<u8> = gif.frames[0].pixels.iter().flatten().copied().collect();
    assert_eq!(decoded, rgba);
}

#[test]
fn large_frames_exercise_table_resets() {
    let (width, height) = (256, 200);
    // noise over 256 colors keeps the code table filling up
    let mut rand = WyRand::new_seed(11);
    let mut gray = vec![0_u8; width * height];
    rand.fill(&mut gray);

    let rgba: Vec<u8> = gray.iter().flat_map(|g| [*g, *g, *g, 255]).collect();
    let file = encode(&[(&rgba[..], 4)], width, height, GifOptions::default());
    let gif = read_gif(&file);

    let decoded: Vec<u8> = gif.frames[0].pixels.iter().flatten().copied().collect();
    assert_eq!(decoded, rgba);
}

#[test]
fn transparency_and_animation() {
    let first = [255, 0, 0, 255, 0, 0, 0, 0];
    let second = [0, 255, 0, 255, 0, 0, 255, 255];

    let options = GifOptions::default().set_repeat(GifRepeat::Finite(3));
    let file = encode(&[(&first[..], 20), (&second[..], 30)], 2, 1, options);
    let gif = read_gif(&file);

    assert_eq!(gif.loops, Some(3));
    assert_eq!(gif.frames.len(), 2);
    assert_eq!(gif.frames[0].pixels, [[255, 0, 0, 255], [0, 0, 0, 0]]);
    assert_eq!(gif.frames[1].pixels, [[0, 255, 0, 255], [0, 0, 255, 255]]);
    assert_eq!(gif.frames[1].delay, 30);
}

#[test]
fn play_once_has_no_loop_extension() {
    let options = GifOptions::default().set_repeat(GifRepeat::Finite(0));
    let file = encode(&[(&[1, 2, 3, 255][..], 0)], 1, 1, options);

    assert_eq!(read_gif(&file).loops, None);
    assert_eq!(read_gif(&encode(&[(&[1, 2, 3, 255][..], 0)], 1, 1, GifOptions::default())).loops, Some(0));
}

#[test]
fn more_than_256_colors_are_quantized() {
    let (width, height) = (64, 64);
    let rgba: Vec<u8> = (0..width * height)
        .flat_map(|i| [(i % 64 * 4) as u8, (i / 64 * 4) as u8, 128, 255])
        .collect();

    let file = encode(&[(&rgba[..], 0)], width, height, GifOptions::default());
    let gif = read_gif(&file);

    for (original, decoded) in rgba.chunks_exact(4).zip(&gif.frames[0].pixels) {
        for c in 0..3 {
            assert!((i32::from(original[c]) - i32::from(decoded[c])).abs() <= 16);
        }
    }
}

#[test]
fn identification_helpers() {
    let file = encode(&[(&[0; 4 * 6][..], 0)], 3, 2, GifOptions::default());

    assert!(probe_gif(&file));
    assert!(probe_gif(b"GIF87a...."));
    assert!(!probe_gif(b"GIF88a"));
    assert_eq!(screen_dimensions(&file), Some((3, 2)));
}

#[test]
fn cancelled_before_start_writes_nothing() {
    let mut sink = ByteWriter::new(Vec::new());
    let mut encoder = GifEncoder::new(2, 2, GifOptions::default());
    let mut refuse = |_: usize, _: usize, _: Option<Rect>| false;

    let result = encoder.write_frame(&mut sink, &[0; 16], 0, &mut refuse);

    assert!(matches!(result, Err(GifEncoderErrors::Interrupted)));
    assert_eq!(sink.bytes_written(), 0);
}

#[test]
fn frames_after_finish_are_rejected() {
    let mut sink = ByteWriter::new(Vec::new());
    let mut encoder = GifEncoder::new(1, 1, GifOptions::default());

    encoder.finish(&mut sink).unwrap();
    let result = encoder.write_frame(&mut sink, &[0; 4], 0, &mut NoopMonitor);

    assert!(matches!(result, Err(GifEncoderErrors::AlreadyFinished)));
}
