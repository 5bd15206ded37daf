use criterion::{criterion_group, criterion_main, Criterion};
use sixel_stream::{sixel_decode, Action, Band, BandDecoder, DecodeHandler};
use std::hint::black_box;

// Small stream with a single color
const SIMPLE_SIXEL: &[u8] = b"\x1bPq#0;2;100;0;0#0~~~\x1b\\";

// Color switches and bands
const COMPLEX_SIXEL: &[u8] = b"\x1bPq\
    #0;2;100;0;0#1;2;0;100;0#2;2;0;0;100\
    #0!10~#1!10~#2!10~-\
    #0!10@#1!10@#2!10@-\
    #0!10B#1!10B#2!10B\
    \x1b\\";

// Repeat counts across multiple bands
const REPEATED_SIXEL: &[u8] = b"\x1bPq\
    #0;2;50;50;50\
    #0!50?!50@!50B!50F!50N!50^-\
    #0!50?!50@!50B!50F!50N!50^-\
    #0!50?!50@!50B!50F!50N!50^\
    \x1b\\";

fn bench_simple_decode(c: &mut Criterion) {
    c.bench_function("decode_simple_sixel", |b| {
        b.iter(|| {
            let result = sixel_decode(black_box(SIMPLE_SIXEL));
            assert!(result.is_ok());
            result
        })
    });
}

fn bench_complex_decode(c: &mut Criterion) {
    c.bench_function("decode_complex_sixel", |b| {
        b.iter(|| {
            let result = sixel_decode(black_box(COMPLEX_SIXEL));
            assert!(result.is_ok());
            result
        })
    });
}

fn bench_repeated_decode(c: &mut Criterion) {
    c.bench_function("decode_repeated_sixel", |b| {
        b.iter(|| {
            let result = sixel_decode(black_box(REPEATED_SIXEL));
            assert!(result.is_ok());
            result
        })
    });
}

struct Count(usize);

impl DecodeHandler for Count {
    fn handle_band(&mut self, band: Band<'_>) -> Action {
        self.0 += band.width();
        Action::Continue
    }
}

// 100 bands of 1000 dense columns each, exercising the wide-kernel path
fn dense_payload() -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(b"\"1;1;1000;600");
    for _ in 0..100 {
        for chunk in 0..10 {
            data.push(b'#');
            data.extend_from_slice((chunk % 3).to_string().as_bytes());
            for code in 0..100u8 {
                data.push(b'?' + (code & 0x3F));
            }
        }
        data.push(b'-');
    }
    data
}

fn bench_band_core(c: &mut Criterion) {
    let payload = dense_payload();
    c.bench_function("decode_dense_bands", |b| {
        let mut decoder = BandDecoder::new();
        b.iter(|| {
            let mut count = Count(0);
            decoder.init(0xFFFFFFFF, 0xFF000000, 256, true);
            decoder.decode_bytes(black_box(&payload), &mut count);
            assert_eq!(count.0, 100 * 1000);
            count.0
        })
    });
}

criterion_group!(
    benches,
    bench_simple_decode,
    bench_complex_decode,
    bench_repeated_decode,
    bench_band_core
);
criterion_main!(benches);
