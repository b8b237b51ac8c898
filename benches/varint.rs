use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use protoflect::varint::{read_varint64, write_varint64};

fn varint_decoding_single(c: &mut Criterion) {
    let values: Vec<_> = [
        1u64,
        0x0000_0000_0000_0080,
        0x0000_0000_0080_0000,
        0x0000_0000_8000_0000,
        0x0080_0000_0000_0000,
        u64::MAX,
    ]
    .into_iter()
    .map(|value| {
        let mut buffer = Vec::with_capacity(16);
        #[allow(clippy::as_conversions)]
        let len = write_varint64(
            (value & 0xffff_ffff) as u32,
            (value >> 32) as u32,
            &mut buffer,
        );
        (buffer, len)
    })
    .collect();

    let mut group = c.benchmark_group("decoding_single");
    for (data, len) in &values {
        group.bench_with_input(BenchmarkId::new("protoflect", len), &data, |b, data| {
            b.iter(|| {
                let value = read_varint64(&data[..]);
                std::hint::black_box(value)
            })
        });
    }
}

fn varint_encoding_single(c: &mut Criterion) {
    let halves: Vec<(u32, u32, usize)> = [1u64, 0x8000, 0x8000_0000, 0x0080_0000_0000_0000]
        .into_iter()
        .map(|value| {
            #[allow(clippy::as_conversions)]
            let (lo, hi) = ((value & 0xffff_ffff) as u32, (value >> 32) as u32);
            let mut scratch = Vec::with_capacity(16);
            let len = write_varint64(lo, hi, &mut scratch);
            (lo, hi, len)
        })
        .collect();

    let mut group = c.benchmark_group("encoding_single");
    for (lo, hi, len) in halves {
        group.bench_with_input(
            BenchmarkId::new("protoflect", len),
            &(lo, hi),
            |b, &(lo, hi)| {
                let mut buffer = Vec::with_capacity(16);
                b.iter(|| {
                    buffer.clear();
                    let len = write_varint64(lo, hi, &mut buffer);
                    std::hint::black_box(len)
                })
            },
        );
    }
}

criterion_group!(benches, varint_decoding_single, varint_encoding_single);
criterion_main!(benches);
