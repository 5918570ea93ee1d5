//! Throughput of the live stream decoder.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cti_connector::sse::SseDecoder;

/// `count` create events with an indicator payload.
fn generate_stream(count: usize) -> Vec<u8> {
    (0..count)
        .map(|i| {
            format!(
                "id: {}-0\nevent: create\ndata: {{\"type\": \"indicator\", \"id\": \"indicator--{}\", \"pattern\": \"[ipv4-addr:value = '198.51.100.{}']\"}}\n\n",
                1_700_000_000_000u64 + i as u64,
                i,
                i % 255
            )
        })
        .collect::<String>()
        .into_bytes()
}

fn bench_decode_whole_body(c: &mut Criterion) {
    let mut group = c.benchmark_group("sse_decode_whole_body");

    for count in [10, 100, 1000].iter() {
        let body = generate_stream(*count);
        group.throughput(Throughput::Bytes(body.len() as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_events", count)),
            &body,
            |b, body| {
                b.iter(|| {
                    let mut decoder = SseDecoder::new();
                    let events = decoder.feed(black_box(body)).unwrap();
                    black_box(events)
                });
            },
        );
    }

    group.finish();
}

/// Network-sized chunks split events and lines at arbitrary offsets.
fn bench_decode_chunked(c: &mut Criterion) {
    let mut group = c.benchmark_group("sse_decode_chunked");
    let body = generate_stream(1000);
    group.throughput(Throughput::Bytes(body.len() as u64));

    for chunk_size in [64, 1024, 16 * 1024].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_byte_chunks", chunk_size)),
            chunk_size,
            |b, &chunk_size| {
                b.iter(|| {
                    let mut decoder = SseDecoder::new();
                    let mut total = 0;
                    for chunk in body.chunks(chunk_size) {
                        total += decoder.feed(black_box(chunk)).unwrap().len();
                    }
                    black_box(total)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_decode_whole_body, bench_decode_chunked);
criterion_main!(benches);
