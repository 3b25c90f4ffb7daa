//! Criterion benchmarks for the 3-byte key event codec and the queue envelope.
//!
//! Every key press goes through `encode_key_event` once and through the
//! queue's bincode envelope twice (push and pop), so these are the hot path
//! between the keyboard and the radio.
//!
//! Run with:
//! ```bash
//! cargo bench --package keyproxy-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use keyproxy_core::protocol::codec::{decode_key_event, encode_key_event, is_keepalive};
use keyproxy_core::{event_queue, KeyEvent, ModifierMask};

// ── Event fixtures ────────────────────────────────────────────────────────────

fn fixtures() -> Vec<(&'static str, KeyEvent)> {
    vec![
        ("plain_down", KeyEvent::down(0x04, ModifierMask::NONE)),
        ("plain_up", KeyEvent::up(0x04, ModifierMask::NONE)),
        (
            "shifted_down",
            KeyEvent::down(0x05, ModifierMask(ModifierMask::LEFT_SHIFT)),
        ),
        ("all_mods_down", KeyEvent::down(0x28, ModifierMask(0xFF))),
    ]
}

// ── Benchmark groups ──────────────────────────────────────────────────────────

/// Benchmarks `encode_key_event` for representative events.
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_key_event");
    for (name, event) in fixtures() {
        group.bench_with_input(BenchmarkId::new("event", name), &event, |b, event| {
            b.iter(|| encode_key_event(black_box(event)))
        });
    }
    group.finish();
}

/// Benchmarks `decode_key_event` from pre-encoded frames.
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_key_event");
    for (name, event) in fixtures() {
        let frame = encode_key_event(&event);
        group.bench_with_input(BenchmarkId::new("event", name), &frame, |b, frame| {
            b.iter(|| decode_key_event(black_box(frame)).expect("decode must succeed"))
        });
    }
    group.bench_function("is_keepalive", |b| {
        b.iter(|| is_keepalive(black_box(&[0u8, 0, 0])))
    });
    group.finish();
}

/// Benchmarks one push+pop through the queue envelope.
fn bench_queue_roundtrip(c: &mut Criterion) {
    let (tx, mut rx) = event_queue();
    let event = KeyEvent::down(0x04, ModifierMask(ModifierMask::LEFT_SHIFT));

    c.bench_function("queue_push_pop", |b| {
        b.iter(|| {
            tx.push(black_box(&event)).expect("push must succeed");
            rx.try_pop().expect("pop must succeed")
        })
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_queue_roundtrip);
criterion_main!(benches);
