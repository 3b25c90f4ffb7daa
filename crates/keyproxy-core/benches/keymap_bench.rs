//! Criterion benchmarks for the HID usage table.
//!
//! The overlay resolves a name for every key-down, so `scancode_name` runs
//! once per press on the capture thread.
//!
//! Run with:
//! ```bash
//! cargo bench --package keyproxy-core --bench keymap_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use keyproxy_core::keymap::{scancode_name, HidKeyCode};

// ── Representative key codes for benchmarking ─────────────────────────────────

/// Raw usages covering letters, digits, control keys, modifiers and gaps.
const BENCH_SCANCODES: &[u8] = &[
    0x04, 0x1D, 0x1E, 0x27, 0x28, 0x29, 0x2A, 0x2B, 0x2C, 0x3A, 0x45, 0x4F, 0x52, 0x58, 0x62,
    0xE0, 0xE1, 0xE7, 0x00, 0xFF,
];

fn bench_from_u8(c: &mut Criterion) {
    let mut group = c.benchmark_group("keymap_hid");

    group.bench_function("from_u8_single", |b| {
        b.iter(|| HidKeyCode::from_u8(black_box(0x04)))
    });

    group.bench_function("from_u8_batch_20", |b| {
        b.iter(|| {
            BENCH_SCANCODES
                .iter()
                .map(|&raw| HidKeyCode::from_u8(black_box(raw)))
                .collect::<Vec<_>>()
        })
    });

    group.finish();
}

fn bench_scancode_name(c: &mut Criterion) {
    let mut group = c.benchmark_group("keymap_names");

    group.bench_function("scancode_name_batch_20", |b| {
        b.iter(|| {
            BENCH_SCANCODES
                .iter()
                .map(|&raw| scancode_name(black_box(raw)))
                .collect::<Vec<_>>()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_from_u8, bench_scancode_name);
criterion_main!(benches);
