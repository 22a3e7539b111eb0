use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use audio_level_monitor::monitor::ExtremumTracker;

fn bench_process_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_block");

    for &block_size in &[64usize, 480, 4096] {
        let block: Vec<f32> = (0..block_size)
            .map(|i| (i as f32 * 0.05).sin() * 0.8)
            .collect();

        group.throughput(Throughput::Elements(block_size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(block_size), &block, |b, block| {
            let mut tracker = ExtremumTracker::new();
            tracker.configure(48_000.0, block_size);
            b.iter(|| tracker.process_block(black_box(block), true));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_process_block);
criterion_main!(benches);
