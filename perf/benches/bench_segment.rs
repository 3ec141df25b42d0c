use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use meridian_fix::Fix;
use meridian_perf::{make_test_fix, temp_segment_key};
use meridian_shm::{Publisher, Reader, RetryPolicy};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

fn bench_publish(c: &mut Criterion) {
    let key = temp_segment_key("crit_pub");
    let mut publisher = Publisher::<Fix>::create(&key).expect("failed to create publisher");
    let fix = make_test_fix();

    let mut group = c.benchmark_group("segment");
    group.throughput(Throughput::Elements(1));

    group.bench_function("publish", |b| {
        b.iter(|| publisher.publish(black_box(fix)));
    });

    drop(group);
    drop(publisher);
    let _ = Publisher::<Fix>::destroy(&key);
}

fn bench_read_quiet(c: &mut Criterion) {
    let key = temp_segment_key("crit_read");
    let mut publisher = Publisher::<Fix>::create(&key).expect("failed to create publisher");
    let reader = Reader::<Fix>::open(&key).expect("failed to open reader");
    publisher.publish(make_test_fix());

    let mut group = c.benchmark_group("segment");
    group.throughput(Throughput::Elements(1));

    group.bench_function("read (quiet)", |b| {
        b.iter(|| black_box(reader.read()));
    });

    group.bench_function("generation", |b| {
        b.iter(|| black_box(reader.generation()));
    });

    drop(group);
    drop(publisher);
    drop(reader);
    let _ = Publisher::<Fix>::destroy(&key);
}

fn bench_round_trip(c: &mut Criterion) {
    let key = temp_segment_key("crit_rt");
    let mut publisher = Publisher::<Fix>::create(&key).expect("failed to create publisher");
    let reader = Reader::<Fix>::open(&key).expect("failed to open reader");
    let fix = make_test_fix();

    let mut group = c.benchmark_group("segment");
    group.throughput(Throughput::Elements(1));

    group.bench_function("round_trip", |b| {
        b.iter(|| {
            publisher.publish(black_box(fix));
            black_box(reader.read())
        });
    });

    drop(group);
    drop(publisher);
    drop(reader);
    let _ = Publisher::<Fix>::destroy(&key);
}

/// Reader cost while another thread publishes flat out.
fn bench_read_contended(c: &mut Criterion) {
    let key = temp_segment_key("crit_contended");
    let mut publisher = Publisher::<Fix>::create(&key).expect("failed to create publisher");
    let reader = Reader::<Fix>::open(&key).expect("failed to open reader");
    let stop = Arc::new(AtomicBool::new(false));

    let writer = {
        let stop = Arc::clone(&stop);
        std::thread::spawn(move || {
            let mut fix = make_test_fix();
            while !stop.load(Ordering::Relaxed) {
                fix.time += 1.0;
                publisher.publish(fix);
            }
        })
    };

    let policy = RetryPolicy::default();
    let mut group = c.benchmark_group("segment");
    group.throughput(Throughput::Elements(1));

    group.bench_function("read (contended)", |b| {
        b.iter(|| black_box(reader.read()));
    });

    group.bench_function("read_with_retry (contended)", |b| {
        b.iter(|| black_box(reader.read_with_retry(&policy)));
    });

    drop(group);
    stop.store(true, Ordering::Relaxed);
    let _ = writer.join();
    drop(reader);
    let _ = Publisher::<Fix>::destroy(&key);
}

criterion_group!(
    benches,
    bench_publish,
    bench_read_quiet,
    bench_round_trip,
    bench_read_contended,
);
criterion_main!(benches);
