//! Rendezvous latency benchmark suite.
//!
//! Benchmarks the cost of a complete synchronization between two threads:
//! - Plain send/receive round trips against an echo process
//! - Guarded receives that must skip non-matching senders
//! - Two-way select round trips (lockdown, accept and commit)
//! - Mailbox post/receive without any channel involved

#![allow(missing_docs)]
#![allow(clippy::semicolon_if_nothing_returned)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use rendezvous::{Action, Channel, ChannelId, Config, Epoch, Message, OfferId, Process, Registry};
use std::sync::Arc;
use std::thread::JoinHandle;

const STOP: u64 = u64::MAX;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn registry() -> Arc<Registry> {
    Registry::new(Config::new())
}

/// Echoes every value from `inbound` back on `outbound` until `STOP`.
fn spawn_echo(registry: &Arc<Registry>, inbound: &Channel<u64>, outbound: &Channel<u64>) -> JoinHandle<()> {
    let process = registry.process();
    let (inbound, outbound) = (inbound.clone(), outbound.clone());
    std::thread::spawn(move || loop {
        let Ok(v) = process.execute(Action::receive(&inbound)) else {
            return;
        };
        if v == STOP || process.execute(Action::send(&outbound, v)).is_err() {
            return;
        }
    })
}

fn stop(process: &Process, channel: &Channel<u64>, echo: JoinHandle<()>) {
    let _ = process.execute(Action::send(channel, STOP));
    let _ = echo.join();
}

// =============================================================================
// PLAIN ROUND TRIPS
// =============================================================================

fn bench_plain_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("plain");
    group.throughput(Throughput::Elements(2));

    let registry = registry();
    let me = registry.process();
    let (to_echo, from_echo) = (Channel::<u64>::new(), Channel::<u64>::new());
    let echo = spawn_echo(&registry, &to_echo, &from_echo);

    group.bench_function("round_trip", |b| {
        let mut n = 0_u64;
        b.iter(|| {
            n += 1;
            me.execute(Action::send(&to_echo, n)).ok();
            black_box(me.execute(Action::receive(&from_echo)).ok())
        })
    });

    stop(&me, &to_echo, echo);
    group.finish();
}

// =============================================================================
// GUARDED RECEIVES
// =============================================================================

/// A guarded receive with `blockers` parked senders whose values it rejects.
fn bench_guarded_receive(c: &mut Criterion) {
    let mut group = c.benchmark_group("guarded");

    for blockers in [0_u64, 4, 16] {
        let registry = registry();
        let me = registry.process();
        let (to_echo, from_echo) = (Channel::<u64>::new(), Channel::<u64>::new());
        let echo = spawn_echo(&registry, &to_echo, &from_echo);

        let parked: Vec<_> = (0..blockers)
            .map(|i| {
                let process = registry.process();
                let ch = from_echo.clone();
                std::thread::spawn(move || process.execute(Action::send(&ch, STOP - 1 - i)))
            })
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(blockers), &blockers, |b, _| {
            let mut n = 0_u64;
            b.iter(|| {
                n += 1;
                let want = n;
                me.execute(Action::send(&to_echo, n)).ok();
                black_box(
                    me.execute(Action::receive_when(&from_echo, move |v| *v == want))
                        .ok(),
                )
            })
        });

        for _ in &parked {
            let _ = me.execute(Action::receive(&from_echo));
        }
        for handle in parked {
            let _ = handle.join();
        }
        stop(&me, &to_echo, echo);
    }
    group.finish();
}

// =============================================================================
// SELECT ROUND TRIPS
// =============================================================================

fn bench_select_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("select");
    group.throughput(Throughput::Elements(2));

    let registry = registry();
    let me = registry.process();
    let (left, right, back) = (Channel::<u64>::new(), Channel::<u64>::new(), Channel::<u64>::new());

    let selector = {
        let process = registry.process();
        let (left, right, back) = (left.clone(), right.clone(), back.clone());
        std::thread::spawn(move || loop {
            let Ok(v) = process.select([
                Some(Action::receive(&left).arm()),
                Some(Action::receive(&right).arm()),
            ]) else {
                return;
            };
            if v == STOP || process.execute(Action::send(&back, v)).is_err() {
                return;
            }
        })
    };

    group.bench_function("two_way", |b| {
        let mut n = 0_u64;
        b.iter(|| {
            n += 1;
            let target = if n % 2 == 0 { &left } else { &right };
            me.execute(Action::send(target, n)).ok();
            black_box(me.execute(Action::receive(&back)).ok())
        })
    });

    stop(&me, &left, selector);
    group.finish();
}

// =============================================================================
// MAILBOX
// =============================================================================

fn bench_mailbox(c: &mut Criterion) {
    let mut group = c.benchmark_group("mailbox");

    for batch in [1_usize, 64] {
        let registry = registry();
        let process = registry.process();
        let msg = Message::commit(
            OfferId::new_for_test(1),
            ChannelId::new_for_test(1),
            Epoch::ZERO,
        );
        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::new("post_receive", batch), &batch, |b, &batch| {
            b.iter(|| {
                for _ in 0..batch {
                    registry.send(process.id(), black_box(msg));
                }
                for _ in 0..batch {
                    black_box(process.receive().ok());
                }
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_plain_round_trip,
    bench_guarded_receive,
    bench_select_round_trip,
    bench_mailbox
);
criterion_main!(benches);
