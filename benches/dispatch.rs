//! Dispatch benchmark suite.
//!
//! Measures the inbound path at different listener counts:
//! - Frame decoding (`42["score_update",{...}]`)
//! - Fan-out through the bus and registry
//!
//! Run with: cargo bench --bench dispatch
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use party_connector::protocol::Packet;
use party_connector::{DispatchBridge, EventBus, ListenerRegistry, listener};
use serde_json::json;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const LISTENER_COUNTS: &[usize] = &[1, 10, 100];
const SUBSCRIBER_COUNTS: &[usize] = &[0, 1, 8];

const SCORE_FRAME: &str =
    r#"42["score_update",{"scores":{"t1":12,"t2":9,"t3":15},"round":4,"final":false}]"#;

// ============================================================================
// Benchmark: Frame Decoding
// ============================================================================

fn bench_decode(c: &mut Criterion) {
    c.bench_function("decode_event_frame", |b| {
        b.iter(|| Packet::decode(black_box(SCORE_FRAME)));
    });
}

// ============================================================================
// Benchmark: Fan-out
// ============================================================================

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");

    for &listeners in LISTENER_COUNTS {
        for &subscribers in SUBSCRIBER_COUNTS {
            let bus = EventBus::new();
            let registry = Arc::new(ListenerRegistry::new());
            let calls = Arc::new(AtomicUsize::new(0));

            for _ in 0..listeners {
                let calls = Arc::clone(&calls);
                registry.on(
                    "score-update",
                    listener(move |_| {
                        calls.fetch_add(1, Ordering::Relaxed);
                    }),
                );
            }

            // Receivers are kept alive but never drained; the channel
            // overwrites old entries once full.
            let _receivers: Vec<_> = (0..subscribers).map(|_| bus.subscribe()).collect();

            let bridge = DispatchBridge::new()
                .with_sink(Arc::new(bus.clone()))
                .with_sink(registry);

            group.bench_with_input(
                BenchmarkId::new(format!("listeners_{listeners}"), subscribers),
                &subscribers,
                |b, _| {
                    b.iter(|| {
                        bridge.publish("score-update", black_box(json!({ "scores": { "t1": 1 } })))
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_decode, bench_fan_out);
criterion_main!(benches);
