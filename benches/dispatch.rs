//! Session dispatch benchmark suite.
//!
//! Measures the synchronous hot paths over an in-memory socket:
//! - Inbound relay frames parsed and dispatched as events
//! - Outbound signals classified, encoded and written
//!
//! Run with: cargo bench --bench dispatch
//! Results saved to: target/criterion/

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use peer_signal::protocol::classify;
use peer_signal::transport::SocketNotices;
use peer_signal::{MemorySocketFactory, Session, SessionEvents, SignalOptions};
use serde_json::json;
use tokio::sync::mpsc;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const BATCH_SIZES: &[usize] = &[1, 100, 1000];

const CANDIDATE_FRAME: &str =
    r#"{"type":"CANDIDATE","src":"p2","payload":{"candidate":{"candidate":"candidate:1 1 UDP 2122252543 10.0.0.2 49203 typ host"}}}"#;

// ============================================================================
// Fixture
// ============================================================================

struct Fixture {
    session: Session,
    notices: SocketNotices,
    events: SessionEvents,
    factory: MemorySocketFactory,
}

impl Fixture {
    /// Builds a session that has confirmed the identity `bench`.
    fn open() -> Self {
        let factory = MemorySocketFactory::new();
        let options = SignalOptions::new()
            .with_host("bench")
            .with_port(1)
            .with_socket_factory(factory.clone());
        let (tx, events) = mpsc::unbounded_channel();
        let (session, notices) = Session::new(options, tx).expect("session");

        let mut fixture = Self {
            session,
            notices,
            events,
            factory,
        };

        fixture.session.initialize("bench");
        let socket = fixture.factory.last().expect("socket");
        socket.open();
        socket.receive(r#"{"type":"OPEN"}"#);
        fixture.pump();
        while fixture.events.try_recv().is_ok() {}

        fixture
    }

    fn pump(&mut self) {
        while let Ok(notice) = self.notices.try_recv() {
            self.session.handle_notice(notice);
        }
    }
}

// ============================================================================
// Benchmark: Inbound Dispatch
// ============================================================================

fn bench_inbound(c: &mut Criterion) {
    let mut group = c.benchmark_group("inbound");

    for &size in BATCH_SIZES {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("candidate", size), &size, |b, &size| {
            b.iter_batched(
                || {
                    let fixture = Fixture::open();
                    let socket = fixture.factory.last().expect("socket");
                    for _ in 0..size {
                        socket.receive(CANDIDATE_FRAME);
                    }
                    fixture
                },
                |mut fixture| {
                    fixture.pump();
                    fixture
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Outbound Signals
// ============================================================================

fn bench_outbound(c: &mut Criterion) {
    let mut group = c.benchmark_group("outbound");

    for &size in BATCH_SIZES {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("offer", size), &size, |b, &size| {
            b.iter_batched(
                Fixture::open,
                |mut fixture| {
                    for _ in 0..size {
                        fixture
                            .session
                            .signal("peer2", json!({ "type": "offer", "sdp": "v=0" }));
                    }
                    fixture
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Classification
// ============================================================================

fn bench_classify(c: &mut Criterion) {
    let offer = json!({ "type": "offer", "sdp": "v=0" });
    let candidate = json!({ "candidate": { "candidate": "candidate:1" } });
    let unknown = json!({ "hello": "world" });

    let mut group = c.benchmark_group("classify");
    group.bench_function("offer", |b| b.iter(|| classify(&offer)));
    group.bench_function("candidate", |b| b.iter(|| classify(&candidate)));
    group.bench_function("unknown", |b| b.iter(|| classify(&unknown)));
    group.finish();
}

criterion_group!(benches, bench_inbound, bench_outbound, bench_classify);
criterion_main!(benches);
