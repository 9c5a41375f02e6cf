//! Compare LRU and Clock on a skewed pin/unpin workload.
//!
//! Run with `cargo bench --bench replacement_policies`.

use std::sync::Arc;

use bufferdb::{
    Block, BufferPoolConfig, BufferPoolManager, FileManager, LogManager, Page,
    ReplacementPolicyKind, TxnId,
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

const POOL_SIZE: usize = 16;
const BLOCKS: u32 = 64;
const OPS: usize = 512;

/// Block numbers where a quarter of the blocks take most of the traffic.
fn skewed_trace() -> Vec<u32> {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    (0..OPS)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            if state % 10 < 8 {
                (state >> 8) as u32 % (BLOCKS / 4)
            } else {
                (state >> 8) as u32 % BLOCKS
            }
        })
        .collect()
}

fn bench_policies(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let files = Arc::new(FileManager::open(dir.path()).unwrap());
    let blocks: Vec<Block> = (0..BLOCKS)
        .map(|_| files.append("bench.tbl", &Page::new()).unwrap())
        .collect();
    let trace = skewed_trace();

    let mut group = c.benchmark_group("skewed_pins");
    for policy in [ReplacementPolicyKind::Lru, ReplacementPolicyKind::Clock] {
        let log = Arc::new(LogManager::open(dir.path().join(format!("{:?}.log", policy))).unwrap());
        let bpm = BufferPoolManager::new(
            BufferPoolConfig::new(POOL_SIZE, policy),
            Arc::clone(&files),
            log,
        )
        .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(bpm.policy_name()), &trace, |b, trace| {
            b.iter(|| {
                for (i, &n) in trace.iter().enumerate() {
                    let buffer = bpm.pin(&blocks[n as usize]).unwrap().unwrap();
                    // Every eighth access dirties the page.
                    if i % 8 == 0 {
                        buffer.set_int(0, i as i32, TxnId::new(1), None).unwrap();
                    }
                    bpm.unpin(&buffer);
                }
            })
        });

        println!("{}: {}", bpm.policy_name(), bpm.stats().snapshot());
    }
    group.finish();
}

criterion_group!(benches, bench_policies);
criterion_main!(benches);
