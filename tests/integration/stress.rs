//! Concurrency stress: dense contiguous key ranges written by many workers.
//!
//! Contiguous keys pack 64 addresses into each bitset word, so workers
//! scanning neighbouring chunks constantly update the same words. Any lost
//! update shows up as a short count.

use ipv4_counter::{count_unique_with, CountConfig, IoMode};

use crate::common::{render, temp_file};

const RANGE: u32 = 100_000;

#[test]
fn contiguous_range_repeated_across_chunk_boundaries() {
    // Three passes over the range with different strides, so each key
    // appears in several chunks and chunk edges fall mid-line at different
    // places per pass.
    let mut keys: Vec<u32> = (0..RANGE).collect();
    keys.extend((0..RANGE).rev());
    keys.extend((0..RANGE).step_by(3).chain((1..RANGE).step_by(3)).chain((2..RANGE).step_by(3)));
    let file = temp_file(&render(&keys));

    for io_mode in [IoMode::Buffered, IoMode::Mapped] {
        let cfg = CountConfig {
            workers: 16,
            io_mode,
            block_len: Some(8 * 1024 + 3),
            ..CountConfig::default()
        };
        for run in 0..5 {
            let report = count_unique_with(file.path(), &cfg).unwrap();
            assert_eq!(report.unique, RANGE as u64, "mode={io_mode:?} run={run}");
            assert_eq!(report.lines, keys.len() as u64);
        }
    }
}

#[test]
fn shallow_queue_with_many_workers() {
    let keys: Vec<u32> = (0..RANGE).chain(0..RANGE).collect();
    let file = temp_file(&render(&keys));

    let cfg = CountConfig {
        workers: 16,
        queue_depth: 1,
        block_len: Some(997),
        ..CountConfig::default()
    };
    let report = count_unique_with(file.path(), &cfg).unwrap();
    assert_eq!(report.unique, RANGE as u64);
}
