//! Dedup correctness across worker counts, sources and block sizes.

use ipv4_counter::{count_unique, count_unique_with, CountConfig, IoMode};

use crate::common::{keys_with_duplicates, render, temp_file};

const DISTINCT: usize = 20_000;

#[test]
fn exact_count_for_every_worker_count_and_source() {
    let keys = keys_with_duplicates(DISTINCT, 4, 0x5eed);
    let file = temp_file(&render(&keys));

    for use_mmap in [false, true] {
        for workers in [1, 2, 8, 64] {
            let count = count_unique(file.path(), workers, 1, use_mmap).unwrap();
            assert_eq!(
                count, DISTINCT as u64,
                "workers={workers} mmap={use_mmap}"
            );
        }
    }
}

#[test]
fn small_blocks_cross_many_line_boundaries() {
    let keys = keys_with_duplicates(5_000, 3, 42);
    let data = render(&keys);
    let file = temp_file(&data);

    // Block sizes below, at and just above a typical line length.
    for block_len in [1, 7, 8, 15, 16, 17, 4096] {
        for io_mode in [IoMode::Buffered, IoMode::Mapped] {
            let cfg = CountConfig {
                workers: 4,
                io_mode,
                block_len: Some(block_len),
                ..CountConfig::default()
            };
            let report = count_unique_with(file.path(), &cfg).unwrap();
            assert_eq!(report.unique, 5_000, "block_len={block_len} mode={io_mode:?}");
            assert_eq!(report.lines, keys.len() as u64);
            assert_eq!(report.bytes, data.len() as u64);
            assert_eq!(report.malformed, 0);
        }
    }
}

#[test]
fn rerun_on_same_file_is_idempotent() {
    let keys = keys_with_duplicates(3_000, 5, 7);
    let file = temp_file(&render(&keys));

    let first = count_unique(file.path(), 4, 1, false).unwrap();
    let second = count_unique(file.path(), 4, 1, false).unwrap();
    let mapped = count_unique(file.path(), 4, 1, true).unwrap();
    assert_eq!(first, 3_000);
    assert_eq!(first, second);
    assert_eq!(first, mapped);
}

#[test]
fn separate_files_do_not_contaminate_each_other() {
    let a = temp_file(&render(&[1, 2, 3]));
    let b = temp_file(&render(&[4, 5]));
    assert_eq!(count_unique(a.path(), 2, 1, false).unwrap(), 3);
    assert_eq!(count_unique(b.path(), 2, 1, false).unwrap(), 2);
}

#[test]
fn key_space_extremes_are_counted() {
    let file = temp_file(b"0.0.0.0\n255.255.255.255\n127.255.255.255\n128.0.0.0\n0.0.0.0\n");
    assert_eq!(count_unique(file.path(), 3, 1, false).unwrap(), 4);
}
