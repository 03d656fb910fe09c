//! Empty files, missing terminators, CRLF, malformed lines and failures.

use ipv4_counter::{count_unique, count_unique_with, CountConfig, CountError, MalformedPolicy};

use crate::common::{render, temp_file};

#[test]
fn empty_file_counts_zero() {
    let file = temp_file(b"");
    for use_mmap in [false, true] {
        assert_eq!(count_unique(file.path(), 4, 1, use_mmap).unwrap(), 0);
    }
}

#[test]
fn single_line_without_terminator_counts_one() {
    let file = temp_file(b"192.168.0.1");
    for use_mmap in [false, true] {
        assert_eq!(count_unique(file.path(), 4, 1, use_mmap).unwrap(), 1);
    }
}

#[test]
fn trailing_line_without_terminator_is_not_lost() {
    let file = temp_file(b"10.0.0.1\n10.0.0.2\n10.0.0.3");
    let cfg = CountConfig {
        workers: 2,
        block_len: Some(5),
        ..CountConfig::default()
    };
    assert_eq!(count_unique_with(file.path(), &cfg).unwrap().unique, 3);
}

#[test]
fn crlf_lines_are_accepted() {
    let file = temp_file(b"1.1.1.1\r\n2.2.2.2\r\n1.1.1.1\r\n");
    assert_eq!(count_unique(file.path(), 2, 1, false).unwrap(), 2);
}

#[test]
fn malformed_lines_are_skipped_by_default() {
    let file = temp_file(b"1.1.1.1\n\nhello\n1.1.1\n999.1.1.1\n2.2.2.2\n");
    let cfg = CountConfig {
        workers: 2,
        ..CountConfig::default()
    };
    let report = count_unique_with(file.path(), &cfg).unwrap();
    assert_eq!(report.unique, 2);
    assert_eq!(report.lines, 2);
    assert_eq!(report.malformed, 4);
}

#[test]
fn fold_policy_keeps_unvalidated_behaviour() {
    // Without validation "0.0.0.256" and "0.0.1.0" collide on key 256.
    let file = temp_file(b"0.0.0.256\n0.0.1.0\n");
    let cfg = CountConfig {
        workers: 1,
        malformed: MalformedPolicy::Fold,
        ..CountConfig::default()
    };
    assert_eq!(count_unique_with(file.path(), &cfg).unwrap().unique, 1);
}

#[test]
fn missing_file_returns_error_not_count() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.txt");
    for use_mmap in [false, true] {
        match count_unique(&missing, 2, 1, use_mmap) {
            Err(err @ CountError::Open { .. }) => assert!(err.is_io()),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(count) => panic!("expected an error, got count {count}"),
        }
    }
}

#[test]
fn line_longer_than_record_cap_is_fatal() {
    let mut data = b"1.1.1.1\n".to_vec();
    data.extend(std::iter::repeat(b'9').take(10_000));
    data.push(b'\n');
    let file = temp_file(&data);

    let cfg = CountConfig {
        workers: 2,
        block_len: Some(1024),
        max_record_len: 256,
        ..CountConfig::default()
    };
    match count_unique_with(file.path(), &cfg) {
        Err(CountError::RecordTooLarge { offset, max, .. }) => {
            assert_eq!(offset, 8);
            assert_eq!(max, 256);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(report) => panic!("expected an error, got {report:?}"),
    }
}

#[test]
fn over_long_line_fails_regardless_of_workers_and_source() {
    // ~200 KB of valid lines with one 5000-byte junk line just before the
    // midpoint, so some block layouts carry it and others contain it whole.
    let keys: Vec<u32> = (0..20_000).collect();
    let valid = render(&keys);
    let mid = valid.len() / 2;
    let split_at = valid[..mid - 4_500]
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1);

    let mut data = valid[..split_at].to_vec();
    data.extend(std::iter::repeat(b'z').take(5_000));
    data.push(b'\n');
    data.extend_from_slice(&valid[split_at..]);
    let file = temp_file(&data);

    for use_mmap in [false, true] {
        for workers in [1, 2, 3, 8] {
            match count_unique(file.path(), workers, 1, use_mmap) {
                Err(CountError::RecordTooLarge { offset, len, max }) => {
                    assert_eq!(offset, split_at as u64, "workers={workers} mmap={use_mmap}");
                    assert_eq!(max, 4096);
                    assert!(len > max);
                }
                Err(other) => panic!("workers={workers} mmap={use_mmap}: unexpected error: {other}"),
                Ok(count) => panic!("workers={workers} mmap={use_mmap}: expected an error, got {count}"),
            }
        }
    }
}
