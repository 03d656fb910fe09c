//! End-to-end count against a `HashSet` model.

use std::collections::HashSet;
use std::net::Ipv4Addr;

use ipv4_counter::{
    count_source, parse_address_key, BufferedSource, CancelFlag, CountConfig, MalformedPolicy,
};
use proptest::prelude::*;

use crate::short_reads::ShortReader;

// Keys drawn from a small range so duplicates are common.
fn address_lines() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(prop_oneof![0u32..512, any::<u32>()], 0..400)
}

fn render(keys: &[u32], crlf: bool) -> Vec<u8> {
    let mut out = Vec::new();
    for &key in keys {
        out.extend_from_slice(Ipv4Addr::from(key).to_string().as_bytes());
        if crlf {
            out.push(b'\r');
        }
        out.push(b'\n');
    }
    out
}

fn cfg(workers: usize, block_len: usize) -> CountConfig {
    CountConfig {
        workers,
        block_len: Some(block_len),
        max_record_len: 64,
        ..CountConfig::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(crate::test_utils::proptest_cases(24)))]

    #[test]
    fn count_matches_distinct_keys(
        keys in address_lines(),
        workers in 1usize..6,
        block_len in 1usize..128,
        crlf in any::<bool>(),
        plan in prop::collection::vec(1usize..200, 1..4),
    ) {
        let data = render(&keys, crlf);
        let mut source = BufferedSource::new(ShortReader::new(data, plan));
        let report = count_source(&mut source, &cfg(workers, block_len), &CancelFlag::new()).unwrap();

        let expected: HashSet<u32> = keys.iter().copied().collect();
        prop_assert_eq!(report.unique, expected.len() as u64);
        prop_assert_eq!(report.lines, keys.len() as u64);
        prop_assert_eq!(report.malformed, 0);
    }

    #[test]
    fn noisy_lines_count_like_strict_parse(
        lines in prop::collection::vec("[0-9.a]{0,18}", 0..200),
        workers in 1usize..4,
        block_len in 8usize..64,
    ) {
        let mut data = Vec::new();
        for line in &lines {
            data.extend_from_slice(line.as_bytes());
            data.push(b'\n');
        }
        let mut source = BufferedSource::new(ShortReader::new(data, vec![usize::MAX]));
        let mut config = cfg(workers, block_len);
        config.malformed = MalformedPolicy::Skip;
        let report = count_source(&mut source, &config, &CancelFlag::new()).unwrap();

        let parsed: Vec<Option<u32>> = lines.iter().map(|l| parse_address_key(l.as_bytes())).collect();
        let expected: HashSet<u32> = parsed.iter().flatten().copied().collect();
        let malformed = parsed.iter().filter(|k| k.is_none()).count() as u64;
        prop_assert_eq!(report.unique, expected.len() as u64);
        prop_assert_eq!(report.malformed, malformed);
    }
}
