//! Shared fixtures: deterministic address generation and temp files.

use std::io::Write;
use std::net::Ipv4Addr;

use tempfile::NamedTempFile;

// Simple xorshift for reproducible shuffles and duplicates.
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

/// Renders keys as newline-terminated dotted quads.
pub fn render(keys: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(keys.len() * 16);
    for &key in keys {
        writeln!(out, "{}", Ipv4Addr::from(key)).unwrap();
    }
    out
}

/// `distinct` random keys, each repeated between 1 and `max_repeat` times,
/// in shuffled order.
pub fn keys_with_duplicates(distinct: usize, max_repeat: u64, seed: u64) -> Vec<u32> {
    let mut rng = XorShift64::new(seed);
    let mut unique = std::collections::HashSet::with_capacity(distinct);
    while unique.len() < distinct {
        unique.insert(rng.next_u64() as u32);
    }

    let mut keys = Vec::new();
    for key in unique {
        let repeats = 1 + rng.next_u64() % max_repeat;
        for _ in 0..repeats {
            keys.push(key);
        }
    }
    // Fisher-Yates so duplicates land in different chunks.
    for i in (1..keys.len()).rev() {
        let j = (rng.next_u64() % (i as u64 + 1)) as usize;
        keys.swap(i, j);
    }
    keys
}

pub fn temp_file(content: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content).unwrap();
    file.flush().unwrap();
    file
}
