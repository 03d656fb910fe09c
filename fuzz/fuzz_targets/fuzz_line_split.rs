#![no_main]

use std::io::{self, Read};
use std::ops::ControlFlow;

use libfuzzer_sys::fuzz_target;

use ipv4_counter::{
    BlockPool, BlockPoolConfig, BufferedSource, CancelFlag, CountError, LineSplitter,
};

const MAX_RECORD: usize = 32;

// Serves the payload in reads sized by a cycling plan.
struct PlannedReader<'a> {
    data: &'a [u8],
    plan: &'a [u8],
    step: usize,
}

impl Read for PlannedReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let limit = self.plan[self.step % self.plan.len()].max(1) as usize;
        self.step += 1;
        let n = limit.min(buf.len()).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

// Byte layout:
// - Byte 0 → block length (1..=256)
// - Byte 1 → read plan length `k` (1..=8)
// - Next `k` bytes → per-read size limits
// - Rest → input stream
//
// Checks that chunks reassemble the input, every chunk but the last ends
// with `\n`, offsets are contiguous, and a too-long record is the only
// possible failure.
fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }
    let block_len = data[0] as usize + 1;
    let plan_len = (data[1] as usize % 8) + 1;
    if data.len() < 2 + plan_len {
        return;
    }
    let plan = &data[2..2 + plan_len];
    let input = &data[2 + plan_len..];

    let mut splitter = LineSplitter::new(block_len, MAX_RECORD);
    let pool = BlockPool::new(BlockPoolConfig {
        buffer_len: splitter.buffer_len(),
        total_buffers: 1,
    })
    .unwrap();
    let mut source = BufferedSource::new(PlannedReader {
        data: input,
        plan,
        step: 0,
    });

    let mut joined = Vec::with_capacity(input.len());
    let mut ends_ok = true;
    let mut pending_unterminated = false;
    let result = splitter.run(&mut source, &pool, &CancelFlag::new(), |chunk| {
        assert_eq!(chunk.offset(), joined.len() as u64, "offset gap");
        assert!(!chunk.is_empty(), "empty chunk");
        if pending_unterminated {
            ends_ok = false;
        }
        pending_unterminated = chunk.data().last() != Some(&b'\n');
        joined.extend_from_slice(chunk.data());
        ControlFlow::Continue(())
    });

    match result {
        Ok(stats) => {
            assert_eq!(joined, input, "chunks do not reassemble input");
            assert_eq!(stats.bytes, input.len() as u64);
            assert!(ends_ok, "unterminated chunk before the last one");
        }
        Err(CountError::RecordTooLarge { len, max, .. }) => {
            assert!(len > max);
            assert!(input.starts_with(&joined));
        }
        Err(other) => panic!("unexpected error: {other}"),
    }
});
