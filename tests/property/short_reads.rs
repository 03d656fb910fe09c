use std::io::{self, Read};

/// Reader that serves at most `plan[i]` bytes per call, cycling the plan.
///
/// Short reads are legal for any `Read`; this forces the splitter through
/// every partial-block path.
pub struct ShortReader {
    data: Vec<u8>,
    pos: usize,
    plan: Vec<usize>,
    step: usize,
}

impl ShortReader {
    pub fn new(data: Vec<u8>, plan: Vec<usize>) -> Self {
        assert!(plan.iter().all(|&n| n > 0), "read plan must be positive");
        Self {
            data,
            pos: 0,
            plan,
            step: 0,
        }
    }
}

impl Read for ShortReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let limit = self.plan[self.step % self.plan.len()];
        self.step += 1;
        let n = limit.min(buf.len()).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
