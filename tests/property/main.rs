//! Property tests for the splitter and the end-to-end count.
//!
//! Case counts stay small locally; CI runs the full defaults and
//! `PROPTEST_CASES` overrides both.

#[path = "../../src/test_utils.rs"]
mod test_utils;

mod count;
mod short_reads;
