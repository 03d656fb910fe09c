//! End-to-end tests for ipv4-counter over real files.
//!
//! Run with: `cargo test --test integration`

mod common;
mod count_unique;
mod edge_inputs;
mod stress;
