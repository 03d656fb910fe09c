//! IPv4 unique counter CLI
//!
//! Counts distinct IPv4 addresses in a file with one dotted quad per line,
//! using a sequential splitter and N parallel workers.
//!
//! # Output Format
//!
//! The count is written to stdout as: `Count: <N>`
//!
//! Statistics are written to stderr upon completion:
//! `lines=N chunks=N bytes=N malformed=N elapsed_ms=N throughput_mib_s=N workers=N`
//!
//! Diagnostics go through `tracing`; set `RUST_LOG=info` (or `debug` for
//! per-worker summaries) to see them.
//!
//! # Exit Codes
//!
//! - `0`: Success
//! - `1`: Counting failed (I/O error, oversized record, ...)
//! - `2`: Invalid arguments

use ipv4_counter::{count_unique_with, CountConfig, IoMode, MalformedPolicy};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn print_usage(exe: &std::ffi::OsStr) {
    eprintln!(
        "usage: {} [OPTIONS] <path>

OPTIONS:
    --workers=<N>           Number of parallel workers (default: auto-detect CPU count)
    --buffer-mib=<N>        Read block size in MiB for buffered reads (default: 4)
    --queue-depth=<N>       Chunks buffered between reader and workers (default: workers)
    --max-record=<N>        Longest accepted line in bytes (default: 4096)
    --mmap                  Memory-map the input instead of buffered reads
    --fold                  Fold lines without validation instead of skipping malformed ones
    --help, -h              Show this help message",
        exe.to_string_lossy()
    );
}

fn parse_num(flag: &str, value: &str, min: usize) -> usize {
    match value.parse::<usize>() {
        Ok(n) if n >= min => n,
        Ok(_) => {
            eprintln!("{flag} must be >= {min}");
            std::process::exit(2);
        }
        Err(_) => {
            eprintln!("invalid {flag} value: {value}");
            std::process::exit(2);
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args_os();
    let exe = args.next().unwrap_or_else(|| "ipv4-counter".into());
    let mut path: Option<PathBuf> = None;
    let mut cfg = CountConfig::default();

    for arg in args {
        if let Some(flag) = arg.to_str() {
            if let Some(value) = flag.strip_prefix("--workers=") {
                cfg.workers = parse_num("--workers", value, 1);
                continue;
            }
            if let Some(value) = flag.strip_prefix("--buffer-mib=") {
                cfg.buffer_mib = parse_num("--buffer-mib", value, 1);
                continue;
            }
            if let Some(value) = flag.strip_prefix("--queue-depth=") {
                cfg.queue_depth = parse_num("--queue-depth", value, 1);
                continue;
            }
            if let Some(value) = flag.strip_prefix("--max-record=") {
                cfg.max_record_len = parse_num("--max-record", value, 1);
                continue;
            }
            match flag {
                "--mmap" => {
                    cfg.io_mode = IoMode::Mapped;
                    continue;
                }
                "--fold" => {
                    cfg.malformed = MalformedPolicy::Fold;
                    continue;
                }
                "--help" | "-h" => {
                    print_usage(&exe);
                    return ExitCode::SUCCESS;
                }
                _ if flag.starts_with("--") => {
                    eprintln!("unknown flag: {}", flag);
                    print_usage(&exe);
                    return ExitCode::from(2);
                }
                _ => {}
            }
        }

        if path.is_some() {
            print_usage(&exe);
            return ExitCode::from(2);
        }
        path = Some(PathBuf::from(arg));
    }

    let Some(path) = path else {
        eprintln!("you need to specify input file path");
        print_usage(&exe);
        return ExitCode::from(2);
    };

    let report = match count_unique_with(&path, &cfg) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("failed to count from file: {err}");
            return ExitCode::FAILURE;
        }
    };

    println!("Count: {}", report.unique);
    eprintln!(
        "lines={} chunks={} bytes={} malformed={} elapsed_ms={} throughput_mib_s={:.2} workers={}",
        report.lines,
        report.chunks,
        report.bytes,
        report.malformed,
        report.elapsed.as_millis(),
        report.throughput_mib_s(),
        report.workers
    );

    ExitCode::SUCCESS
}
