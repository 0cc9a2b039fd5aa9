//! Synthetic workloads behind the CPU- and memory-bound endpoints.
//!
//! # Profiles
//!
//! - **CPU**: [`run_slow`] evaluates [`pattern::SLOW_PATTERN`] against a fixed
//!   sample a configured number of times. The loop is synchronous and has no
//!   yield points, so on the single-threaded runtime it blocks every other
//!   request for its duration.
//! - **Memory**: [`allocate_batch`] builds one fully written batch, which the
//!   `/alloc` handler hands to the [`RetentionBuffer`].

pub mod pattern;
pub mod retention;

pub use retention::RetentionBuffer;

use std::hint::black_box;
use std::time::{Duration, Instant};

use pattern::{SLOW_PATTERN, SLOW_SAMPLE};

/// Size of one allocation chunk: 256 KiB.
pub const CHUNK_SIZE: usize = 256 * 1024;

const BYTES_PER_MIB: f64 = (1024 * 1024) as f64;

/// Tunables for the synthetic workloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadSettings {
    /// Pattern evaluations per `/slow` call.
    pub slow_iterations: u32,
    /// [`CHUNK_SIZE`] chunks per `/alloc` batch.
    pub alloc_chunk_count: usize,
    /// Maximum batches kept by the retention buffer.
    pub max_retained_batches: usize,
}

impl Default for WorkloadSettings {
    /// 500 evaluations, 50 MiB batches, 20 retained batches (~1 GiB steady state).
    fn default() -> Self {
        Self {
            slow_iterations: 500,
            alloc_chunk_count: 200,
            max_retained_batches: 20,
        }
    }
}

impl WorkloadSettings {
    /// Bytes allocated by one `/alloc` call.
    pub fn batch_len(&self) -> usize {
        CHUNK_SIZE * self.alloc_chunk_count
    }

    /// Bytes allocated by one `/alloc` call, in MiB.
    pub fn batch_mib(&self) -> f64 {
        self.batch_len() as f64 / BYTES_PER_MIB
    }
}

/// Outcome of one CPU-bound run.
#[derive(Debug, Clone, Copy)]
pub struct SlowRun {
    /// Evaluations in which the sample matched.
    pub match_count: u32,
    pub elapsed: Duration,
}

/// Evaluate the slow pattern against the fixed sample `iterations` times.
pub fn run_slow(iterations: u32) -> SlowRun {
    let started = Instant::now();
    let mut match_count = 0;
    for _ in 0..iterations {
        if black_box(SLOW_PATTERN.is_match(black_box(SLOW_SAMPLE))) {
            match_count += 1;
        }
    }
    SlowRun {
        match_count,
        elapsed: started.elapsed(),
    }
}

/// Allocate `len` bytes and write `i % 256` into byte `i`.
///
/// Writing every byte forces the pages to be backed by physical memory.
/// Allocation failure aborts the process.
pub fn allocate_batch(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 256) as u8).collect()
}
