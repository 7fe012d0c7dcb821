//! Determinism testing utilities.
//!
//! An invasion must be a pure function of its inputs: the same dominions,
//! order and collaborators always produce the same result. Sources of drift
//! this harness catches:
//!
//! - **Map iteration order**: every per-terrain or per-slot map is a
//!   `BTreeMap` or a fixed array. A `HashMap` sneaking in shows up here.
//! - **Hidden state**: caches or counters that change between calls.
//! - **Thread-dependent behavior**: the parallel check runs the same
//!   invasion on several threads at once.
//!
//! Results are compared through their audit encoding, so anything that
//! reaches the audit log is covered.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use dominion_core::error::Result;
use dominion_core::invasion::InvasionResult;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Audit hash from each run.
    pub hashes: Vec<u64>,
}

impl DeterminismResult {
    fn from_hashes(hashes: Vec<u64>) -> Self {
        Self {
            is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
            hashes,
        }
    }

    /// Get all unique hashes (1 for a deterministic resolver).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            panic!(
                "Invasion resolution is non-deterministic!\n\
                 Runs: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.unique_hashes().len(),
                self.hashes
            );
        }
    }
}

/// Hash of a result's audit encoding.
pub fn result_hash(result: &InvasionResult) -> Result<u64> {
    let bytes = result.to_audit_bytes()?;
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    Ok(hasher.finish())
}

/// Run `resolve` `runs` times in sequence and compare the results.
///
/// # Example
///
/// ```ignore
/// let result = verify_determinism(5, || {
///     world.preview(attacker, defender, &order).map(|r| r.result)
/// })?;
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<F>(runs: usize, mut resolve: F) -> Result<DeterminismResult>
where
    F: FnMut() -> Result<InvasionResult>,
{
    let mut hashes = Vec::with_capacity(runs);
    for _ in 0..runs {
        hashes.push(result_hash(&resolve()?)?);
    }
    Ok(DeterminismResult::from_hashes(hashes))
}

/// Run `resolve` once on each of `threads` threads and compare the results.
///
/// Each call should build its own world so the threads share nothing.
pub fn verify_parallel<F>(threads: usize, resolve: F) -> Result<DeterminismResult>
where
    F: Fn() -> Result<InvasionResult> + Sync,
{
    let hashes = thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| scope.spawn(|| resolve().and_then(|r| result_hash(&r))))
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(hash) => hash,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect::<Result<Vec<u64>>>()
    })?;
    Ok(DeterminismResult::from_hashes(hashes))
}
