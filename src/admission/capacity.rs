//! Startup resource sizing for the sandbox pool.
//!
//! Computed once at service construction from host CPU cores, available
//! memory, and the configured per-sandbox memory budget. Never recomputed per
//! request.

use std::fs;

/// Default per-sandbox memory budget used when the configured limit string
/// cannot be parsed.
pub const DEFAULT_MEMORY_LIMIT_BYTES: u64 = 128 * 1024 * 1024;

/// Assumed available memory when `/proc/meminfo` is unreadable.
const FALLBACK_AVAILABLE_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// How the concurrency budget was derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapacityPlan {
    /// Host logical cores observed at startup
    pub cores: usize,
    /// Cap derived from CPU cores
    pub by_cpu: usize,
    /// Cap derived from available memory / per-sandbox budget
    pub by_memory: usize,
    /// Configured hard ceiling
    pub ceiling: usize,
    /// Final permit count, always >= 1
    pub permits: usize,
}

/// Size the sandbox pool from host resources.
///
/// `permits = min(max(1, cores/2), max(1, available/per_sandbox), ceiling)`.
pub fn plan_capacity(per_sandbox_bytes: u64, ceiling: usize) -> CapacityPlan {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let available = available_memory_bytes().unwrap_or_else(|| {
        log::warn!(
            "could not read available memory from /proc/meminfo, assuming {} bytes",
            FALLBACK_AVAILABLE_BYTES
        );
        FALLBACK_AVAILABLE_BYTES
    });
    plan_capacity_from(cores, available, per_sandbox_bytes, ceiling)
}

pub(crate) fn plan_capacity_from(
    cores: usize,
    available_bytes: u64,
    per_sandbox_bytes: u64,
    ceiling: usize,
) -> CapacityPlan {
    let per_sandbox = per_sandbox_bytes.max(1);
    let by_cpu = (cores / 2).max(1);
    let by_memory = ((available_bytes / per_sandbox) as usize).max(1);
    let ceiling = ceiling.max(1);
    let permits = by_cpu.min(by_memory).min(ceiling);

    CapacityPlan {
        cores,
        by_cpu,
        by_memory,
        ceiling,
        permits,
    }
}

/// Parse a runtime-notation memory limit ("128m", "1g", "512k", plain bytes).
///
/// Unparseable input falls back to [`DEFAULT_MEMORY_LIMIT_BYTES`] rather than
/// failing startup.
pub fn parse_memory_limit(limit: &str) -> u64 {
    let trimmed = limit.trim().to_ascii_lowercase();
    if trimmed.is_empty() {
        return DEFAULT_MEMORY_LIMIT_BYTES;
    }

    let (digits, multiplier) = match trimmed.as_bytes()[trimmed.len() - 1] {
        b'k' => (&trimmed[..trimmed.len() - 1], 1024u64),
        b'm' => (&trimmed[..trimmed.len() - 1], 1024 * 1024),
        b'g' => (&trimmed[..trimmed.len() - 1], 1024 * 1024 * 1024),
        _ => (trimmed.as_str(), 1),
    };

    match digits.parse::<u64>() {
        Ok(value) => value.saturating_mul(multiplier),
        Err(_) => {
            log::warn!(
                "invalid memory limit format '{}', using default 128MB",
                limit
            );
            DEFAULT_MEMORY_LIMIT_BYTES
        }
    }
}

/// Read `MemAvailable` from `/proc/meminfo` (kilobytes on the wire).
fn available_memory_bytes() -> Option<u64> {
    let text = fs::read_to_string("/proc/meminfo").ok()?;
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("MemAvailable:") {
            let kb = rest
                .split_whitespace()
                .next()
                .and_then(|v| v.parse::<u64>().ok())?;
            return Some(kb * 1024);
        }
    }
    None
}
