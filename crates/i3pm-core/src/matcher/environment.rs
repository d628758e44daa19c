//! Tier 1 matching: reading `I3PM_*` variables from `/proc/<pid>/environ`,
//! walking up the parent-process chain when the leaf process itself wasn't
//! launched directly by the launcher (e.g. a GUI app whose real window
//! belongs to a forked renderer process).

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use tracing::trace;

/// How many parent-process hops to follow looking for `I3PM_*` vars before
/// giving up. Resolved from four levels of real-world nesting (launcher ->
/// shell wrapper -> app -> renderer) observed in Electron/Chromium apps.
pub const MAX_PARENT_TRAVERSAL: u32 = 4;

/// Reads and parses `/proc/<pid>/environ` into a key-value map.
///
/// Returns `None` if the process is gone or unreadable (already exited, or
/// we lack permission) — both are expected races, not errors.
#[must_use]
pub fn read_environ(pid: i32) -> Option<HashMap<String, String>> {
    let content = std::fs::read(format!("/proc/{pid}/environ")).ok()?;
    Some(parse_environ(&content))
}

fn parse_environ(content: &[u8]) -> HashMap<String, String> {
    content
        .split(|&b| b == 0)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let text = String::from_utf8_lossy(entry);
            let (key, value) = text.split_once('=')?;
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

/// Reads a single `I3PM_APP_NAME` value from a pid's environ, if present.
#[must_use]
pub fn read_app_name_from_environ(pid: i32) -> Option<String> {
    read_environ(pid)?.get("I3PM_APP_NAME").cloned()
}

/// Reads the parent pid of `pid` from `/proc/<pid>/stat`.
///
/// The `stat` file's second field (comm) is parenthesized and may itself
/// contain spaces/parens, so we locate the closing paren from the end
/// before splitting the remaining whitespace-delimited fields.
#[must_use]
pub fn read_ppid(pid: i32) -> Option<i32> {
    let content = std::fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
    let after_comm = content.rfind(')')?;
    let rest = content.get(after_comm + 2..)?;
    rest.split_whitespace().nth(1)?.parse().ok()
}

/// Walks up the parent chain (up to [`MAX_PARENT_TRAVERSAL`] hops) looking
/// for `I3PM_*` environment variables, returning the first full environ map
/// found along with how many hops it took.
#[must_use]
pub fn find_i3pm_environ_in_ancestry(pid: i32) -> Option<(HashMap<String, String>, u32)> {
    let mut current = pid;
    for depth in 0..=MAX_PARENT_TRAVERSAL {
        if let Some(environ) = read_environ(current) {
            if environ.keys().any(|k| k.starts_with("I3PM_")) {
                trace!(pid = current, depth, "found I3PM_* vars in ancestry");
                return Some((environ, depth));
            }
        }
        current = read_ppid(current)?;
        if current <= 1 {
            break;
        }
    }
    None
}

/// Walks up the parent chain (up to [`MAX_PARENT_TRAVERSAL`] hops) checking
/// whether `target` is `pid` itself or one of its ancestors. Used by the
/// launch registry's Tier 0 scoring to award a pid-chain bonus when a
/// window's process descends from the process that launched it.
#[must_use]
pub fn pid_chain_contains(pid: i32, target: i32) -> bool {
    let mut current = pid;
    for _ in 0..=MAX_PARENT_TRAVERSAL {
        if current == target {
            return true;
        }
        let Some(parent) = read_ppid(current) else { return false };
        if parent <= 1 {
            return false;
        }
        current = parent;
    }
    false
}

/// Walks the compositor tree's leaf windows and returns the set of
/// `I3PM_APP_NAME` values among their (or their ancestors') processes.
///
/// `leaf_pids` is the compositor-reported pid for each visible window,
/// typically gathered from a `get_tree` response.
#[must_use]
pub fn detect_running_apps(leaf_pids: &[i32]) -> HashSet<String> {
    leaf_pids
        .iter()
        .filter_map(|&pid| find_i3pm_environ_in_ancestry(pid))
        .filter_map(|(environ, _depth)| environ.get("I3PM_APP_NAME").cloned())
        .collect()
}

/// Timing stats for a batch of environ reads, used by the `benchmark environ`
/// CLI command to validate the matcher stays fast enough for the hot path.
#[derive(Debug, Clone, Copy)]
pub struct LatencyStats {
    pub sample_size: usize,
    pub average_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl LatencyStats {
    /// Pass criteria used by `i3pm benchmark environ`: the matcher's
    /// `/proc` read must stay well under one compositor frame on average.
    #[must_use]
    pub fn passes(&self) -> bool {
        self.average_ms < 1.0 && self.p95_ms < 10.0
    }
}

/// Runs `samples` environ reads against `pid` (typically the benchmarking
/// process's own pid, which is always readable) and computes latency stats.
#[must_use]
pub fn benchmark_environ_reads(pid: i32, samples: usize) -> LatencyStats {
    let mut durations_ms: Vec<f64> = Vec::with_capacity(samples);
    for _ in 0..samples {
        let start = Instant::now();
        let _ = read_environ(pid);
        durations_ms.push(start.elapsed().as_secs_f64() * 1000.0);
    }
    durations_ms.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let sum: f64 = durations_ms.iter().sum();
    let n = durations_ms.len().max(1);
    let percentile = |p: f64| durations_ms[((n - 1) as f64 * p).round() as usize];

    LatencyStats {
        sample_size: durations_ms.len(),
        average_ms: sum / n as f64,
        p50_ms: percentile(0.50),
        p95_ms: percentile(0.95),
        p99_ms: percentile(0.99),
        min_ms: durations_ms.first().copied().unwrap_or(0.0),
        max_ms: durations_ms.last().copied().unwrap_or(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_environ_splits_nul_terminated_pairs() {
        let raw = b"PATH=/usr/bin\0I3PM_APP_NAME=vscode\0HOME=/home/user\0";
        let parsed = parse_environ(raw);
        assert_eq!(parsed.get("I3PM_APP_NAME"), Some(&"vscode".to_string()));
        assert_eq!(parsed.get("PATH"), Some(&"/usr/bin".to_string()));
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn parse_environ_ignores_malformed_entries() {
        let raw = b"NOVALUE\0KEY=value\0";
        let parsed = parse_environ(raw);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.get("KEY"), Some(&"value".to_string()));
    }

    #[test]
    fn read_environ_of_own_process_succeeds() {
        let pid = std::process::id() as i32;
        let environ = read_environ(pid);
        assert!(environ.is_some());
    }

    #[test]
    fn read_environ_of_nonexistent_pid_returns_none() {
        assert!(read_environ(i32::MAX - 1).is_none());
    }

    #[test]
    fn read_ppid_of_own_process_succeeds() {
        let pid = std::process::id() as i32;
        assert!(read_ppid(pid).is_some());
    }

    #[test]
    fn pid_chain_contains_matches_self() {
        let pid = std::process::id() as i32;
        assert!(pid_chain_contains(pid, pid));
    }

    #[test]
    fn pid_chain_contains_finds_parent() {
        let pid = std::process::id() as i32;
        let Some(ppid) = read_ppid(pid) else { return };
        assert!(pid_chain_contains(pid, ppid));
    }

    #[test]
    fn benchmark_environ_reads_produces_non_negative_stats() {
        let pid = std::process::id() as i32;
        let stats = benchmark_environ_reads(pid, 20);
        assert_eq!(stats.sample_size, 20);
        assert!(stats.average_ms >= 0.0);
        assert!(stats.p95_ms >= stats.p50_ms);
    }
}
