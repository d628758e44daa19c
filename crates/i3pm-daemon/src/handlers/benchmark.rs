//! Matcher latency benchmarking, used by `i3pm benchmark environ` to verify
//! the `/proc` read stays cheap enough for the hot path.

use i3pm_core::matcher::environment::benchmark_environ_reads;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{require_params, HandlerContext};
use crate::error::Result;

#[derive(Deserialize)]
struct EnvironParams {
    #[serde(default = "default_samples")]
    samples: usize,
}

fn default_samples() -> usize {
    100
}

pub async fn environ(_ctx: &HandlerContext, params: Option<Value>) -> Result<Value> {
    let samples = params.map(require_params::<EnvironParams>).transpose()?.map_or(100, |p| p.samples);
    let pid = std::process::id() as i32;
    let stats = benchmark_environ_reads(pid, samples);

    Ok(json!({
        "sample_size": stats.sample_size,
        "average_ms": stats.average_ms,
        "p50_ms": stats.p50_ms,
        "p95_ms": stats.p95_ms,
        "p99_ms": stats.p99_ms,
        "min_ms": stats.min_ms,
        "max_ms": stats.max_ms,
        "passes": stats.passes(),
    }))
}
