use std::sync::Arc;
use std::time::{Duration, Instant};

use sqlx::PgPool;

use crate::metrics::Registry;

const TICK: Duration = Duration::from_secs(10);

// ─── Memory monitor ──────────────────────────────────────────────

/// Periodically samples process memory and feeds the gauges the
/// scrape endpoint exposes:
///
///   app_memory_usage_bytes{type="rss"|"vsize"}
///   app_uptime_seconds
pub async fn monitor_memory(metrics: Arc<Registry>) {
    let started = Instant::now();
    let mut interval = tokio::time::interval(TICK);
    let mut iteration = 0u64;

    loop {
        interval.tick().await;
        iteration += 1;

        if let Some((rss, vsize)) = read_process_memory() {
            metrics.set_gauge("app_memory_usage_bytes", rss as f64, &[("type", "rss")]);
            metrics.set_gauge("app_memory_usage_bytes", vsize as f64, &[("type", "vsize")]);

            tracing::info!(
                iteration,
                rss_mb = rss as f64 / 1024.0 / 1024.0,
                vsize_mb = vsize as f64 / 1024.0 / 1024.0,
                "memory check"
            );
        }

        metrics.set_gauge("app_uptime_seconds", started.elapsed().as_secs_f64(), &[]);
    }
}

/// `(rss_bytes, vsize_bytes)` from /proc/self/status; None off Linux.
/// VmRSS/VmSize are reported in kB, so no page-size assumption is
/// needed.
fn read_process_memory() -> Option<(u64, u64)> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_proc_status(&status)
}

fn parse_proc_status(status: &str) -> Option<(u64, u64)> {
    let mut rss = None;
    let mut vsize = None;
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            rss = parse_kb_field(rest);
        } else if let Some(rest) = line.strip_prefix("VmSize:") {
            vsize = parse_kb_field(rest);
        }
    }
    Some((rss?, vsize?))
}

/// `"  123456 kB"` → bytes.
fn parse_kb_field(field: &str) -> Option<u64> {
    let kb: u64 = field.trim().strip_suffix("kB")?.trim().parse().ok()?;
    Some(kb * 1024)
}

// ─── Pool keeper ─────────────────────────────────────────────────

/// Keeps an eye on the shared Postgres pool, mirroring its occupancy
/// into `pg_pool_connections{state="size"|"idle"}`.
pub async fn keep_pool_alive(pool: PgPool, metrics: Arc<Registry>) {
    let mut interval = tokio::time::interval(TICK);
    let mut iteration = 0u64;

    loop {
        interval.tick().await;
        iteration += 1;

        let size = pool.size();
        let idle = pool.num_idle();

        metrics.set_gauge("pg_pool_connections", f64::from(size), &[("state", "size")]);
        metrics.set_gauge("pg_pool_connections", idle as f64, &[("state", "idle")]);

        tracing::info!(iteration, size, idle, "postgres pool check");
    }
}

// ─── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vmrss_and_vmsize_in_kilobytes() {
        let status = "\
Name:\tuser-kv-api
VmPeak:\t  201000 kB
VmSize:\t  200000 kB
VmRSS:\t   50000 kB
Threads:\t9
";
        let (rss, vsize) = parse_proc_status(status).unwrap();
        assert_eq!(rss, 50_000 * 1024);
        assert_eq!(vsize, 200_000 * 1024);
    }

    #[test]
    fn missing_fields_yield_none() {
        assert!(parse_proc_status("Name:\tx\nThreads:\t4\n").is_none());
        assert!(parse_proc_status("VmRSS:\t 10 kB\n").is_none());
    }

    #[test]
    fn malformed_kb_field_yields_none() {
        assert_eq!(parse_kb_field("  1234 kB"), Some(1234 * 1024));
        assert_eq!(parse_kb_field("garbage"), None);
        assert_eq!(parse_kb_field("12 MB"), None);
    }
}
