// src/utils/memory.rs

/// Resident set size of this process in kilobytes, if the platform exposes it.
pub fn resident_memory_kb() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_vm_rss(&status)
}

fn parse_vm_rss(status: &str) -> Option<u64> {
    status
        .lines()
        .find(|line| line.starts_with("VmRSS:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kb| kb.parse().ok())
}

/// Logs the current memory usage. Called before each batch and once at the end of a run.
pub fn log_memory_usage() {
    match resident_memory_kb() {
        Some(kb) => tracing::info!("Memory usage: {:.2} MB", kb as f64 / 1024.0),
        None => tracing::debug!("Memory usage unavailable on this platform"),
    }
}
