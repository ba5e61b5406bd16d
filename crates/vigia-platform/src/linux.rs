//! Linux process-table sampling via the /proc filesystem.
//!
//! For each numeric `/proc` entry:
//! - `/proc/{pid}/stat` - name, state, CPU times, start time
//! - `/proc/{pid}/statm` - resident memory pages
//! - `/proc/stat` (`btime`) - boot time, the base for start timestamps
//!
//! A process that exits between enumeration and the counter reads is
//! skipped; the rest of the table is still returned.

use std::fs;
use std::time::{Duration, SystemTime};

use vigia_core::{EngineError, ProcessSample, ProcessState, Sampler};

use crate::error::{PlatformError, Result};

/// Whole-table sampler backed by the /proc filesystem.
///
/// Caches kernel constants (page size, clock tick rate, boot time) at
/// construction; the per-tick work is pure file reads.
#[derive(Debug)]
pub struct ProcSampler {
    page_size: u64,
    clock_ticks: f64,
    boot_time_secs: u64,
}

impl ProcSampler {
    /// Creates a sampler, reading kernel constants once.
    #[must_use]
    pub fn new() -> Self {
        Self {
            page_size: page_size(),
            clock_ticks: clock_ticks(),
            boot_time_secs: read_boot_time().unwrap_or(0),
        }
    }

    /// Reads one process. `None` means the process vanished or its record
    /// was unreadable; the caller skips it.
    fn read_process(&self, pid: u32) -> Option<ProcessSample> {
        let stat_content = fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
        let stat = match parse_stat_content(&stat_content) {
            Ok(stat) => stat,
            Err(e) => {
                tracing::trace!(pid, error = %e, "skipping unparsable stat record");
                return None;
            }
        };

        let memory_bytes = self.read_rss_bytes(pid)?;

        let cpu_seconds = (stat.utime_ticks + stat.stime_ticks) as f64 / self.clock_ticks;
        let start_secs = self.boot_time_secs as f64 + stat.starttime_ticks as f64 / self.clock_ticks;

        Some(ProcessSample {
            pid,
            name: stat.name,
            cpu_time: Duration::from_secs_f64(cpu_seconds),
            memory_bytes,
            start_time: SystemTime::UNIX_EPOCH + Duration::from_secs_f64(start_secs),
            state: stat.state,
        })
    }

    /// Resident memory from `/proc/{pid}/statm` (resident pages × page
    /// size). `None` when the process vanished between reads.
    fn read_rss_bytes(&self, pid: u32) -> Option<u64> {
        let content = fs::read_to_string(format!("/proc/{pid}/statm")).ok()?;
        let rss_pages: u64 = content.split_whitespace().nth(1)?.parse().ok()?;
        Some(rss_pages * self.page_size)
    }
}

impl Default for ProcSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for ProcSampler {
    fn collect(&mut self) -> vigia_core::Result<Vec<ProcessSample>> {
        let entries = fs::read_dir("/proc")
            .map_err(|e| EngineError::sampler(format!("cannot enumerate /proc: {e}")))?;

        let mut samples = Vec::new();
        for entry in entries.flatten() {
            let Some(pid) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<u32>().ok())
            else {
                continue;
            };
            match self.read_process(pid) {
                Some(sample) => samples.push(sample),
                None => tracing::trace!(pid, "process vanished mid-enumeration, skipped"),
            }
        }
        Ok(samples)
    }
}

/// Parsed fields of `/proc/{pid}/stat`.
#[derive(Debug)]
struct StatRecord {
    name: String,
    state: ProcessState,
    utime_ticks: u64,
    stime_ticks: u64,
    starttime_ticks: u64,
}

/// Parses the content of `/proc/{pid}/stat`.
///
/// Format: `pid (comm) state ppid pgrp session tty_nr tpgid flags minflt
/// cminflt majflt cmajflt utime stime cutime cstime priority nice
/// num_threads itrealvalue starttime vsize rss ...`
///
/// The comm field may itself contain spaces and parentheses, so the
/// closing delimiter is the last `)` in the line.
fn parse_stat_content(content: &str) -> Result<StatRecord> {
    let comm_start = content
        .find('(')
        .ok_or_else(|| PlatformError::parse("stat: no opening paren"))?;
    let comm_end = content
        .rfind(')')
        .ok_or_else(|| PlatformError::parse("stat: no closing paren"))?;
    if comm_end < comm_start {
        return Err(PlatformError::parse("stat: malformed comm delimiters"));
    }
    let name = content[comm_start + 1..comm_end].to_string();

    let after_comm = content
        .get(comm_end + 2..)
        .ok_or_else(|| PlatformError::parse("stat: truncated after comm"))?;
    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    if fields.len() < 20 {
        return Err(PlatformError::parse(format!(
            "stat: expected 20+ fields, got {}",
            fields.len()
        )));
    }

    // Field indices (0-indexed after comm):
    // 0: state, 11: utime, 12: stime, 19: starttime
    let state = fields[0]
        .chars()
        .next()
        .map_or(ProcessState::Unknown, ProcessState::from_stat_char);
    let utime_ticks = fields[11]
        .parse()
        .map_err(|_| PlatformError::parse("stat: bad utime"))?;
    let stime_ticks = fields[12]
        .parse()
        .map_err(|_| PlatformError::parse("stat: bad stime"))?;
    let starttime_ticks = fields[19]
        .parse()
        .map_err(|_| PlatformError::parse("stat: bad starttime"))?;

    Ok(StatRecord {
        name,
        state,
        utime_ticks,
        stime_ticks,
        starttime_ticks,
    })
}

/// Creation timestamp of a live process, for pid-reuse re-validation.
pub(crate) fn process_start_time(pid: u32) -> Option<SystemTime> {
    let content = fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
    let stat = parse_stat_content(&content).ok()?;
    let boot = read_boot_time()?;
    let start_secs = boot as f64 + stat.starttime_ticks as f64 / clock_ticks();
    Some(SystemTime::UNIX_EPOCH + Duration::from_secs_f64(start_secs))
}

/// System page size in bytes.
fn page_size() -> u64 {
    // SAFETY: sysconf is safe to call with _SC_PAGESIZE
    #[allow(unsafe_code)]
    let value = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if value > 0 { value as u64 } else { 4096 }
}

/// Kernel clock ticks per second.
fn clock_ticks() -> f64 {
    // SAFETY: sysconf is safe to call with _SC_CLK_TCK
    #[allow(unsafe_code)]
    let value = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if value > 0 { value as f64 } else { 100.0 }
}

/// Boot time in seconds since the epoch, from the `btime` line of
/// `/proc/stat`.
fn read_boot_time() -> Option<u64> {
    let content = fs::read_to_string("/proc/stat").ok()?;
    content
        .lines()
        .find_map(|line| line.strip_prefix("btime "))
        .and_then(|rest| rest.trim().parse().ok())
}
