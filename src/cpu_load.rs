use std::collections::BTreeMap;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::constants::{CPU_SAMPLE_WINDOW_MS, LOAD_LINE_WIDTH};
use crate::error::{OverlayError, Result};

/// Number of time-in-state counters per cpu line of /proc/stat
pub const NUM_CPU_STATES: usize = 10;

// Counter order as exposed by the kernel
const S_USER: usize = 0;
const S_NICE: usize = 1;
const S_SYSTEM: usize = 2;
const S_IDLE: usize = 3;
const S_IOWAIT: usize = 4;
const S_IRQ: usize = 5;
const S_SOFTIRQ: usize = 6;
const S_STEAL: usize = 7;
const S_GUEST: usize = 8;
const S_GUEST_NICE: usize = 9;

/// Cumulative counters of a single cpu entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoreCounters {
    pub times: [u64; NUM_CPU_STATES],
}

impl CoreCounters {
    pub fn new(times: [u64; NUM_CPU_STATES]) -> Self {
        Self { times }
    }

    pub fn idle_time(&self) -> u64 {
        self.times[S_IDLE] + self.times[S_IOWAIT]
    }

    pub fn active_time(&self) -> u64 {
        self.times[S_USER]
            + self.times[S_NICE]
            + self.times[S_SYSTEM]
            + self.times[S_IRQ]
            + self.times[S_SOFTIRQ]
            + self.times[S_STEAL]
            + self.times[S_GUEST]
            + self.times[S_GUEST_NICE]
    }
}

/// One read of the kernel counters. Id 0 is the aggregate line, id n is `cpu{n-1}`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoreCounterSnapshot {
    pub cores: BTreeMap<usize, CoreCounters>,
}

/// Anything able to produce a counter snapshot
pub trait CounterSource: Send + Sync {
    fn read_snapshot(&self) -> Result<CoreCounterSnapshot>;
}

/// Reads counters from /proc/stat
#[derive(Debug, Clone)]
pub struct ProcStat {
    path: PathBuf,
}

impl ProcStat {
    pub fn new() -> Self {
        Self::with_path("/proc/stat")
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for ProcStat {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterSource for ProcStat {
    fn read_snapshot(&self) -> Result<CoreCounterSnapshot> {
        let stat = std::fs::read_to_string(&self.path)?;
        parse_proc_stat(&stat)
    }
}

/// Parse the cpu lines of a /proc/stat dump.
///
/// Missing trailing counters (older kernels) read as zero.
pub fn parse_proc_stat(stat: &str) -> Result<CoreCounterSnapshot> {
    let mut snapshot = CoreCounterSnapshot::default();

    for line in stat.lines().filter(|l| l.starts_with("cpu")) {
        let mut fields = line.split_whitespace();
        let Some(label) = fields.next() else {
            continue;
        };

        let id = match &label["cpu".len()..] {
            "" => 0,
            n => match n.parse::<usize>() {
                Ok(n) => n + 1,
                Err(_) => {
                    debug!("skipping cpu line with label {label:?}");
                    continue;
                }
            },
        };

        let mut times = [0u64; NUM_CPU_STATES];
        let mut parsed = 0;
        for (slot, field) in times.iter_mut().zip(fields) {
            match field.parse::<u64>() {
                Ok(v) => {
                    *slot = v;
                    parsed += 1;
                }
                Err(_) => break,
            }
        }
        // idle is the fourth counter, anything shorter is unusable
        if parsed <= S_IDLE {
            debug!("skipping truncated cpu line {line:?}");
            continue;
        }

        snapshot.cores.insert(id, CoreCounters::new(times));
    }

    if snapshot.cores.is_empty() {
        return Err(OverlayError::MalformedStat(
            "no cpu lines found".to_string(),
        ));
    }
    Ok(snapshot)
}

/// Utilization per core between two snapshots, truncated to one decimal.
///
/// Cores missing from either side are dropped. A core whose counters did not
/// advance reads 0.
pub fn utilization(
    before: &CoreCounterSnapshot,
    after: &CoreCounterSnapshot,
) -> BTreeMap<usize, f32> {
    before
        .cores
        .iter()
        .filter_map(|(id, b)| {
            let a = after.cores.get(id)?;
            let active = a.active_time().saturating_sub(b.active_time());
            let idle = a.idle_time().saturating_sub(b.idle_time());
            let total = active + idle;
            let percent = if total == 0 {
                0.0
            } else {
                truncate_one_decimal(100.0 * active as f64 / total as f64)
            };
            Some((*id, percent))
        })
        .collect()
}

pub(crate) fn truncate_one_decimal(value: f64) -> f32 {
    ((value * 10.0).trunc() / 10.0) as f32
}

/// Measures utilization over a fixed window. Blocks for the whole window.
pub struct CpuLoadSampler<S: CounterSource> {
    source: S,
    window: Duration,
}

impl<S: CounterSource> CpuLoadSampler<S> {
    pub fn new(source: S) -> Self {
        Self::with_window(source, Duration::from_millis(CPU_SAMPLE_WINDOW_MS))
    }

    pub fn with_window(source: S, window: Duration) -> Self {
        Self { source, window }
    }

    pub fn sample(&self) -> Result<CpuLoadSnapshot> {
        let before = self.source.read_snapshot()?;
        thread::sleep(self.window);
        let after = self.source.read_snapshot()?;

        let cores = utilization(&before, &after);
        debug!(cores = cores.len(), total = ?cores.get(&0), "cpu sample");
        Ok(CpuLoadSnapshot { cores })
    }
}

/// Published result of one sampling cycle
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CpuLoadSnapshot {
    pub cores: BTreeMap<usize, f32>,
}

impl CpuLoadSnapshot {
    /// Aggregate utilization over all cores
    pub fn total(&self) -> Option<f32> {
        self.cores.get(&0).copied()
    }

    /// One aligned display line per core, aggregate first
    pub fn lines(&self) -> Vec<String> {
        self.cores
            .iter()
            .map(|(id, value)| format_load_line(&core_label(*id), *value))
            .collect()
    }
}

pub fn core_label(id: usize) -> String {
    match id {
        0 => "CPU:".to_string(),
        n => format!("CPU{}:", n - 1),
    }
}

/// `label`, padding, value, `%`, with the value right-aligned in a fixed width
pub fn format_load_line(label: &str, value: f32) -> String {
    let value = value.to_string();
    let padding = LOAD_LINE_WIDTH.saturating_sub(label.len() + value.len());
    format!("{label}{}{value}%", " ".repeat(padding))
}
