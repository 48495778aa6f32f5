//! Host load samplers.

use std::time::Duration;

use crate::core::{DispatchError, LoadSampler};

/// Default blocking window for one CPU sample.
pub const DEFAULT_SAMPLE_WINDOW: Duration = Duration::from_secs(1);

/// Aggregate CPU counters, in clock ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    /// Ticks spent doing work.
    pub busy: u64,
    /// All ticks, busy or idle.
    pub total: u64,
}

impl CpuTimes {
    /// Counters from busy and idle tick totals.
    pub const fn new(busy: u64, idle: u64) -> Self {
        Self {
            busy,
            total: busy.saturating_add(idle),
        }
    }

    /// Utilization between two readings, in percent.
    pub fn utilization_since(self, earlier: Self) -> f32 {
        let total = self.total.saturating_sub(earlier.total);
        if total == 0 {
            return 0.0;
        }
        let busy = self.busy.saturating_sub(earlier.busy);
        (busy as f64 / total as f64 * 100.0) as f32
    }
}

/// Guest time is already counted in user time, so it is left out.
#[cfg(target_os = "linux")]
impl From<&procfs::CpuTime> for CpuTimes {
    fn from(cpu: &procfs::CpuTime) -> Self {
        let busy = cpu.user
            + cpu.nice
            + cpu.system
            + cpu.irq.unwrap_or(0)
            + cpu.softirq.unwrap_or(0)
            + cpu.steal.unwrap_or(0);
        let idle = cpu.idle + cpu.iowait.unwrap_or(0);
        Self::new(busy, idle)
    }
}

#[cfg(target_os = "linux")]
fn read_cpu_times() -> Result<CpuTimes, DispatchError> {
    use procfs::CurrentSI;

    let stats = procfs::KernelStats::current()
        .map_err(|e| DispatchError::Load(format!("/proc/stat: {e}")))?;
    Ok(CpuTimes::from(&stats.total))
}

#[cfg(not(target_os = "linux"))]
fn read_cpu_times() -> Result<CpuTimes, DispatchError> {
    Err(DispatchError::Load("host cpu sampling needs /proc/stat".to_string()))
}

/// Measures CPU utilization from `/proc/stat` over a fixed blocking window.
///
/// Every call takes a fresh measurement; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct ProcStatSampler {
    window: Duration,
}

impl Default for ProcStatSampler {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_WINDOW)
    }
}

impl ProcStatSampler {
    /// Sampler taking two readings `window` apart.
    pub const fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Length of the blocking window.
    pub const fn window(&self) -> Duration {
        self.window
    }
}

impl LoadSampler for ProcStatSampler {
    fn cpu_percent(&mut self) -> Result<f32, DispatchError> {
        let before = read_cpu_times()?;
        std::thread::sleep(self.window);
        let after = read_cpu_times()?;
        Ok(after.utilization_since(before))
    }
}

/// Sampler returning a constant value. Used when the load check is disabled
/// and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLoad(pub f32);

impl LoadSampler for FixedLoad {
    fn cpu_percent(&mut self) -> Result<f32, DispatchError> {
        Ok(self.0)
    }
}
