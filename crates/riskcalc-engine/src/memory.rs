//! Process memory sampling for parse observability.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sysinfo::{Pid, System};

/// Source of memory readings.
///
/// Readings are observability only; `None` means the platform could not
/// report a value and the sample is ignored.
pub trait MemoryProbe: Send + Sync {
    /// Memory used by this process, in bytes.
    fn used_bytes(&self) -> Option<u64>;

    /// Total memory available to the host, in bytes.
    fn total_bytes(&self) -> Option<u64>;
}

/// Probe backed by `sysinfo`.
pub struct SystemMemoryProbe {
    system: Mutex<System>,
    process_id: Option<Pid>,
}

impl SystemMemoryProbe {
    /// Creates a probe for the current process.
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
            process_id: sysinfo::get_current_pid().ok(),
        }
    }
}

impl Default for SystemMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SystemMemoryProbe {
    fn used_bytes(&self) -> Option<u64> {
        let pid = self.process_id?;
        let mut system = self.system.lock();
        system.refresh_process(pid);
        system.process(pid).map(sysinfo::Process::memory)
    }

    fn total_bytes(&self) -> Option<u64> {
        let mut system = self.system.lock();
        system.refresh_memory();
        match system.total_memory() {
            0 => None,
            total => Some(total),
        }
    }
}

impl std::fmt::Debug for SystemMemoryProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemMemoryProbe")
            .field("process_id", &self.process_id)
            .finish_non_exhaustive()
    }
}

/// Memory threshold breach seen while parsing. Logged, never fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemoryAlert {
    /// Peak usage above the configured share of total memory.
    HighUsage {
        /// Peak usage as a percentage of total memory.
        percent: f64,
        /// Peak usage in bytes.
        peak_bytes: u64,
        /// Total memory in bytes.
        total_bytes: u64,
    },
    /// Growth during parsing above the configured byte threshold.
    LargeAllocation {
        /// Peak minus starting usage, in bytes.
        delta_bytes: u64,
    },
}

/// Start and peak readings of one parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct MemoryTracker {
    start: Option<u64>,
    peak: Option<u64>,
    last: Option<u64>,
}

impl MemoryTracker {
    pub(crate) fn start(probe: &dyn MemoryProbe) -> Self {
        let start = probe.used_bytes();
        Self {
            start,
            peak: start,
            last: start,
        }
    }

    pub(crate) fn sample(&mut self, probe: &dyn MemoryProbe) -> Option<u64> {
        let reading = probe.used_bytes()?;
        self.last = Some(reading);
        self.peak = Some(self.peak.map_or(reading, |p| p.max(reading)));
        Some(reading)
    }

    pub(crate) fn start_bytes(&self) -> Option<u64> {
        self.start
    }

    pub(crate) fn peak_bytes(&self) -> Option<u64> {
        self.peak
    }

    pub(crate) fn last_bytes(&self) -> Option<u64> {
        self.last
    }

    /// Growth from start to peak.
    pub(crate) fn delta_bytes(&self) -> Option<u64> {
        Some(self.peak?.saturating_sub(self.start?))
    }

    /// Alerts for the configured thresholds.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn alerts(
        &self,
        total_bytes: Option<u64>,
        warn_percent: f64,
        warn_bytes: u64,
    ) -> Vec<MemoryAlert> {
        let mut alerts = Vec::new();
        if let (Some(peak), Some(total)) = (self.peak, total_bytes) {
            let percent = peak as f64 / total as f64 * 100.0;
            if percent > warn_percent {
                alerts.push(MemoryAlert::HighUsage {
                    percent,
                    peak_bytes: peak,
                    total_bytes: total,
                });
            }
        }
        if let Some(delta) = self.delta_bytes() {
            if delta > warn_bytes {
                alerts.push(MemoryAlert::LargeAllocation { delta_bytes: delta });
            }
        }
        alerts
    }
}
