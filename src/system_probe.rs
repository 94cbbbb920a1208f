/*!
 * System resource probe.
 *
 * Samples CPU core count, load and RAM utilization once per run so the
 * scheduler can size its pool and batches from live pressure.
 */

use log::warn;
use sysinfo::System;

/// RAM utilization assumed when the platform reports no memory figures.
/// Lands in the smallest batch tier.
pub const UNKNOWN_RAM_UTILIZATION: f32 = 75.0;

/// Snapshot of system resources
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceSample {
    /// Logical CPU cores available to the process
    pub cpu_count: usize,
    /// Used RAM in percent (0-100)
    pub ram_utilization: f32,
    /// One-minute load average, when the platform exposes it
    pub load_average: Option<f32>,
}

/// Source of resource samples
pub trait ResourceProbe: Send + Sync {
    fn sample(&self) -> ResourceSample;
}

/// Probe reading the running system
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl SystemProbe {
    pub fn new() -> Self {
        Self
    }
}

impl ResourceProbe for SystemProbe {
    fn sample(&self) -> ResourceSample {
        let cpu_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        let mut system = System::new();
        system.refresh_memory();
        let ram_utilization = used_ram_percent(system.total_memory(), system.available_memory())
            .unwrap_or_else(|| {
                warn!(
                    "RAM utilization unavailable, assuming {}% to keep batches small",
                    UNKNOWN_RAM_UTILIZATION
                );
                UNKNOWN_RAM_UTILIZATION
            });

        let load = System::load_average();
        let load_average = (load.one > 0.0).then_some(load.one as f32);

        ResourceSample {
            cpu_count,
            ram_utilization,
            load_average,
        }
    }
}

/// Probe returning a fixed sample
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe {
    sample: ResourceSample,
}

impl FixedProbe {
    pub fn new(cpu_count: usize, ram_utilization: f32) -> Self {
        Self {
            sample: ResourceSample {
                cpu_count,
                ram_utilization,
                load_average: None,
            },
        }
    }
}

impl ResourceProbe for FixedProbe {
    fn sample(&self) -> ResourceSample {
        self.sample
    }
}

/// Used-RAM percent from total and available bytes, `None` when the
/// platform reported nothing
fn used_ram_percent(total: u64, available: u64) -> Option<f32> {
    if total == 0 {
        return None;
    }
    let used = total.saturating_sub(available) as f64;
    Some(((used / total as f64) * 100.0).clamp(0.0, 100.0) as f32)
}
