//! Host resource monitor.
//!
//! Samples CPU, memory, load and temperature on every call and derives a
//! health status. Sampling never fails: if the sensors cannot be read the
//! monitor reports a zeroed, healthy record.

use std::path::Path;

use agentos_common::{AgentOsError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sysinfo::{Components, System};
use tracing::{debug, error};

use crate::config::MonitorConfig;

/// Chips preferred for the CPU temperature, in order.
const PREFERRED_SENSORS: [&str; 3] = ["coretemp", "k10temp", "cpu_thermal"];

const THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    Healthy,
    Warning,
    Critical,
}

impl ResourceStatus {
    /// Critical above either threshold; warning within 15 points of the
    /// CPU threshold or 10 points of the memory one. Comparisons are strict.
    pub fn from_usage(cpu_percent: f64, memory_percent: f64, thresholds: &MonitorConfig) -> Self {
        if cpu_percent > thresholds.cpu_critical || memory_percent > thresholds.memory_critical {
            ResourceStatus::Critical
        } else if cpu_percent > thresholds.cpu_critical - 15.0
            || memory_percent > thresholds.memory_critical - 10.0
        {
            ResourceStatus::Warning
        } else {
            ResourceStatus::Healthy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceStatus::Healthy => "healthy",
            ResourceStatus::Warning => "warning",
            ResourceStatus::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// Raw readings from a sensor source.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Usage {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub load_avg: LoadAverage,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetrics {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub load_avg: LoadAverage,
    pub temperature: f64,
    pub status: ResourceStatus,
}

impl ResourceMetrics {
    /// The fail-open reading: all zeros, healthy.
    pub fn zeroed() -> Self {
        Self {
            cpu_percent: 0.0,
            memory_percent: 0.0,
            load_avg: LoadAverage::default(),
            temperature: 0.0,
            status: ResourceStatus::Healthy,
        }
    }
}

/// Where readings come from.
pub trait SensorSource: Send + Sync {
    fn usage(&self) -> Result<Usage>;

    /// CPU temperature in Celsius, 0.0 when unknown.
    fn temperature(&self) -> f64;
}

/// Live readings via `sysinfo`.
pub struct SystemSensors {
    system: Mutex<System>,
}

impl SystemSensors {
    pub fn new() -> Self {
        let mut system = System::new();
        // Prime the CPU counters so the first sample has a baseline.
        system.refresh_cpu_usage();
        Self {
            system: Mutex::new(system),
        }
    }
}

impl Default for SystemSensors {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorSource for SystemSensors {
    fn usage(&self) -> Result<Usage> {
        let mut system = self.system.lock();
        system.refresh_cpu_usage();
        system.refresh_memory();

        let total = system.total_memory();
        if total == 0 {
            return Err(AgentOsError::Io(std::io::Error::other(
                "total memory reported as zero",
            )));
        }
        let memory_percent = system.used_memory() as f64 / total as f64 * 100.0;

        let load = System::load_average();
        Ok(Usage {
            cpu_percent: f64::from(system.global_cpu_usage()),
            memory_percent,
            load_avg: LoadAverage {
                one: load.one,
                five: load.five,
                fifteen: load.fifteen,
            },
        })
    }

    fn temperature(&self) -> f64 {
        let components = Components::new_with_refreshed_list();
        let readings: Vec<(String, Option<f32>)> = components
            .list()
            .iter()
            .map(|c| (c.label().to_string(), c.temperature()))
            .collect();
        pick_temperature(&readings, || read_thermal_zone(Path::new(THERMAL_ZONE)))
    }
}

/// Preferred chip, then any sensor with a reading, then the thermal zone
/// fallback, then 0.0.
pub fn pick_temperature(
    readings: &[(String, Option<f32>)],
    fallback: impl FnOnce() -> Option<f64>,
) -> f64 {
    let preferred = PREFERRED_SENSORS.iter().find_map(|name| {
        readings
            .iter()
            .filter(|(label, _)| label.to_lowercase().contains(name))
            .find_map(|(_, temp)| *temp)
    });

    preferred
        .or_else(|| readings.iter().find_map(|(_, temp)| *temp))
        .map(f64::from)
        .or_else(fallback)
        .unwrap_or(0.0)
}

/// Millidegrees Celsius, as the kernel reports it.
fn read_thermal_zone(path: &Path) -> Option<f64> {
    let raw = std::fs::read_to_string(path).ok()?;
    raw.trim().parse::<i64>().ok().map(|milli| milli as f64 / 1000.0)
}

pub struct ResourceMonitor {
    thresholds: MonitorConfig,
    source: Box<dyn SensorSource>,
}

impl ResourceMonitor {
    pub fn new(thresholds: MonitorConfig, source: Box<dyn SensorSource>) -> Self {
        Self { thresholds, source }
    }

    /// Monitor backed by the host's own sensors.
    pub fn system(thresholds: MonitorConfig) -> Self {
        Self::new(thresholds, Box::new(SystemSensors::new()))
    }

    pub fn thresholds(&self) -> &MonitorConfig {
        &self.thresholds
    }

    pub fn sample(&self) -> ResourceMetrics {
        let usage = match self.source.usage() {
            Ok(usage) => usage,
            Err(e) => {
                error!(error = %e, "Failed to read resource metrics");
                return ResourceMetrics::zeroed();
            }
        };

        let metrics = ResourceMetrics {
            cpu_percent: usage.cpu_percent,
            memory_percent: usage.memory_percent,
            load_avg: usage.load_avg,
            temperature: self.source.temperature(),
            status: ResourceStatus::from_usage(
                usage.cpu_percent,
                usage.memory_percent,
                &self.thresholds,
            ),
        };
        debug!(
            cpu = metrics.cpu_percent,
            memory = metrics.memory_percent,
            status = metrics.status.as_str(),
            "Sampled resources"
        );
        metrics
    }

    /// True when the host is under critical pressure.
    pub fn should_force_light_tier(&self) -> bool {
        self.sample().status == ResourceStatus::Critical
    }
}
