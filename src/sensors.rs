use crate::collectors::mdstat;
use crate::models::array::{JobKind, RaidArray};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("unknown sensor {0:?}")]
    UnknownSensor(String),
    #[error("status source {} unavailable: {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Declared upper bound reported through the protocol. KSysGuard wants
/// a range for scaling, not a ceiling; larger real values are still
/// reported as-is.
const COUNTER_MAX: i64 = 4096;

/// One registered sensor. The catalogue is built once at startup and
/// never mutated; `compute` runs over a fresh parse on every query.
pub struct SensorDefinition {
    pub name:        &'static str,
    pub description: &'static str,
    pub unit:        Option<&'static str>,
    pub min:         i64,
    pub max:         i64,
    compute:         fn(&[RaidArray]) -> i64,
}

pub struct SensorRegistry {
    source:  PathBuf,
    sensors: Vec<SensorDefinition>,
}

impl SensorRegistry {
    pub fn new(source: PathBuf) -> Self {
        Self { source, sensors: catalogue() }
    }

    /// All registered sensors, in registration order (stable across calls).
    pub fn list(&self) -> &[SensorDefinition] {
        &self.sensors
    }

    pub fn describe(&self, name: &str) -> Result<&SensorDefinition, SensorError> {
        self.sensors
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| SensorError::UnknownSensor(name.to_string()))
    }

    /// Compute the current value for one sensor. Each call re-reads and
    /// re-parses the source; the file can be rewritten between queries
    /// and a stale answer would be wrong for a health monitor.
    pub fn value(&self, name: &str) -> Result<i64, SensorError> {
        let def = self.describe(name)?;
        let arrays = self.snapshot()?;
        Ok((def.compute)(&arrays))
    }

    /// "No arrays" (empty file) and "can't read the file" are different
    /// answers; the latter fails rather than fabricating zeros.
    fn snapshot(&self) -> Result<Vec<RaidArray>, SensorError> {
        let text = mdstat::read_status(&self.source).map_err(|source| {
            SensorError::SourceUnavailable { path: self.source.clone(), source }
        })?;
        Ok(mdstat::parse(&text))
    }
}

fn count(arrays: &[RaidArray], pred: fn(&&RaidArray) -> bool) -> i64 {
    arrays.iter().filter(pred).count() as i64
}

fn job_count(arrays: &[RaidArray], kind: JobKind) -> i64 {
    arrays
        .iter()
        .filter(|a| a.job.as_ref().is_some_and(|j| j.kind == kind))
        .count() as i64
}

fn sensor(
    name: &'static str,
    description: &'static str,
    unit: Option<&'static str>,
    compute: fn(&[RaidArray]) -> i64,
) -> SensorDefinition {
    SensorDefinition { name, description, unit, min: 0, max: COUNTER_MAX, compute }
}

fn catalogue() -> Vec<SensorDefinition> {
    vec![
        sensor("SoftRaid/TotalDevices", "Total device count", None,
            |a| a.len() as i64),
        sensor("SoftRaid/ActiveDevices", "Active device count", None,
            |a| count(a, |d| d.is_active())),
        sensor("SoftRaid/FailedDevices", "Inactive device count", None,
            |a| count(a, |d| !d.is_active())),
        sensor("SoftRaid/DegradedDevices", "Degraded device count", None,
            |a| count(a, |d| d.degraded)),
        sensor("SoftRaid/MaintenanceJobs", "Devices running any maintenance job", None,
            |a| count(a, |d| d.job.is_some())),
        sensor("SoftRaid/CheckJobs", "Devices running a consistency check", None,
            |a| job_count(a, JobKind::Check)),
        sensor("SoftRaid/ResyncJobs", "Devices running a resync", None,
            |a| job_count(a, JobKind::Resync)),
        sensor("SoftRaid/RecoveryJobs", "Devices running a recovery", None,
            |a| job_count(a, JobKind::Recovery)),
        sensor("SoftRaid/BitmapDevices", "Devices with a write-intent bitmap", None,
            |a| count(a, |d| d.bitmap.is_some())),
        sensor("SoftRaid/BitmapPagesUsed", "Write-intent bitmap pages in use", Some("pages"),
            |a| a.iter().filter_map(|d| d.bitmap.as_ref()).map(|b| b.pages_used as i64).sum()),
        sensor("SoftRaid/TotalComponents", "Total component device count", None,
            |a| a.iter().map(|d| i64::from(d.component_count)).sum()),
    ]
}
