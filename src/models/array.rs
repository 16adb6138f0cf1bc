/// Activity state of an md array, taken from the marker token on its
/// header line. Anything we don't recognize is treated as inactive —
/// an array we can't positively call active shouldn't look healthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayState {
    Active,
    Inactive,
}

/// A background maintenance operation reported in /proc/mdstat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Check,
    Resync,
    Recovery,
}

/// A maintenance job in flight, with its progress as a fraction in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceJob {
    pub kind:     JobKind,
    pub progress: f64,
}

/// Write-intent bitmap usage, in pages. Only present for arrays that
/// have a bitmap enabled and whose bitmap line parsed cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapUsage {
    pub pages_used:  u64,
    pub pages_total: u64,
}

/// One software RAID array parsed from /proc/mdstat.
#[derive(Debug, Clone, PartialEq)]
pub struct RaidArray {
    pub name:            String,
    pub state:           ArrayState,
    /// Fewer functional components than the configured target. Only
    /// meaningful while the array is active; inactive arrays don't
    /// report trustworthy component accounting.
    pub degraded:        bool,
    /// Member devices listed for the array, faulty ones included.
    pub component_count: u32,
    pub job:             Option<MaintenanceJob>,
    pub bitmap:          Option<BitmapUsage>,
}

impl RaidArray {
    pub fn is_active(&self) -> bool {
        self.state == ArrayState::Active
    }
}
