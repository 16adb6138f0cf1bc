use crate::models::array::{ArrayState, BitmapUsage, JobKind, MaintenanceJob, RaidArray};
use log::warn;
use std::fs;
use std::io;
use std::path::Path;

/// Default status source. The kernel rewrites it atomically, so every
/// query re-reads it in full rather than holding a handle open.
pub const MDSTAT_PATH: &str = "/proc/mdstat";

/// Read the raw status text. An Err here means the source is
/// unavailable (md modules not loaded, wrong path, permissions);
/// an empty Ok string means "no arrays" and is a healthy state.
pub fn read_status(path: &Path) -> io::Result<String> {
    fs::read_to_string(path)
}

/// Parse mdstat text into one record per array, in file order.
///
/// Never fails: blocks that can't be parsed are logged and dropped,
/// and free-floating metadata lines (Personalities, unused devices)
/// are ignored. Blank input yields an empty vec.
pub fn parse(text: &str) -> Vec<RaidArray> {
    let mut arrays = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in text.lines() {
        if is_ignored(line) { continue; }
        if is_header(line) {
            if let Some(array) = parse_block(&block) {
                arrays.push(array);
            }
            block.clear();
            block.push(line);
        } else if !block.is_empty() && !line.trim().is_empty() {
            block.push(line);
        }
    }
    if let Some(array) = parse_block(&block) {
        arrays.push(array);
    }

    arrays
}

fn is_ignored(line: &str) -> bool {
    let line = line.trim_start();
    // Global metadata lines; read_ahead shows up on some older kernels.
    line.starts_with("Personalities")
        || line.starts_with("read_ahead")
        || line.starts_with("unused devices:")
}

/// Each array block starts with "mdN : ...".
fn is_header(line: &str) -> bool {
    let Some((name, _)) = line.split_once(" : ") else { return false };
    let Some(digits) = name.strip_prefix("md") else { return false };
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn parse_block(lines: &[&str]) -> Option<RaidArray> {
    let header = lines.first()?;
    let (name, rest) = header.split_once(" : ")?;

    // e.g. "active raid1 sda1[0] sdb1[1](F)"
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    let Some(&marker) = tokens.first() else {
        warn!("skipping malformed md block: {:?}", header);
        return None;
    };
    let state = match marker {
        "active"   => ArrayState::Active,
        "inactive" => ArrayState::Inactive,
        other => {
            // Unrecognized activity marker: don't trust the array.
            warn!("{}: unrecognized state {:?}, treating as inactive", name, other);
            ArrayState::Inactive
        }
    };

    // Member devices carry a role suffix: "sda1[0]", "sdb1[2](F)".
    let component_count = tokens.iter().filter(|t| t.contains('[')).count() as u32;

    let mut degraded = false;
    let mut job = None;
    let mut bitmap = None;
    for line in &lines[1..] {
        let line = line.trim();
        // Status line carries "[configured/functional]" next to the [UU_] graphic.
        if let Some((configured, functional)) = device_counts(line) {
            degraded = functional < configured;
        }
        if job.is_none() {
            job = parse_job(line);
        }
        if line.starts_with("bitmap:") {
            bitmap = parse_bitmap(line);
        }
    }

    // Component accounting on an inactive array is not trusted.
    if state == ArrayState::Inactive {
        degraded = false;
    }

    Some(RaidArray {
        name: name.to_string(),
        state,
        degraded,
        component_count,
        job,
        bitmap,
    })
}

/// Pick the "[2/1]" configured/functional pair out of a status line.
/// The "[UU_]" graphic also matches the bracket scan but fails the
/// numeric parse, so a plain token walk is enough.
fn device_counts(line: &str) -> Option<(u32, u32)> {
    line.split_whitespace().find_map(|tok| {
        let inner = tok.strip_prefix('[')?.strip_suffix(']')?;
        let (configured, functional) = inner.split_once('/')?;
        Some((configured.parse().ok()?, functional.parse().ok()?))
    })
}

/// Classify a progress line like
/// "[=>...................]  resync = 42.0% (54512/129596288) finish=12.3min".
/// Splitting on the keyword rather than '=' keeps the progress-bar
/// characters out of the way.
fn parse_job(line: &str) -> Option<MaintenanceJob> {
    const KINDS: [(&str, JobKind); 3] = [
        ("check = ",    JobKind::Check),
        ("resync = ",   JobKind::Resync),
        ("recovery = ", JobKind::Recovery),
    ];
    let (kind, rest) = KINDS
        .iter()
        .find_map(|(kw, kind)| line.split_once(kw).map(|(_, rest)| (*kind, rest)))?;
    let pct: f64 = rest.split('%').next()?.trim().parse().ok()?;
    Some(MaintenanceJob { kind, progress: (pct / 100.0).clamp(0.0, 1.0) })
}

/// "bitmap: 3/233 pages [12KB], 65536KB chunk" → pages used/total.
/// Anything that doesn't parse cleanly means no bitmap record at all;
/// a partial value would poison the aggregate sums.
fn parse_bitmap(line: &str) -> Option<BitmapUsage> {
    let pages = line.strip_prefix("bitmap:")?.trim_start().split_whitespace().next()?;
    let (used, total) = pages.split_once('/')?;
    let pages_used: u64 = used.parse().ok()?;
    let pages_total: u64 = total.parse().ok()?;
    if pages_used > pages_total {
        return None;
    }
    Some(BitmapUsage { pages_used, pages_total })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEALTHY: &str = "\
Personalities : [raid1] [raid6] [raid5] [raid4]
md0 : active raid1 sda1[0] sdb1[1]
      976762584 blocks super 1.2 [2/2] [UU]

unused devices: <none>
";

    const DEGRADED: &str = "\
Personalities : [raid1]
md0 : active raid1 sda1[0]
      976762584 blocks super 1.2 [2/1] [U_]

unused devices: <none>
";

    const RESYNC: &str = "\
Personalities : [raid1]
md2 : active raid1 sdb3[1] sda3[0]
      129596288 blocks [2/2] [UU]
      [========>............]  resync = 42.0% (54440448/129596288) finish=12.3min speed=10000K/sec

unused devices: <none>
";

    const BITMAP: &str = "\
Personalities : [raid1]
md0 : active raid1 sda1[0] sdb1[1]
      976762584 blocks super 1.2 [2/2] [UU]
      bitmap: 3/8 pages [12KB], 65536KB chunk

unused devices: <none>
";

    #[test]
    fn healthy_mirror() {
        let arrays = parse(HEALTHY);
        assert_eq!(arrays.len(), 1);
        let md0 = &arrays[0];
        assert_eq!(md0.name, "md0");
        assert_eq!(md0.state, ArrayState::Active);
        assert_eq!(md0.component_count, 2);
        assert!(!md0.degraded);
        assert!(md0.job.is_none());
        assert!(md0.bitmap.is_none());
    }

    #[test]
    fn missing_member_is_degraded() {
        let arrays = parse(DEGRADED);
        assert_eq!(arrays.len(), 1);
        assert!(arrays[0].degraded);
        assert_eq!(arrays[0].component_count, 1);
    }

    #[test]
    fn resync_progress() {
        let arrays = parse(RESYNC);
        let job = arrays[0].job.as_ref().expect("resync job");
        assert_eq!(job.kind, JobKind::Resync);
        assert!((job.progress - 0.42).abs() < 1e-9);
    }

    #[test]
    fn recovery_keyword() {
        let text = "md1 : active raid5 sda1[0] sdb1[1] sdc1[3]\n\
                    \t3906764800 blocks level 5, 64k chunk, algorithm 2 [3/2] [UU_]\n\
                    \t[=>...................]  recovery = 9.5% (186112/1953382400) finish=83.9min speed=9300K/sec\n";
        let arrays = parse(text);
        assert_eq!(arrays[0].job.as_ref().unwrap().kind, JobKind::Recovery);
        assert!(arrays[0].degraded);
    }

    #[test]
    fn bitmap_pages() {
        let arrays = parse(BITMAP);
        let bm = arrays[0].bitmap.as_ref().expect("bitmap");
        assert_eq!(bm.pages_used, 3);
        assert_eq!(bm.pages_total, 8);
    }

    #[test]
    fn unparsable_bitmap_is_omitted() {
        let text = "md0 : active raid1 sda1[0] sdb1[1]\n\
                    \t1024 blocks [2/2] [UU]\n\
                    \tbitmap: garbage pages\n";
        let arrays = parse(text);
        assert_eq!(arrays.len(), 1);
        assert!(arrays[0].bitmap.is_none());
    }

    #[test]
    fn inactive_array_is_never_degraded() {
        // Inactive arrays list raw members with no [n/m] accounting we trust.
        let text = "md127 : inactive sda1[0](S)\n\t976762584 blocks super 1.2\n";
        let arrays = parse(text);
        assert_eq!(arrays[0].state, ArrayState::Inactive);
        assert!(!arrays[0].degraded);
        assert_eq!(arrays[0].component_count, 1);
    }

    #[test]
    fn unknown_marker_treated_as_inactive() {
        let text = "md0 : broken raid1 sda1[0]\n\t1024 blocks [2/1] [U_]\n";
        let arrays = parse(text);
        assert_eq!(arrays[0].state, ArrayState::Inactive);
        assert!(!arrays[0].degraded);
    }

    #[test]
    fn zero_member_block_still_emitted() {
        let text = "md5 : active raid0\n";
        let arrays = parse(text);
        assert_eq!(arrays.len(), 1);
        assert_eq!(arrays[0].component_count, 0);
    }

    #[test]
    fn faulty_members_count_as_components() {
        // (F) members are still listed components; degradation comes
        // from the [configured/functional] pair, not the member list.
        let text = "md0 : active raid1 sda1[0] sdb1[1](F)\n\t1024 blocks [2/1] [U_]\n";
        let arrays = parse(text);
        assert_eq!(arrays[0].component_count, 2);
        assert!(arrays[0].degraded);
    }

    #[test]
    fn malformed_block_is_skipped_not_fatal() {
        let text = "md9 : \nmd0 : active raid1 sda1[0] sdb1[1]\n\t1024 blocks [2/2] [UU]\n";
        let arrays = parse(text);
        assert_eq!(arrays.len(), 1);
        assert_eq!(arrays[0].name, "md0");
    }

    #[test]
    fn empty_input_is_empty_not_error() {
        assert!(parse("").is_empty());
        assert!(parse("Personalities : [raid1]\nunused devices: <none>\n").is_empty());
    }

    #[test]
    fn multiple_arrays_in_file_order() {
        let text = "md1 : active raid1 sdb2[1] sda2[0]\n\
                    \t136448 blocks [2/2] [UU]\n\
                    \n\
                    md0 : active raid1 sdb1[1] sda1[0]\n\
                    \t979840 blocks [2/2] [UU]\n";
        let names: Vec<_> = parse(text).into_iter().map(|a| a.name).collect();
        assert_eq!(names, ["md1", "md0"]);
    }

    #[test]
    fn reparse_is_deterministic() {
        assert_eq!(parse(RESYNC), parse(RESYNC));
        assert_eq!(parse(BITMAP), parse(BITMAP));
    }

    #[test]
    fn progress_clamped_to_unit_interval() {
        let text = "md0 : active raid1 sda1[0] sdb1[1]\n\
                    \t[====================>]  check = 123.0% (1/1) finish=0.0min\n";
        let job = parse(text)[0].job.clone().expect("check job");
        assert_eq!(job.kind, JobKind::Check);
        assert!((job.progress - 1.0).abs() < f64::EPSILON);
    }
}
