//! Artifact cache sweep
//!
//! Rendered artifacts are a cache; anything older than the retention
//! window is removed and re-rendered on demand. The sweep is advisory:
//! an artifact whose source booking was updated after the file's mtime
//! is left alone so an in-flight re-render is never raced.

use std::path::Path;
use std::time::{Duration, SystemTime};

use super::booking_id_from_file_name;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub removed: usize,
    pub kept: usize,
}

/// Sweep `dir` once. `source_updated_at` maps a booking id to the source
/// entity's `updated_at` in Unix millis (`None` for unknown bookings,
/// whose artifacts are treated as orphans).
pub fn sweep_artifacts(
    dir: &Path,
    max_age: Duration,
    source_updated_at: impl Fn(i64) -> Option<i64>,
) -> std::io::Result<SweepStats> {
    let mut stats = SweepStats::default();
    let now = SystemTime::now();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        // Only files matching the artifact naming scheme are ours to touch
        let Some(booking_id) = booking_id_from_file_name(name) else {
            continue;
        };

        let mtime = entry.metadata()?.modified()?;
        let age = now.duration_since(mtime).unwrap_or(Duration::ZERO);
        if age < max_age {
            stats.kept += 1;
            continue;
        }

        let mtime_millis = mtime
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        match source_updated_at(booking_id) {
            // Source moved after the artifact was written; a re-render is
            // coming, leave the file for it
            Some(updated_at) if updated_at > mtime_millis => {
                stats.kept += 1;
            }
            _ => {
                std::fs::remove_file(entry.path())?;
                stats.removed += 1;
            }
        }
    }
    Ok(stats)
}

/// Run the sweep forever at the given interval; spawn on the runtime.
pub async fn run_artifact_sweep(
    dir: std::path::PathBuf,
    max_age: Duration,
    interval: Duration,
    source_updated_at: impl Fn(i64) -> Option<i64> + Send + 'static,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match sweep_artifacts(&dir, max_age, &source_updated_at) {
            Ok(stats) if stats.removed > 0 => {
                tracing::info!(removed = stats.removed, kept = stats.kept, "artifact sweep");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "artifact sweep failed");
            }
        }
    }
}
