use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::Course;

// ─── Cached payload ──────────────────────────────────────────────────────────

/// Last course listing, shown immediately on startup while a fresh one loads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheData {
    pub cached_at: DateTime<Utc>,
    pub courses: Vec<Course>,
}

// ─── Path ────────────────────────────────────────────────────────────────────

fn cache_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join("lms-dashboard").join("cache.json"))
}

// ─── I/O ─────────────────────────────────────────────────────────────────────

pub fn load_cache() -> Option<CacheData> {
    load_from(&cache_path()?)
}

pub fn save_cache(data: &CacheData) -> Result<()> {
    let path = cache_path().ok_or_else(|| anyhow!("Could not determine cache directory"))?;
    save_to(&path, data)
}

/// A missing or unreadable cache is treated as no cache.
fn load_from(path: &Path) -> Option<CacheData> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(data) => Some(data),
        Err(e) => {
            tracing::warn!("ignoring unreadable cache at {}: {e}", path.display());
            None
        }
    }
}

fn save_to(path: &Path, data: &CacheData) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn cache_survives_a_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");
        let course: Course = serde_json::from_value(serde_json::json!({
            "id": "edX/toy/2012_Fall",
            "name": "Toy Course",
            "number": "toy",
            "org": "edX",
            "end": "2015-09-19T18:00:00Z"
        }))
        .unwrap();
        let data = CacheData {
            cached_at: Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap(),
            courses: vec![course],
        };

        save_to(&path, &data).unwrap();
        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded.cached_at, data.cached_at);
        assert_eq!(loaded.courses[0].end, data.courses[0].end);
    }

    #[test]
    fn corrupt_cache_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_from(&path).is_none());
    }
}
