//! Filesystem metadata merged into every unit by the dispatcher.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

use crate::core::config::MetadataMode;
use crate::types::UnitMetadata;

fn unix_seconds(time: std::io::Result<SystemTime>) -> Option<Value> {
    let secs = time.ok()?.duration_since(UNIX_EPOCH).ok()?.as_secs_f64();
    Some(Value::from(secs))
}

/// Sniff size and timestamps (and ownership in `Full` mode) for `path`.
///
/// Best-effort: values the platform cannot supply are omitted, and an unreadable
/// path yields an empty map.
pub fn sniff_file_metadata(path: &Path, mode: MetadataMode) -> UnitMetadata {
    let mut meta = UnitMetadata::new();
    let Ok(stat) = std::fs::metadata(path) else {
        return meta;
    };

    meta.insert("size_bytes".to_string(), Value::from(stat.len()));
    if let Some(v) = unix_seconds(stat.modified()) {
        meta.insert("modified_time".to_string(), v);
    }
    if let Some(v) = unix_seconds(stat.created()) {
        meta.insert("created_time".to_string(), v);
    }

    if mode == MetadataMode::Full {
        if let Some(v) = unix_seconds(stat.accessed()) {
            meta.insert("access_time".to_string(), v);
        }
        meta.insert("readonly".to_string(), Value::from(stat.permissions().readonly()));

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            meta.insert("mode".to_string(), Value::from(format!("{:o}", stat.mode() & 0o7777)));
            meta.insert("owner_uid".to_string(), Value::from(stat.uid()));
            meta.insert("owner_gid".to_string(), Value::from(stat.gid()));
        }
    }

    meta
}
