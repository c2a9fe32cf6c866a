//! # File I/O Module
//!
//! Handles job and result files with safety features:
//! - **Atomic saves**: Write to .tmp, sync, rename to prevent corruption
//! - **Version validation**: Ensure schema compatibility
//!
//! ## File Format
//!
//! Jobs are saved as `.bwj` files containing JSON. Results are plain JSON.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cost_core::calculations::MachiningInput;
//! use cost_core::file_io::{load_job, save_job, save_result};
//! use cost_core::job::CostingJob;
//! use std::path::Path;
//!
//! let job = CostingJob::new("Bracket", MachiningInput::default());
//! save_job(&job, Path::new("bracket.bwj"))?;
//!
//! let job = load_job(Path::new("bracket.bwj"))?;
//! save_result(&job.run(), Path::new("bracket.result.json"))?;
//! # Ok::<(), cost_core::errors::CostError>(())
//! ```

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::calculations::MachiningResult;
use crate::errors::{CostError, CostResult};
use crate::job::{CostingJob, SCHEMA_VERSION};

/// Save a job to a file with atomic write semantics.
///
/// The save process:
/// 1. Serialize job to JSON
/// 2. Write to a temporary file (.tmp)
/// 3. Sync to disk (fsync)
/// 4. Rename .tmp over the target (atomic on most filesystems)
pub fn save_job(job: &CostingJob, path: &Path) -> CostResult<()> {
    write_json_atomic(job, path)
}

/// Save a costing result as pretty JSON, atomically.
pub fn save_result(result: &MachiningResult, path: &Path) -> CostResult<()> {
    write_json_atomic(result, path)
}

/// Load a job from a file.
///
/// # Returns
///
/// * `Ok(CostingJob)` - Successfully loaded job
/// * `Err(CostError::VersionMismatch)` - File version is incompatible
/// * `Err(CostError::SerializationError)` - Invalid JSON
/// * `Err(CostError::FileError)` - I/O error
pub fn load_job(path: &Path) -> CostResult<CostingJob> {
    let mut file = File::open(path)
        .map_err(|e| CostError::file_error("open", path.display().to_string(), e.to_string()))?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| CostError::file_error("read", path.display().to_string(), e.to_string()))?;

    let job: CostingJob = serde_json::from_str(&contents).map_err(|e| CostError::SerializationError {
        reason: format!("Invalid JSON in {}: {}", path.display(), e),
    })?;

    validate_version(&job.meta.version)?;

    debug!(path = %path.display(), label = %job.meta.label, "job loaded");
    Ok(job)
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_json_atomic<T: Serialize>(value: &T, path: &Path) -> CostResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp_path = tmp_path_for(path);

    let mut tmp_file = File::create(&tmp_path).map_err(|e| {
        CostError::file_error("create temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.write_all(json.as_bytes()).map_err(|e| {
        CostError::file_error("write temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.sync_all().map_err(|e| {
        CostError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        CostError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    debug!(path = %path.display(), bytes = json.len(), "file saved");
    Ok(())
}

/// Validate that a file version is compatible with the current schema.
fn validate_version(file_version: &str) -> CostResult<()> {
    let mismatch = || CostError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    let file_parts: Vec<u32> = file_version.split('.').filter_map(|p| p.parse().ok()).collect();
    let current_parts: Vec<u32> = SCHEMA_VERSION.split('.').filter_map(|p| p.parse().ok()).collect();

    if file_parts.is_empty() || current_parts.is_empty() {
        return Err(mismatch());
    }

    // Major version must match
    if file_parts[0] != current_parts[0] {
        return Err(mismatch());
    }

    // For 0.x versions, a newer minor is not readable
    if current_parts[0] == 0 && file_parts.len() > 1 && current_parts.len() > 1 && file_parts[1] > current_parts[1] {
        return Err(mismatch());
    }

    Ok(())
}
