//! services/api/src/adapters/attendance_fs.rs
//!
//! Filesystem-backed `AttendanceArchive`: exports land as CSV files in one directory.

use async_trait::async_trait;
use picata_core::ports::{AttendanceArchive, PortError, PortResult};
use std::path::PathBuf;
use tracing::info;

#[derive(Clone, Debug)]
pub struct FsAttendanceArchive {
    dir: PathBuf,
}

impl FsAttendanceArchive {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl AttendanceArchive for FsAttendanceArchive {
    /// Writes to a temporary sibling first and renames it into place, so readers
    /// only ever see the complete file.
    async fn save(&self, file_name: &str, contents: &[u8]) -> PortResult<String> {
        if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name.starts_with('.') {
            return Err(PortError::InvalidInput(format!(
                "'{}' is not a plain file name",
                file_name
            )));
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PortError::Storage(format!("Could not create {}: {}", self.dir.display(), e)))?;

        let target = self.dir.join(file_name);
        let staging = self.dir.join(format!(".{}.tmp", file_name));

        tokio::fs::write(&staging, contents)
            .await
            .map_err(|e| PortError::Storage(format!("Could not write {}: {}", staging.display(), e)))?;
        if let Err(e) = tokio::fs::rename(&staging, &target).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(PortError::Storage(format!(
                "Could not move attendance into {}: {}",
                target.display(),
                e
            )));
        }

        info!("Attendance saved at {}", target.display());
        Ok(target.display().to_string())
    }
}
