//! Local file storage.
//!
//! The persistence collaborator hands this core its data as plain snapshot
//! files in the data directory; the same backend stores `config.yaml`.
//! Writes go through a temp file and a rename so readers never observe a
//! half-written snapshot.

use std::path::PathBuf;
use std::time::SystemTime;

/// Snapshot of administrator-drawn areas, written by the host app.
pub const AREAS_SNAPSHOT: &str = "areas.json";

/// Snapshot of submitted reports, written by the host app.
pub const REPORTS_SNAPSHOT: &str = "reports.json";

pub trait StorageManager: Send + Sync {
    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()>;
    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>>;
    fn exists(&self, ident: &str) -> bool;
    fn modified(&self, ident: &str) -> std::io::Result<SystemTime>;
}

#[derive(Debug, Clone)]
pub struct BackendLocal {
    base_dir: PathBuf,
}

impl BackendLocal {
    pub fn new(base_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn path_for(&self, ident: &str) -> PathBuf {
        self.base_dir.join(ident)
    }
}

impl StorageManager for BackendLocal {
    fn exists(&self, ident: &str) -> bool {
        std::fs::metadata(self.path_for(ident)).is_ok()
    }

    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.path_for(ident))
    }

    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()> {
        let nanos = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let temp_path = self.base_dir.join(format!(".{ident}.{nanos}.tmp"));

        std::fs::write(&temp_path, data)?;
        std::fs::rename(&temp_path, self.path_for(ident))
    }

    fn modified(&self, ident: &str) -> std::io::Result<SystemTime> {
        std::fs::metadata(self.path_for(ident))?.modified()
    }
}
