//! Registry persistence
//!
//! Reads and writes the three registry documents in a Home Assistant
//! `.storage` directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::domain::{RegistryDocument, RegistryKind, RegistrySnapshot};
use crate::infrastructure::error::{InfraError, InfraResult};
use crate::infrastructure::traits::FileSystem;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Timestamp suffix for backup files.
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// File name of a registry inside the storage directory.
pub fn file_name(kind: RegistryKind) -> &'static str {
    match kind {
        RegistryKind::ConfigEntries => "core.config_entries",
        RegistryKind::Devices => "core.device_registry",
        RegistryKind::Entities => "core.entity_registry",
    }
}

/// Files touched by a save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub written: Vec<PathBuf>,
    pub backups: Vec<PathBuf>,
}

/// Loads and stores registry snapshots.
pub struct RegistryRepository {
    fs: Arc<dyn FileSystem>,
    storage_dir: PathBuf,
    indent: usize,
}

impl RegistryRepository {
    pub fn new(fs: Arc<dyn FileSystem>, storage_dir: impl Into<PathBuf>, indent: usize) -> Self {
        Self {
            fs,
            storage_dir: storage_dir.into(),
            indent,
        }
    }

    pub fn path(&self, kind: RegistryKind) -> PathBuf {
        self.storage_dir.join(file_name(kind))
    }

    /// Load all three registries.
    #[instrument(level = "debug", skip(self), fields(dir = %self.storage_dir.display()))]
    pub fn load(&self) -> InfraResult<RegistrySnapshot> {
        if !self.fs.is_dir(&self.storage_dir) {
            return Err(InfraError::io(
                format!("storage directory {}", self.storage_dir.display()),
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }
        Ok(RegistrySnapshot {
            config_entries: self.load_document(RegistryKind::ConfigEntries)?,
            devices: self.load_document(RegistryKind::Devices)?,
            entities: self.load_document(RegistryKind::Entities)?,
        })
    }

    fn load_document(&self, kind: RegistryKind) -> InfraResult<RegistryDocument> {
        let path = self.path(kind);
        let bytes = self
            .fs
            .read(&path)
            .map_err(|e| InfraError::io(format!("read {}", path.display()), e))?;
        let content = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);
        let raw: Value = serde_json::from_slice(content)
            .map_err(|e| InfraError::json(path.display().to_string(), e))?;
        debug!("loaded {}", path.display());
        Ok(RegistryDocument::new(kind, raw)?)
    }

    /// Serialize a document the way Home Assistant does: indented,
    /// non-ASCII kept as is.
    pub fn encode(&self, document: &RegistryDocument) -> InfraResult<Vec<u8>> {
        let indent = " ".repeat(self.indent);
        let mut buf = Vec::new();
        let mut ser =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(indent.as_bytes()));
        document
            .as_value()
            .serialize(&mut ser)
            .map_err(|e| InfraError::json(format!("encode {}", file_name(document.kind())), e))?;
        buf.push(b'\n');
        Ok(buf)
    }

    /// Write all three registries.
    ///
    /// Everything is encoded (and backed up, if asked) before the first
    /// registry file is replaced.
    #[instrument(level = "debug", skip(self, snapshot))]
    pub fn save(&self, snapshot: &RegistrySnapshot, backup: bool) -> InfraResult<SaveReport> {
        let mut encoded: Vec<(PathBuf, Vec<u8>)> = Vec::with_capacity(RegistryKind::ALL.len());
        for kind in RegistryKind::ALL {
            encoded.push((self.path(kind), self.encode(snapshot.document(kind))?));
        }

        let mut report = SaveReport::default();
        if backup {
            let stamp = chrono::Local::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
            for (path, _) in &encoded {
                if !self.fs.exists(path) {
                    continue;
                }
                let target = self.free_backup_path(path, &stamp);
                self.fs.copy(path, &target).map_err(|e| {
                    InfraError::io(format!("backup {} to {}", path.display(), target.display()), e)
                })?;
                info!("backed up {} to {}", path.display(), target.display());
                report.backups.push(target);
            }
        }

        for (path, bytes) in encoded {
            self.fs
                .write(&path, &bytes)
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            info!("wrote {}", path.display());
            report.written.push(path);
        }
        Ok(report)
    }

    /// First backup path for `stamp` that does not exist yet.
    ///
    /// Saves within the same second get a numbered suffix instead of
    /// overwriting an earlier backup.
    fn free_backup_path(&self, path: &Path, stamp: &str) -> PathBuf {
        let mut target = backup_path(path, stamp, 0);
        let mut attempt = 0;
        while self.fs.exists(&target) {
            attempt += 1;
            target = backup_path(path, stamp, attempt);
        }
        target
    }
}

fn backup_path(path: &Path, stamp: &str, attempt: usize) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    if attempt == 0 {
        name.push(format!(".{}.bak", stamp));
    } else {
        name.push(format!(".{}.{}.bak", stamp, attempt));
    }
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::traits::RealFileSystem;
    use tempfile::TempDir;

    #[test]
    fn given_registry_file_when_building_backup_path_then_appends_stamp() {
        let path = Path::new("/config/.storage/core.device_registry");
        assert_eq!(
            backup_path(path, "20261019T101500", 0),
            PathBuf::from("/config/.storage/core.device_registry.20261019T101500.bak")
        );
        assert_eq!(
            backup_path(path, "20261019T101500", 2),
            PathBuf::from("/config/.storage/core.device_registry.20261019T101500.2.bak")
        );
    }

    #[test]
    fn given_existing_backups_for_stamp_when_choosing_target_then_numbered_suffix() {
        // Arrange
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("core.device_registry");
        std::fs::write(&path, "{}").unwrap();
        std::fs::write(backup_path(&path, "20261019T101500", 0), "first").unwrap();
        std::fs::write(backup_path(&path, "20261019T101500", 1), "second").unwrap();
        let repo = RegistryRepository::new(Arc::new(RealFileSystem), temp.path(), 4);

        // Act
        let target = repo.free_backup_path(&path, "20261019T101500");

        // Assert
        assert_eq!(target, backup_path(&path, "20261019T101500", 2));
    }
}
