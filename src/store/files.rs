use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::error::{HuntError, Result};
use crate::model::Treasure;
use crate::store::lock;
use crate::store::paths::HuntPaths;
use crate::store::record;

/// Flat-file treasure store rooted at the hunts directory.
///
/// Holds no record state: every call re-reads the hunt's `treasure.dat`.
pub struct TreasureStore {
    root: PathBuf,
}

/// Metadata and raw bytes of a hunt's record file.
#[derive(Debug, Clone, PartialEq)]
pub struct HuntListing {
    pub hunt: String,
    pub size: u64,
    pub modified: DateTime<Local>,
    pub content: Vec<u8>,
}

/// Which parts of a hunt `delete_hunt` actually removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub records_removed: bool,
    pub log_removed: bool,
    pub dir_removed: bool,
}

impl DeleteReport {
    pub fn removed_anything(&self) -> bool {
        self.records_removed || self.log_removed || self.dir_removed
    }
}

impl TreasureStore {
    pub fn open(hunts_root: &Path) -> Self {
        Self {
            root: hunts_root.to_path_buf(),
        }
    }

    pub fn paths(&self, hunt: &str) -> Result<HuntPaths> {
        HuntPaths::resolve(&self.root, hunt)
    }

    /// True if any decodable row of the hunt carries `id`. A hunt without a
    /// record file has no treasures.
    pub fn exists(&self, hunt: &str, id: &str) -> Result<bool> {
        let paths = self.paths(hunt)?;
        match read_lossy(&paths.records) {
            Ok(content) => Ok(contains_id(&content, id)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Normalize, validate and append a treasure, then append the audit line.
    ///
    /// The duplicate check and the record append run under one lock on the
    /// record file. The audit append is a separate write: if it fails the
    /// record stays and `AuditLogDiverged` is returned.
    pub fn add(&self, hunt: &str, mut treasure: Treasure) -> Result<Treasure> {
        let paths = self.paths(hunt)?;
        treasure.normalize();
        treasure.validate()?;
        ensure_hunt_dir(&self.root, &paths)?;

        {
            let mut file = OpenOptions::new()
                .read(true)
                .append(true)
                .create(true)
                .open(&paths.records)?;
            lock::lock_file(&file, &paths.records)?;

            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes)?;
            if contains_id(&String::from_utf8_lossy(&bytes), &treasure.id) {
                return Err(HuntError::DuplicateId {
                    hunt: paths.name.clone(),
                    id: treasure.id,
                });
            }

            let mut row = Vec::new();
            if bytes.last().is_some_and(|&b| b != b'\n') {
                row.push(b'\n');
            }
            row.extend_from_slice(record::encode(&treasure).as_bytes());
            file.write_all(&row)?;
            file.flush()?;
        }

        append_audit_line(&paths.log, &treasure).map_err(|source| {
            warn!(hunt = %paths.name, id = %treasure.id, error = %source, "audit log diverged from record file");
            HuntError::AuditLogDiverged {
                hunt: paths.name.clone(),
                id: treasure.id.clone(),
                source,
            }
        })?;

        info!(hunt = %paths.name, id = %treasure.id, user = %treasure.username, "treasure added");
        Ok(treasure)
    }

    /// First decodable row whose id matches.
    pub fn view(&self, hunt: &str, id: &str) -> Result<Treasure> {
        let paths = self.paths(hunt)?;
        let content = read_records(&paths)?;
        record::decode_all(&content)
            .find(|t| t.id == id)
            .ok_or_else(|| HuntError::TreasureNotFound {
                hunt: paths.name.clone(),
                id: id.to_string(),
            })
    }

    /// Every decodable row, in file order.
    pub fn records(&self, hunt: &str) -> Result<Vec<Treasure>> {
        let paths = self.paths(hunt)?;
        let content = read_records(&paths)?;
        Ok(record::decode_all(&content).collect())
    }

    /// File metadata plus the raw file bytes. Rows are not parsed.
    pub fn list(&self, hunt: &str) -> Result<HuntListing> {
        let paths = self.paths(hunt)?;
        let meta = fs::metadata(&paths.records).map_err(|e| not_found_as_hunt(e, &paths))?;
        let content = fs::read(&paths.records).map_err(|e| not_found_as_hunt(e, &paths))?;
        let modified: DateTime<Local> = meta.modified()?.into();
        Ok(HuntListing {
            hunt: paths.name,
            size: meta.len(),
            modified,
            content,
        })
    }

    /// Drop the first row with `id` and rewrite the file with the rest.
    ///
    /// Surviving rows are written back byte for byte, so non-UTF-8 text in a
    /// username or clue is preserved. Undecodable rows are not carried over.
    /// When `id` is absent the file is left untouched.
    pub fn remove(&self, hunt: &str, id: &str) -> Result<Treasure> {
        let paths = self.paths(hunt)?;
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&paths.records)
            .map_err(|e| not_found_as_hunt(e, &paths))?;
        lock::lock_file(&file, &paths.records)?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        let mut kept: Vec<&[u8]> = Vec::new();
        let mut removed = None;
        for line in bytes.split(|&b| b == b'\n') {
            let Some(row) = record::decode(&String::from_utf8_lossy(line)) else {
                continue;
            };
            if removed.is_none() && row.id == id {
                removed = Some(row);
            } else {
                kept.push(line);
            }
        }
        let Some(removed) = removed else {
            return Err(HuntError::TreasureNotFound {
                hunt: paths.name.clone(),
                id: id.to_string(),
            });
        };

        let mut rewritten = Vec::with_capacity(bytes.len());
        for line in &kept {
            rewritten.extend_from_slice(line);
            rewritten.push(b'\n');
        }
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&rewritten)?;
        file.flush()?;

        info!(hunt = %paths.name, id = %id, remaining = kept.len(), "treasure removed");
        Ok(removed)
    }

    /// Best-effort removal of the record file, the audit log and the hunt
    /// directory. Individual failures are logged, never returned.
    pub fn delete_hunt(&self, hunt: &str) -> Result<DeleteReport> {
        let paths = self.paths(hunt)?;
        let report = DeleteReport {
            records_removed: best_effort("record file", &paths.records, |p| fs::remove_file(p)),
            log_removed: best_effort("audit log", &paths.log, |p| fs::remove_file(p)),
            dir_removed: best_effort("hunt directory", &paths.dir, |p| fs::remove_dir(p)),
        };
        info!(hunt = %paths.name, ?report, "hunt deleted");
        Ok(report)
    }

    /// Names of the immediate subdirectories of the hunts root, sorted.
    pub fn hunts(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                HuntError::HuntsRootMissing(self.root.display().to_string())
            } else {
                e.into()
            }
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            if entry.path().is_dir() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

fn contains_id(content: &str, id: &str) -> bool {
    record::decode_all(content).any(|t| t.id == id)
}

fn ensure_hunt_dir(root: &Path, paths: &HuntPaths) -> Result<()> {
    for dir in [root, paths.dir.as_path()] {
        if dir.exists() && !dir.is_dir() {
            return Err(HuntError::NotADirectory(dir.display().to_string()));
        }
    }
    fs::create_dir_all(&paths.dir)?;
    Ok(())
}

fn append_audit_line(log: &Path, treasure: &Treasure) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(log)?;
    let line = format!(
        "Added treasure with ID {} by user {}\n",
        treasure.id, treasure.username
    );
    file.write_all(line.as_bytes())?;
    file.flush()
}

fn read_records(paths: &HuntPaths) -> Result<String> {
    read_lossy(&paths.records).map_err(|e| not_found_as_hunt(e, paths))
}

/// Read a file as text, replacing invalid UTF-8 rather than failing.
pub(crate) fn read_lossy(path: &Path) -> io::Result<String> {
    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn not_found_as_hunt(e: io::Error, paths: &HuntPaths) -> HuntError {
    if e.kind() == io::ErrorKind::NotFound {
        HuntError::HuntNotFound(paths.name.clone())
    } else {
        e.into()
    }
}

fn best_effort(what: &str, path: &Path, op: impl FnOnce(&Path) -> io::Result<()>) -> bool {
    match op(path) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "{what} already absent");
            false
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to remove {what}");
            false
        }
    }
}
