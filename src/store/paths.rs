use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::model::validate_hunt_name;

pub const TREASURE_FILE: &str = "treasure.dat";
pub const LOG_FILE: &str = "logged_hunt";

/// Resolved file locations for one hunt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuntPaths {
    pub name: String,
    pub dir: PathBuf,
    pub records: PathBuf,
    pub log: PathBuf,
}

impl HuntPaths {
    pub fn resolve(hunts_root: &Path, name: &str) -> Result<Self> {
        validate_hunt_name(name)?;
        let dir = hunts_root.join(name);
        Ok(Self::in_dir(name, dir))
    }

    /// Paths for a hunt directory given directly (the score tool takes a
    /// directory, not a name).
    pub fn from_dir(dir: &Path) -> Self {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());
        Self::in_dir(&name, dir.to_path_buf())
    }

    fn in_dir(name: &str, dir: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            records: dir.join(TREASURE_FILE),
            log: dir.join(LOG_FILE),
            dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_under_root() {
        let paths = HuntPaths::resolve(Path::new("hunts"), "expedition").unwrap();
        assert_eq!(paths.dir, PathBuf::from("hunts/expedition"));
        assert_eq!(paths.records, PathBuf::from("hunts/expedition/treasure.dat"));
        assert_eq!(paths.log, PathBuf::from("hunts/expedition/logged_hunt"));
    }

    #[test]
    fn rejects_traversal() {
        assert!(HuntPaths::resolve(Path::new("hunts"), "../etc").is_err());
    }

    #[test]
    fn from_dir_takes_last_component_as_name() {
        let paths = HuntPaths::from_dir(Path::new("hunts/Hunt01"));
        assert_eq!(paths.name, "Hunt01");
        assert_eq!(paths.records, PathBuf::from("hunts/Hunt01/treasure.dat"));
    }
}
