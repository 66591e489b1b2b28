use std::io::Write;
use std::path::Path;

use crate::error::{HuntError, Result};
use crate::model::Treasure;
use crate::output::{self, Format};
use crate::store::files::TreasureStore;

pub fn add(
    hunts_root: &Path,
    hunt: &str,
    treasure: Treasure,
    format: Format,
    out: &mut impl Write,
) -> Result<()> {
    let store = TreasureStore::open(hunts_root);
    let stored = store.add(hunt, treasure)?;
    output::write_added(out, hunt, &stored, format)
}

pub fn list(hunts_root: &Path, hunt: &str, format: Format, out: &mut impl Write) -> Result<()> {
    let store = TreasureStore::open(hunts_root);
    let listing = store.list(hunt)?;
    output::write_listing(out, &listing, format)
}

pub fn view(
    hunts_root: &Path,
    hunt: &str,
    id: &str,
    format: Format,
    out: &mut impl Write,
) -> Result<()> {
    let store = TreasureStore::open(hunts_root);
    let treasure = store.view(hunt, id)?;
    output::write_treasure(out, &treasure, format)
}

pub fn remove(
    hunts_root: &Path,
    hunt: &str,
    id: &str,
    format: Format,
    out: &mut impl Write,
) -> Result<()> {
    let store = TreasureStore::open(hunts_root);
    let removed = store.remove(hunt, id)?;
    output::write_removed(out, hunt, &removed, format)
}

/// Deleting a hunt that left nothing to delete is reported as not found;
/// partial removals still succeed.
pub fn delete_hunt(
    hunts_root: &Path,
    hunt: &str,
    format: Format,
    out: &mut impl Write,
) -> Result<()> {
    let store = TreasureStore::open(hunts_root);
    let report = store.delete_hunt(hunt)?;
    if !report.removed_anything() {
        return Err(HuntError::HuntNotFound(hunt.to_string()));
    }
    output::write_hunt_deleted(out, hunt, &report, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn text(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn add_view_remove_cycle() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut out = Vec::new();

        add(
            root,
            "expedition",
            Treasure::new("T1", "alice", 12.5, 45.2, "under the oak", 100),
            Format::Pretty,
            &mut out,
        )
        .unwrap();
        view(root, "expedition", "T1", Format::Pretty, &mut out).unwrap();
        remove(root, "expedition", "T1", Format::Pretty, &mut out).unwrap();

        let text = text(out);
        assert!(text.contains("Treasure T1 added to hunt expedition."));
        assert!(text.contains("Clue: under_the_oak"));
        assert!(text.ends_with("Treasure removed.\n"));

        let err = view(root, "expedition", "T1", Format::Pretty, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, HuntError::TreasureNotFound { .. }));
    }

    #[test]
    fn delete_hunt_reports_missing_hunt() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let err = delete_hunt(root, "ghost", Format::Pretty, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, HuntError::HuntNotFound(_)));

        add(
            root,
            "h",
            Treasure::new("T1", "a", 0.0, 0.0, "c", 1),
            Format::Json,
            &mut Vec::new(),
        )
        .unwrap();
        let mut out = Vec::new();
        delete_hunt(root, "h", Format::Json, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_str(text(out).trim()).unwrap();
        assert_eq!(value["dir_removed"], true);
        assert!(!root.join("h").exists());
    }
}
