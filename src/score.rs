//! Per-hunt score aggregation.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::Result;
use crate::model::ScoreEntry;
use crate::store::record;

/// Running per-username totals that remember first-encounter order.
#[derive(Debug, Default)]
pub struct ScoreBoard {
    entries: Vec<ScoreEntry>,
    index: HashMap<String, usize>,
}

impl ScoreBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, username: &str, value: i64) {
        match self.index.get(username) {
            Some(&i) => {
                let entry = &mut self.entries[i];
                entry.total = entry.total.saturating_add(value);
            }
            None => {
                self.index.insert(username.to_string(), self.entries.len());
                self.entries.push(ScoreEntry {
                    username: username.to_string(),
                    total: value,
                });
            }
        }
    }

    pub fn into_entries(self) -> Vec<ScoreEntry> {
        self.entries
    }
}

/// Stream a record file and sum values per username. Rows that do not decode
/// are skipped.
pub fn aggregate_file(records: &Path) -> Result<Vec<ScoreEntry>> {
    let reader = BufReader::new(File::open(records)?);
    let mut board = ScoreBoard::new();
    for line in reader.split(b'\n') {
        let line = line?;
        if let Some(t) = record::decode(&String::from_utf8_lossy(&line)) {
            board.record(&t.username, t.value);
        }
    }
    Ok(board.into_entries())
}

/// `<username> <total>` lines, one per entry.
pub fn render(entries: &[ScoreEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{} {}\n", e.username, e.total))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn totals_follow_first_encounter_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("treasure.dat");
        fs::write(
            &path,
            "T1 zed 0 0 c 10\nT2 amy 0 0 c 5\nbroken\nT3 zed 0 0 c -3\nT4 bob 0 0 c 7\nT5 amy 0 0 c 1\n",
        )
        .unwrap();

        let entries = aggregate_file(&path).unwrap();
        let pairs: Vec<(&str, i64)> = entries
            .iter()
            .map(|e| (e.username.as_str(), e.total))
            .collect();
        assert_eq!(pairs, vec![("zed", 7), ("amy", 6), ("bob", 7)]);

        let sum: i64 = entries.iter().map(|e| e.total).sum();
        assert_eq!(sum, 10 + 5 - 3 + 7 + 1);
    }

    #[test]
    fn board_grows_past_any_fixed_table() {
        let mut board = ScoreBoard::new();
        for i in 0..500 {
            board.record(&format!("user{i}"), 1);
        }
        board.record("user0", 1);
        let entries = board.into_entries();
        assert_eq!(entries.len(), 500);
        assert_eq!(entries[0].total, 2);
    }

    #[test]
    fn empty_file_has_no_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("treasure.dat");
        fs::write(&path, "").unwrap();
        assert!(aggregate_file(&path).unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(aggregate_file(&dir.path().join("absent.dat")).is_err());
    }

    #[test]
    fn render_is_one_line_per_user() {
        let entries = vec![
            ScoreEntry {
                username: "alice".into(),
                total: 100,
            },
            ScoreEntry {
                username: "bob".into(),
                total: -2,
            },
        ];
        assert_eq!(render(&entries), "alice 100\nbob -2\n");
    }
}
