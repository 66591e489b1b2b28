use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::error::{HuntError, Result};
use crate::output::{self, Format};
use crate::score;
use crate::store::files::TreasureStore;
use crate::store::paths::HuntPaths;

/// Aggregate one hunt directory and print its scores.
pub fn run(hunt_dir: &Path, format: Format, out: &mut impl Write) -> Result<()> {
    let paths = HuntPaths::from_dir(hunt_dir);
    let entries = score::aggregate_file(&paths.records).map_err(|e| match e {
        HuntError::Io(io) if io.kind() == io::ErrorKind::NotFound => {
            HuntError::HuntNotFound(paths.name.clone())
        }
        other => other,
    })?;
    output::write_scores(out, &entries, format)
}

/// Score every hunt, one child process per hunt, strictly one after another.
///
/// `program` is re-executed as `<program> score <hunt_dir>`. A failing child
/// is reported under its hunt heading and the sweep moves on.
pub fn calculate_all(hunts_root: &Path, program: &Path, out: &mut impl Write) -> Result<()> {
    let store = TreasureStore::open(hunts_root);
    for hunt in store.hunts()? {
        let hunt_dir = hunts_root.join(&hunt);
        writeln!(out, "Scores for hunt {hunt}:")?;

        let child = Command::new(program)
            .arg("score")
            .arg(&hunt_dir)
            .stdin(Stdio::null())
            .output();
        match child {
            Ok(result) => {
                out.write_all(&result.stdout)?;
                if !result.status.success() {
                    warn!(hunt = %hunt, status = %result.status, "score child failed");
                    out.write_all(&result.stderr)?;
                }
                debug!(hunt = %hunt, status = %result.status, "score child finished");
            }
            Err(e) => {
                warn!(hunt = %hunt, error = %e, "could not spawn score child");
                writeln!(out, "Error: could not run scorer: {e}")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}
