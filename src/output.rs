use std::io::Write;

use clap::ValueEnum;
use serde_json::json;

use crate::error::{HuntError, Result};
use crate::model::{ScoreEntry, Treasure};
use crate::store::files::{DeleteReport, HuntListing};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Pretty,
}

/// `ctime(3)`-style timestamp used by the listing header.
pub const CTIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

pub fn write_treasure(out: &mut impl Write, treasure: &Treasure, format: Format) -> Result<()> {
    match format {
        Format::Json => writeln!(out, "{}", serde_json::to_string(treasure)?)?,
        Format::Pretty => {
            writeln!(out, "Treasure Details:")?;
            writeln!(out, "Treasure ID: {}", treasure.id)?;
            writeln!(out, "User: {}", treasure.username)?;
            writeln!(out, "Longitude: {:.4}", treasure.longitude)?;
            writeln!(out, "Latitude: {:.4}", treasure.latitude)?;
            writeln!(out, "Clue: {}", treasure.clue)?;
            writeln!(out, "Value: {}", treasure.value)?;
        }
    }
    Ok(())
}

pub fn write_listing(out: &mut impl Write, listing: &HuntListing, format: Format) -> Result<()> {
    match format {
        Format::Json => {
            let value = json!({
                "hunt": listing.hunt,
                "size": listing.size,
                "modified": listing.modified.to_rfc3339(),
                "content": String::from_utf8_lossy(&listing.content),
            });
            writeln!(out, "{}", serde_json::to_string(&value)?)?;
        }
        Format::Pretty => {
            writeln!(out, "Hunt: {}", listing.hunt)?;
            writeln!(out, "Total File Size: {} bytes", listing.size)?;
            writeln!(
                out,
                "Last Modification Time: {}",
                listing.modified.format(CTIME_FORMAT)
            )?;
            out.write_all(&listing.content)?;
        }
    }
    Ok(())
}

pub fn write_added(out: &mut impl Write, hunt: &str, treasure: &Treasure, format: Format) -> Result<()> {
    match format {
        Format::Json => {
            let value = json!({ "hunt": hunt, "added": treasure });
            writeln!(out, "{}", serde_json::to_string(&value)?)?;
        }
        Format::Pretty => writeln!(out, "Treasure {} added to hunt {}.", treasure.id, hunt)?,
    }
    Ok(())
}

pub fn write_removed(out: &mut impl Write, hunt: &str, treasure: &Treasure, format: Format) -> Result<()> {
    match format {
        Format::Json => {
            let value = json!({ "hunt": hunt, "removed": treasure });
            writeln!(out, "{}", serde_json::to_string(&value)?)?;
        }
        Format::Pretty => writeln!(out, "Treasure removed.")?,
    }
    Ok(())
}

pub fn write_hunt_deleted(
    out: &mut impl Write,
    hunt: &str,
    report: &DeleteReport,
    format: Format,
) -> Result<()> {
    match format {
        Format::Json => {
            let value = json!({
                "hunt": hunt,
                "records_removed": report.records_removed,
                "log_removed": report.log_removed,
                "dir_removed": report.dir_removed,
            });
            writeln!(out, "{}", serde_json::to_string(&value)?)?;
        }
        Format::Pretty => writeln!(out, "Hunt removed.")?,
    }
    Ok(())
}

pub fn write_scores(out: &mut impl Write, entries: &[ScoreEntry], format: Format) -> Result<()> {
    match format {
        Format::Json => writeln!(out, "{}", serde_json::to_string(entries)?)?,
        Format::Pretty => out.write_all(crate::score::render(entries).as_bytes())?,
    }
    Ok(())
}

/// Report a failed command on stderr in the selected format.
pub fn print_error(err: &HuntError, format: Format) {
    match format {
        Format::Json => {
            eprintln!(
                "{}",
                json!({
                    "error": err.code(),
                    "message": err.to_string()
                })
            );
        }
        Format::Pretty => eprintln!("error: {err}"),
    }
}
