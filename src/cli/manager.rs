use std::io::{self, Write};
use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use crate::commands::treasure;
use crate::error::{HuntError, Result};
use crate::logging::init_logging;
use crate::model::Treasure;
use crate::output::Format;

#[derive(Parser, Debug)]
#[command(
    name = "treasure_manager",
    version,
    about = "Add, list, view and remove treasures in a hunt"
)]
#[command(group(
    ArgGroup::new("operation")
        .required(true)
        .args(["add", "list", "view", "remove", "delete_hunt"])
))]
pub struct ManagerCli {
    /// Add a treasure (negative coordinates are accepted as values)
    #[arg(
        long,
        num_args = 7,
        allow_hyphen_values = true,
        value_names = ["HUNT", "ID", "USER", "LON", "LAT", "CLUE", "VALUE"]
    )]
    add: Option<Vec<String>>,
    /// Print a hunt's header and raw records
    #[arg(long, value_name = "HUNT")]
    list: Option<String>,
    /// Show one treasure
    #[arg(long, num_args = 2, value_names = ["HUNT", "ID"])]
    view: Option<Vec<String>>,
    /// Remove one treasure
    #[arg(long, num_args = 2, value_names = ["HUNT", "ID"])]
    remove: Option<Vec<String>>,
    /// Delete a hunt's files and its directory
    #[arg(long, value_name = "HUNT")]
    delete_hunt: Option<String>,
    /// Output format
    #[arg(long, value_enum, default_value = "pretty")]
    format: Format,
    /// Root directory holding one directory per hunt
    #[arg(long, env = "TREASURE_HUNTS_DIR", default_value = "hunts")]
    hunts_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Add { hunt: String, treasure: Treasure },
    List { hunt: String },
    View { hunt: String, id: String },
    Remove { hunt: String, id: String },
    DeleteHunt { hunt: String },
}

impl ManagerCli {
    pub fn format(&self) -> Format {
        self.format
    }

    /// The selected operation with numeric fields parsed strictly.
    pub fn operation(&self) -> Result<Operation> {
        if let Some(args) = &self.add {
            let [hunt, id, user, lon, lat, clue, value] = args.as_slice() else {
                return Err(HuntError::Usage("--add takes 7 values".into()));
            };
            let treasure = Treasure::new(
                id.as_str(),
                user.as_str(),
                parse_coordinate("longitude", lon)?,
                parse_coordinate("latitude", lat)?,
                clue.as_str(),
                parse_value(value)?,
            );
            return Ok(Operation::Add {
                hunt: hunt.clone(),
                treasure,
            });
        }
        if let Some(hunt) = &self.list {
            return Ok(Operation::List { hunt: hunt.clone() });
        }
        if let Some((hunt, id)) = pair(self.view.as_deref()) {
            return Ok(Operation::View { hunt, id });
        }
        if let Some((hunt, id)) = pair(self.remove.as_deref()) {
            return Ok(Operation::Remove { hunt, id });
        }
        if let Some(hunt) = &self.delete_hunt {
            return Ok(Operation::DeleteHunt { hunt: hunt.clone() });
        }
        Err(HuntError::Usage("no operation given".into()))
    }
}

fn pair(values: Option<&[String]>) -> Option<(String, String)> {
    match values? {
        [a, b] => Some((a.clone(), b.clone())),
        _ => None,
    }
}

fn parse_coordinate(field: &'static str, raw: &str) -> Result<f64> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(HuntError::InvalidField {
            field,
            reason: format!("'{raw}' is not a number"),
        }),
    }
}

fn parse_value(raw: &str) -> Result<i64> {
    raw.trim().parse().map_err(|_| HuntError::InvalidField {
        field: "value",
        reason: format!("'{raw}' is not an integer"),
    })
}

pub fn run(cli: &ManagerCli, out: &mut impl Write) -> Result<()> {
    let root = cli.hunts_dir.as_path();
    let format = cli.format;
    match cli.operation()? {
        Operation::Add { hunt, treasure } => treasure::add(root, &hunt, treasure, format, out),
        Operation::List { hunt } => treasure::list(root, &hunt, format, out),
        Operation::View { hunt, id } => treasure::view(root, &hunt, &id, format, out),
        Operation::Remove { hunt, id } => treasure::remove(root, &hunt, &id, format, out),
        Operation::DeleteHunt { hunt } => treasure::delete_hunt(root, &hunt, format, out),
    }
}

pub fn run_cli() -> i32 {
    init_logging();
    let cli = match ManagerCli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return super::clap_exit(e),
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    super::finish(run(&cli, &mut out), cli.format())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<ManagerCli, clap::Error> {
        ManagerCli::try_parse_from(std::iter::once("treasure_manager").chain(args.iter().copied()))
    }

    #[test]
    fn add_accepts_negative_coordinates() {
        let cli = parse(&[
            "--add", "h", "T1", "alice", "-12.5", "-45.25", "under the oak", "-3",
        ])
        .unwrap();
        let Operation::Add { hunt, treasure } = cli.operation().unwrap() else {
            panic!("expected add");
        };
        assert_eq!(hunt, "h");
        assert_eq!(treasure.longitude, -12.5);
        assert_eq!(treasure.latitude, -45.25);
        assert_eq!(treasure.clue, "under the oak");
        assert_eq!(treasure.value, -3);
    }

    #[test]
    fn add_rejects_non_numeric_fields() {
        let cli = parse(&["--add", "h", "T1", "a", "east", "1", "c", "1"]).unwrap();
        let err = cli.operation().unwrap_err();
        assert!(matches!(err, HuntError::InvalidField { field: "longitude", .. }));

        let cli = parse(&["--add", "h", "T1", "a", "1", "1", "c", "1.5"]).unwrap();
        let err = cli.operation().unwrap_err();
        assert!(matches!(err, HuntError::InvalidField { field: "value", .. }));
    }

    #[test]
    fn exactly_one_operation() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["--list", "a", "--delete-hunt", "b"]).is_err());
        assert!(parse(&["--view", "only-hunt"]).is_err());

        let cli = parse(&["--remove", "h", "T9", "--format", "json"]).unwrap();
        assert_eq!(cli.format(), Format::Json);
        assert_eq!(
            cli.operation().unwrap(),
            Operation::Remove {
                hunt: "h".into(),
                id: "T9".into()
            }
        );
    }
}
