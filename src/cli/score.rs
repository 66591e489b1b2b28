use std::io;
use std::path::PathBuf;

use clap::Parser;

use crate::commands::score;
use crate::logging::init_logging;
use crate::output::Format;

#[derive(Parser, Debug)]
#[command(
    name = "score_calculator",
    version,
    about = "Sum treasure values per user for one hunt directory"
)]
pub struct ScoreCli {
    /// Hunt directory containing treasure.dat
    hunt_dir: PathBuf,
    /// Output format
    #[arg(long, value_enum, default_value = "pretty")]
    format: Format,
}

pub fn run_cli() -> i32 {
    init_logging();
    let cli = match ScoreCli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return super::clap_exit(e),
    };
    let result = score::run(&cli.hunt_dir, cli.format, &mut io::stdout().lock());
    super::finish(result, cli.format)
}
