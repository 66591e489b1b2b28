use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::commands::hub::Hub;
use crate::commands::score;
use crate::config::HubConfig;
use crate::error::Result;
use crate::logging::init_logging;
use crate::monitor::mailbox::Mailbox;
use crate::monitor::supervisor::Supervisor;
use crate::monitor::worker::{MonitorLoop, spawn_wake_listener};
use crate::output::Format;
use crate::store::files::TreasureStore;

#[derive(Parser, Debug)]
#[command(
    name = "treasure_hub",
    version,
    about = "Interactive shell over a background treasure monitor"
)]
pub struct HubCli {
    /// Root directory holding one directory per hunt
    #[arg(long, global = true)]
    hunts_dir: Option<PathBuf>,
    /// Directory of the monitor mailbox files
    #[arg(long, global = true)]
    mailbox_dir: Option<PathBuf>,
    /// Milliseconds to wait for monitor output after each command
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..=60_000))]
    relay_delay_ms: Option<u64>,
    #[command(subcommand)]
    role: Option<Role>,
}

/// Internal roles; the hub re-executes itself to run them.
#[derive(Subcommand, Debug)]
enum Role {
    /// Background monitor serving the mailbox
    #[command(hide = true)]
    Monitor {
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=60_000))]
        poll_ms: Option<u64>,
    },
    /// Score a single hunt directory
    #[command(hide = true)]
    Score {
        hunt_dir: PathBuf,
        #[arg(long, value_enum, default_value = "pretty")]
        format: Format,
    },
}

impl HubCli {
    /// Environment config with command-line overrides applied.
    pub fn config(&self) -> Result<HubConfig> {
        let mut config = HubConfig::from_env()?;
        if let Some(dir) = &self.hunts_dir {
            config.hunts_dir = dir.clone();
        }
        if let Some(dir) = &self.mailbox_dir {
            config.mailbox_dir = dir.clone();
        }
        if let Some(ms) = self.relay_delay_ms {
            config.relay_delay = Duration::from_millis(ms);
        }
        if let Some(Role::Monitor { poll_ms: Some(ms) }) = &self.role {
            config.poll_interval = Duration::from_millis(*ms);
        }
        Ok(config)
    }
}

fn run(cli: &HubCli) -> Result<()> {
    let config = cli.config()?;
    match &cli.role {
        None => {
            let supervisor = Supervisor::for_current_exe(config)?;
            let mut hub = Hub::new(supervisor, io::stdout());
            hub.run(io::stdin().lock())
        }
        Some(Role::Monitor { .. }) => run_monitor(config),
        Some(Role::Score { hunt_dir, format }) => {
            score::run(hunt_dir, *format, &mut io::stdout().lock())
        }
    }
}

fn run_monitor(config: HubConfig) -> Result<()> {
    info!(pid = std::process::id(), "monitor role");
    let wake = spawn_wake_listener(io::stdin());
    let mut worker = MonitorLoop::new(
        Mailbox::open(&config.mailbox_dir),
        TreasureStore::open(&config.hunts_dir),
        io::stdout().lock(),
        config.poll_interval,
    );
    worker.run(&wake)
}

pub fn run_cli() -> i32 {
    init_logging();
    let cli = match HubCli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return super::clap_exit(e),
    };
    let format = match &cli.role {
        Some(Role::Score { format, .. }) => *format,
        _ => Format::Pretty,
    };
    super::finish(run(&cli), format)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> HubCli {
        HubCli::try_parse_from(std::iter::once("treasure_hub").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn flags_override_config() {
        let cli = parse(&[
            "--hunts-dir",
            "/tmp/h",
            "--mailbox-dir",
            "/tmp/m",
            "monitor",
            "--poll-ms",
            "25",
        ]);
        let config = cli.config().unwrap();
        assert_eq!(config.hunts_dir, PathBuf::from("/tmp/h"));
        assert_eq!(config.mailbox_dir, PathBuf::from("/tmp/m"));
        assert_eq!(config.poll_interval, Duration::from_millis(25));
    }

    #[test]
    fn no_role_means_interactive() {
        let cli = parse(&["--relay-delay-ms", "10"]);
        assert!(cli.role.is_none());
        assert_eq!(cli.config().unwrap().relay_delay, Duration::from_millis(10));
    }

    #[test]
    fn poll_interval_is_bounded() {
        let err = HubCli::try_parse_from(["treasure_hub", "monitor", "--poll-ms", "0"]);
        assert!(err.is_err());
    }
}
