use std::io::{BufRead, Write};
use std::time::Duration;

use colored::Colorize;
use tracing::{error, info};

use crate::commands::score;
use crate::error::{HuntError, Result};
use crate::monitor::supervisor::{MonitorState, StartOutcome, Supervisor};

const PROMPT: &str = "treasure_hub> ";
/// Grace period for the monitor to exit when the hub's input ends.
const SHUTDOWN_WAIT: Duration = Duration::from_secs(2);

const HELP: &str = "\
Commands:
  start_monitor                       start the background monitor
  stop_monitor                        ask the monitor to stop
  list_hunts                          list hunts (via the monitor)
  list_treasures <hunt_id>            list a hunt's treasures (via the monitor)
  view_treasure <hunt_id> <treasure>  show one treasure (via the monitor)
  calculate_score                     per-user totals for every hunt
  help                                this text
  exit                                leave (monitor must be stopped)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubCommand {
    StartMonitor,
    StopMonitor,
    ListHunts,
    ListTreasures { hunt: Option<String> },
    ViewTreasure { hunt: Option<String>, id: Option<String> },
    CalculateScore,
    Help,
    Exit,
    Empty,
    Unknown(String),
}

impl HubCommand {
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Self::Empty;
        };
        let args: Vec<String> = words.map(str::to_string).collect();
        let nullary = |cmd: Self| {
            if args.is_empty() {
                cmd
            } else {
                Self::Unknown(line.trim().to_string())
            }
        };
        match head {
            "start_monitor" => nullary(Self::StartMonitor),
            "stop_monitor" => nullary(Self::StopMonitor),
            "list_hunts" => nullary(Self::ListHunts),
            "calculate_score" => nullary(Self::CalculateScore),
            "help" => nullary(Self::Help),
            "exit" => nullary(Self::Exit),
            "list_treasures" => Self::ListTreasures {
                hunt: args.first().cloned(),
            },
            "view_treasure" => Self::ViewTreasure {
                hunt: args.first().cloned(),
                id: args.get(1).cloned(),
            },
            _ => Self::Unknown(line.trim().to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Exit,
}

/// The interactive shell. Owns the supervisor; all text goes to `out`.
pub struct Hub<W: Write> {
    supervisor: Supervisor,
    out: W,
}

impl<W: Write> Hub<W> {
    pub fn new(supervisor: Supervisor, out: W) -> Self {
        Self { supervisor, out }
    }

    pub fn supervisor(&mut self) -> &mut Supervisor {
        &mut self.supervisor
    }

    /// Read-eval loop until `exit` or end of input. Failures of a single
    /// command are printed and logged; the loop carries on. Input bytes that
    /// are not UTF-8 are replaced, never fatal.
    pub fn run(&mut self, mut input: impl BufRead) -> Result<()> {
        let mut buf = Vec::new();
        loop {
            self.report_exit()?;
            write!(self.out, "{PROMPT}")?;
            self.out.flush()?;

            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                writeln!(self.out)?;
                self.shutdown()?;
                break;
            }
            let line = String::from_utf8_lossy(&buf);

            match self.handle(HubCommand::parse(&line)) {
                Ok(Control::Continue) => {}
                Ok(Control::Exit) => break,
                Err(e) => {
                    error!(error = %e, code = e.code(), "hub command failed");
                    writeln!(self.out, "Error: {e}")?;
                }
            }
            self.out.flush()?;
        }
        self.out.flush()?;
        Ok(())
    }

    pub fn handle(&mut self, command: HubCommand) -> Result<Control> {
        match command {
            HubCommand::Empty => {}
            HubCommand::StartMonitor => match self.supervisor.start()? {
                StartOutcome::Started { .. } => writeln!(self.out, "{}", "Started monitor.".green())?,
                StartOutcome::AlreadyRunning { .. } => {
                    writeln!(self.out, "{}", "Monitor is already running.".yellow())?
                }
            },
            HubCommand::StopMonitor => match self.supervisor.stop() {
                Ok(()) => {
                    writeln!(self.out, "Sent stop command.")?;
                    let grace = self.supervisor.config().relay_delay;
                    if let Some(exit) = self.supervisor.wait(grace)? {
                        self.print_exit(&exit.trailing_output, exit.status.success())?;
                    }
                }
                Err(HuntError::MonitorNotRunning) => {
                    writeln!(self.out, "{}", "Monitor is not running.".yellow())?
                }
                Err(e) => return Err(e),
            },
            HubCommand::ListHunts => self.relay("list_hunts", None)?,
            HubCommand::ListTreasures { hunt: Some(hunt) } => {
                self.relay("list_treasures", Some(&hunt))?
            }
            HubCommand::ListTreasures { hunt: None } => {
                writeln!(self.out, "Usage: list_treasures <hunt_id>")?
            }
            HubCommand::ViewTreasure {
                hunt: Some(hunt),
                id: Some(id),
            } => self.relay("view_treasure", Some(&format!("{hunt} {id}")))?,
            HubCommand::ViewTreasure { .. } => {
                writeln!(self.out, "Usage: view_treasure <hunt_id> <treasure_id>")?
            }
            HubCommand::CalculateScore => {
                let hunts_root = self.supervisor.config().hunts_dir.clone();
                let program = self.supervisor.program().to_path_buf();
                match score::calculate_all(&hunts_root, &program, &mut self.out) {
                    Ok(()) => {}
                    Err(HuntError::HuntsRootMissing(_)) => {
                        writeln!(self.out, "Could not open hunts directory")?
                    }
                    Err(e) => return Err(e),
                }
            }
            HubCommand::Help => writeln!(self.out, "{HELP}")?,
            HubCommand::Exit => {
                self.report_exit()?;
                if self.supervisor.state() == MonitorState::Running {
                    writeln!(
                        self.out,
                        "{}",
                        "Monitor still running. Stop it before exiting.".yellow()
                    )?;
                } else {
                    return Ok(Control::Exit);
                }
            }
            HubCommand::Unknown(_) => writeln!(self.out, "Unknown command")?,
        }
        Ok(Control::Continue)
    }

    /// Print any exit the supervisor has observed since the last check.
    pub fn report_exit(&mut self) -> Result<()> {
        if let Some(exit) = self.supervisor.reap()? {
            self.print_exit(&exit.trailing_output, exit.status.success())?;
        }
        Ok(())
    }

    fn relay(&mut self, command: &str, argument: Option<&str>) -> Result<()> {
        match self.supervisor.command(command, argument) {
            Ok(bytes) => self.out.write_all(&bytes)?,
            Err(HuntError::MonitorNotRunning) => {
                writeln!(self.out, "{}", "Monitor is not running.".yellow())?
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn print_exit(&mut self, trailing: &[u8], clean: bool) -> Result<()> {
        self.out.write_all(trailing)?;
        if clean {
            writeln!(self.out, "{}", "Monitor exited".cyan())?;
        } else {
            writeln!(self.out, "{}", "Monitor exited abnormally".red())?;
        }
        Ok(())
    }

    /// End of input: stop a running monitor and give it a moment to go.
    fn shutdown(&mut self) -> Result<()> {
        self.report_exit()?;
        if self.supervisor.state() == MonitorState::Running {
            info!("input closed with monitor running; stopping it");
            self.supervisor.stop()?;
            if let Some(exit) = self.supervisor.wait(SHUTDOWN_WAIT)? {
                self.print_exit(&exit.trailing_output, exit.status.success())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HubConfig;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn parse_recognizes_every_command() {
        assert_eq!(HubCommand::parse("start_monitor"), HubCommand::StartMonitor);
        assert_eq!(HubCommand::parse("  stop_monitor "), HubCommand::StopMonitor);
        assert_eq!(HubCommand::parse("list_hunts"), HubCommand::ListHunts);
        assert_eq!(
            HubCommand::parse("list_treasures expedition"),
            HubCommand::ListTreasures {
                hunt: Some("expedition".into())
            }
        );
        assert_eq!(
            HubCommand::parse("view_treasure expedition T1"),
            HubCommand::ViewTreasure {
                hunt: Some("expedition".into()),
                id: Some("T1".into())
            }
        );
        assert_eq!(HubCommand::parse("calculate_score"), HubCommand::CalculateScore);
        assert_eq!(HubCommand::parse("exit"), HubCommand::Exit);
        assert_eq!(HubCommand::parse(""), HubCommand::Empty);
        assert_eq!(
            HubCommand::parse("exit now"),
            HubCommand::Unknown("exit now".into())
        );
        assert_eq!(HubCommand::parse("fly"), HubCommand::Unknown("fly".into()));
    }

    fn hub(dir: &std::path::Path) -> Hub<Vec<u8>> {
        let config = HubConfig {
            hunts_dir: dir.join("hunts"),
            mailbox_dir: dir.to_path_buf(),
            poll_interval: Duration::from_millis(20),
            relay_delay: Duration::from_millis(20),
        };
        // Never started in these tests, so the program is never executed.
        Hub::new(Supervisor::new(config, "/nonexistent/treasure_hub"), Vec::new())
    }

    #[test]
    fn monitor_commands_without_monitor() {
        colored::control::set_override(false);
        let dir = tempdir().unwrap();
        let mut hub = hub(dir.path());
        let script = "list_hunts\nstop_monitor\nlist_treasures\nview_treasure h\nbogus\nexit\n";
        hub.run(Cursor::new(script)).unwrap();

        let text = String::from_utf8(hub.out.clone()).unwrap();
        assert_eq!(text.matches("Monitor is not running.").count(), 2);
        assert!(text.contains("Usage: list_treasures <hunt_id>"));
        assert!(text.contains("Usage: view_treasure <hunt_id> <treasure_id>"));
        assert!(text.contains("Unknown command"));
        assert_eq!(text.matches(PROMPT).count(), 6);
    }

    #[test]
    fn start_failure_is_reported_and_loop_continues() {
        colored::control::set_override(false);
        let dir = tempdir().unwrap();
        let mut hub = hub(dir.path());
        hub.run(Cursor::new("start_monitor\nhelp\n")).unwrap();

        let text = String::from_utf8(hub.out.clone()).unwrap();
        assert!(text.contains("Error: failed to spawn monitor"));
        assert!(text.contains("calculate_score"));
        assert_eq!(hub.supervisor().state(), MonitorState::Stopped);
    }

    #[test]
    fn invalid_utf8_line_is_an_unknown_command() {
        colored::control::set_override(false);
        let dir = tempdir().unwrap();
        let mut hub = hub(dir.path());
        hub.run(Cursor::new(b"bogus\n\xff\xfe\nhelp\nexit\n".to_vec()))
            .unwrap();

        let text = String::from_utf8(hub.out.clone()).unwrap();
        assert_eq!(text.matches("Unknown command").count(), 2);
        assert!(text.contains("calculate_score"));
        assert_eq!(text.matches(PROMPT).count(), 4);
    }

    #[test]
    fn calculate_score_without_hunts_root() {
        colored::control::set_override(false);
        let dir = tempdir().unwrap();
        let mut hub = hub(dir.path());
        hub.handle(HubCommand::CalculateScore).unwrap();
        let text = String::from_utf8(hub.out.clone()).unwrap();
        assert_eq!(text, "Could not open hunts directory\n");
    }
}
