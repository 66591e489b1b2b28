use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::HubConfig;
use crate::error::{HuntError, Result};
use crate::monitor::mailbox::{CommandChannel, Mailbox};
use crate::monitor::relay::OutputRelay;

/// How long to wait for the monitor's last output once it has exited.
const TRAILING_OUTPUT_WAIT: Duration = Duration::from_millis(500);
const WAIT_POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Stopped,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { pid: u32 },
    AlreadyRunning { pid: u32 },
}

/// How a monitor process ended, plus anything it printed on the way out.
#[derive(Debug)]
pub struct MonitorExit {
    pub pid: u32,
    pub status: ExitStatus,
    pub trailing_output: Vec<u8>,
}

struct RunningMonitor {
    child: Child,
    channel: CommandChannel,
    relay: OutputRelay,
}

enum State {
    Stopped,
    Running(RunningMonitor),
}

/// Owns the monitor process and both ends of its plumbing.
///
/// The monitor is `program` re-executed with the hidden `monitor` role. Exit
/// is detected by polling the owned child handle at the start of every
/// operation, so a command is never sent to a monitor already known dead.
pub struct Supervisor {
    config: HubConfig,
    program: PathBuf,
    state: State,
    exited: Option<MonitorExit>,
}

impl Supervisor {
    pub fn new(config: HubConfig, program: impl Into<PathBuf>) -> Self {
        Self {
            config,
            program: program.into(),
            state: State::Stopped,
            exited: None,
        }
    }

    /// Supervise a copy of the running executable.
    pub fn for_current_exe(config: HubConfig) -> Result<Self> {
        Ok(Self::new(config, std::env::current_exe()?))
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// State as last observed. Call `reap` first for a fresh answer.
    pub fn state(&self) -> MonitorState {
        match self.state {
            State::Stopped => MonitorState::Stopped,
            State::Running(_) => MonitorState::Running,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        match &self.state {
            State::Running(m) => Some(m.child.id()),
            State::Stopped => None,
        }
    }

    pub fn start(&mut self) -> Result<StartOutcome> {
        self.refresh()?;
        if let State::Running(m) = &self.state {
            return Ok(StartOutcome::AlreadyRunning { pid: m.child.id() });
        }

        let mailbox = Mailbox::open(&self.config.mailbox_dir);
        mailbox.create()?;

        let mut child = Command::new(&self.program)
            .arg("--hunts-dir")
            .arg(&self.config.hunts_dir)
            .arg("--mailbox-dir")
            .arg(&self.config.mailbox_dir)
            .arg("monitor")
            .arg("--poll-ms")
            .arg(self.config.poll_interval.as_millis().to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(HuntError::MonitorSpawn)?;

        let pid = child.id();
        let wake: Option<Box<dyn std::io::Write + Send>> = child
            .stdin
            .take()
            .map(|stdin: ChildStdin| Box::new(stdin) as Box<dyn std::io::Write + Send>);
        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(HuntError::MonitorSpawn(std::io::Error::other(
                "monitor stdout was not captured",
            )));
        };

        self.state = State::Running(RunningMonitor {
            child,
            channel: CommandChannel::new(mailbox, wake),
            relay: OutputRelay::spawn(stdout),
        });
        info!(pid, program = %self.program.display(), "monitor started");
        Ok(StartOutcome::Started { pid })
    }

    /// Ask the monitor to stop. Returns once the request is written; the exit
    /// itself shows up later through `reap` or `wait`.
    pub fn stop(&mut self) -> Result<()> {
        let monitor = self.running()?;
        monitor.channel.send("stop", None)?;
        debug!(pid = monitor.child.id(), "stop requested");
        Ok(())
    }

    /// Send one command, wait the relay delay, and return whatever output
    /// arrived. There is no acknowledgment: slow handling spills into the
    /// next drain.
    pub fn command(&mut self, name: &str, argument: Option<&str>) -> Result<Vec<u8>> {
        let delay = self.config.relay_delay;
        let monitor = self.running()?;
        monitor.channel.send(name, argument)?;
        thread::sleep(delay);
        Ok(monitor.relay.drain())
    }

    /// Non-blocking exit check. Returns the exit record once per monitor.
    pub fn reap(&mut self) -> Result<Option<MonitorExit>> {
        self.refresh()?;
        Ok(self.exited.take())
    }

    /// Block until the monitor exits or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> Result<Option<MonitorExit>> {
        let deadline = Instant::now() + timeout;
        loop {
            self.refresh()?;
            if matches!(self.state, State::Stopped) || Instant::now() >= deadline {
                return Ok(self.exited.take());
            }
            thread::sleep(WAIT_POLL);
        }
    }

    fn running(&mut self) -> Result<&mut RunningMonitor> {
        self.refresh()?;
        match &mut self.state {
            State::Running(m) => Ok(m),
            State::Stopped => Err(HuntError::MonitorNotRunning),
        }
    }

    /// Move Running -> Stopped if the child has exited.
    fn refresh(&mut self) -> Result<()> {
        let State::Running(monitor) = &mut self.state else {
            return Ok(());
        };
        let Some(status) = monitor.child.try_wait()? else {
            return Ok(());
        };

        let pid = monitor.child.id();
        let trailing_output = monitor.relay.drain_to_close(TRAILING_OUTPUT_WAIT);
        info!(pid, %status, "monitor exited");
        self.state = State::Stopped;
        self.exited = Some(MonitorExit {
            pid,
            status,
            trailing_output,
        });
        Ok(())
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if let State::Running(monitor) = &mut self.state {
            let pid = monitor.child.id();
            warn!(pid, "supervisor dropped with monitor running; killing it");
            let _ = monitor.child.kill();
            let _ = monitor.child.wait();
        }
    }
}
