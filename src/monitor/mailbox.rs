//! Single-slot command mailbox shared by the hub and the monitor.
//!
//! A message is two plain-text files, `monitor_cmd.txt` and
//! `monitor_args.txt`, truncated on every write. Reads and writes take an
//! exclusive lock on `monitor.lock`, so the monitor never sees a command
//! paired with a stale argument.
//!
//! This is a slot, not a queue: a second `send` before the monitor has
//! consumed the first overwrites it and the first message is lost. Callers
//! must wait for the monitor to clear the slot before sending again.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::store::lock;

pub const CMD_FILE: &str = "monitor_cmd.txt";
pub const ARG_FILE: &str = "monitor_args.txt";
pub const LOCK_FILE: &str = "monitor.lock";

/// Bytes read from each mailbox file; anything longer is cut.
const MAX_FIELD_BYTES: u64 = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Stop,
    ListHunts,
    ListTreasures,
    ViewTreasure,
    Other(String),
}

impl Command {
    /// Parse a command token. An empty token is "no message".
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        let cmd = match token {
            "" => return None,
            "stop" => Self::Stop,
            "list_hunts" => Self::ListHunts,
            "list_treasures" => Self::ListTreasures,
            "view_treasure" => Self::ViewTreasure,
            other => Self::Other(other.to_string()),
        };
        Some(cmd)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Stop => "stop",
            Self::ListHunts => "list_hunts",
            Self::ListTreasures => "list_treasures",
            Self::ViewTreasure => "view_treasure",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub command: Command,
    pub argument: Option<String>,
}

pub struct Mailbox {
    dir: PathBuf,
}

impl Mailbox {
    pub fn open(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Create the directory and both files, empty.
    pub fn create(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        self.clear()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn cmd_path(&self) -> PathBuf {
        self.dir.join(CMD_FILE)
    }

    fn arg_path(&self) -> PathBuf {
        self.dir.join(ARG_FILE)
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }

    /// Overwrite the slot. An absent argument leaves the argument file empty.
    pub fn write(&self, command: &str, argument: Option<&str>) -> Result<()> {
        let guard = lock::acquire_lock(&self.lock_path())?;
        overwrite(&self.cmd_path(), command.as_bytes())?;
        overwrite(&self.arg_path(), argument.unwrap_or("").as_bytes())?;
        lock::release_lock(guard)?;
        debug!(command, ?argument, "mailbox written");
        Ok(())
    }

    /// Read the slot without consuming it. Missing files read as empty.
    pub fn read(&self) -> Result<Option<Message>> {
        let guard = lock::acquire_lock(&self.lock_path())?;
        let command = read_field(&self.cmd_path())?;
        let argument = read_field(&self.arg_path())?;
        lock::release_lock(guard)?;

        Ok(Command::parse(&command).map(|command| Message {
            command,
            argument: Some(argument.trim().to_string()).filter(|a| !a.is_empty()),
        }))
    }

    /// Truncate both files. Idempotent.
    pub fn clear(&self) -> Result<()> {
        let guard = lock::acquire_lock(&self.lock_path())?;
        overwrite(&self.cmd_path(), b"")?;
        overwrite(&self.arg_path(), b"")?;
        lock::release_lock(guard)?;
        Ok(())
    }
}

/// Mailbox plus the wake line to the monitor. Owned by the supervisor.
pub struct CommandChannel {
    mailbox: Mailbox,
    wake: Option<Box<dyn Write + Send>>,
}

impl CommandChannel {
    pub fn new(mailbox: Mailbox, wake: Option<Box<dyn Write + Send>>) -> Self {
        Self { mailbox, wake }
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Write the message, then nudge the monitor. The nudge is best-effort:
    /// a broken wake line is dropped and the monitor falls back to polling.
    pub fn send(&mut self, command: &str, argument: Option<&str>) -> Result<()> {
        self.mailbox.write(command, argument)?;
        if let Some(wake) = self.wake.as_mut()
            && let Err(e) = wake.write_all(b"\n").and_then(|()| wake.flush())
        {
            debug!(error = %e, "wake line closed; monitor will poll");
            self.wake = None;
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.mailbox.clear()
    }
}

fn overwrite(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(bytes)?;
    file.flush()
}

/// First line of the file, at most `MAX_FIELD_BYTES` bytes.
fn read_field(path: &Path) -> io::Result<String> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(String::new()),
        Err(e) => return Err(e),
    };
    let mut bytes = Vec::new();
    file.take(MAX_FIELD_BYTES).read_to_end(&mut bytes)?;
    let text = String::from_utf8_lossy(&bytes);
    let first = text.split('\n').next().unwrap_or("");
    Ok(first.trim_end_matches('\r').to_string())
}
