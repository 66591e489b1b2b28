use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{HuntError, Result};
use crate::monitor::mailbox::{Command, Mailbox, Message};
use crate::output::{self, Format};
use crate::store::files::TreasureStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// The monitor process body: the mailbox's only reader.
///
/// Each cycle reads the slot, dispatches, clears the slot, then sleeps until
/// a wake arrives or `poll_interval` passes. The wake makes latency close to
/// zero; the interval is the fallback when no wake line is attached.
pub struct MonitorLoop<W: Write> {
    mailbox: Mailbox,
    store: TreasureStore,
    out: W,
    poll_interval: Duration,
}

impl<W: Write> MonitorLoop<W> {
    pub fn new(mailbox: Mailbox, store: TreasureStore, out: W, poll_interval: Duration) -> Self {
        Self {
            mailbox,
            store,
            out,
            poll_interval,
        }
    }

    /// Run until `stop` is read or the wake line closes.
    pub fn run(&mut self, wake: &Receiver<()>) -> Result<()> {
        info!(mailbox = %self.mailbox.dir().display(), "monitor started");
        loop {
            if self.step()? == Flow::Stop {
                break;
            }
            match wake.recv_timeout(self.poll_interval) {
                // Several wakes may have queued up; one cycle serves them all.
                Ok(()) => while wake.try_recv().is_ok() {},
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    info!("wake line closed, monitor exiting");
                    break;
                }
            }
        }
        info!("monitor stopped");
        Ok(())
    }

    /// One read-dispatch-clear cycle.
    pub fn step(&mut self) -> Result<Flow> {
        let flow = match self.mailbox.read()? {
            Some(message) => {
                debug!(command = %message.command, argument = ?message.argument, "dispatching");
                self.dispatch(&message)?
            }
            None => Flow::Continue,
        };
        self.mailbox.clear()?;
        self.out.flush()?;
        Ok(flow)
    }

    fn dispatch(&mut self, message: &Message) -> Result<Flow> {
        let arg = message.argument.as_deref();
        match (&message.command, arg) {
            (Command::Stop, _) => {
                writeln!(self.out, "[Monitor] Stopping monitor process.")?;
                return Ok(Flow::Stop);
            }
            (Command::ListHunts, _) => self.list_hunts()?,
            (Command::ListTreasures, Some(arg)) => {
                writeln!(self.out, "[Monitor] Listing treasures in {arg}")?;
                let hunt = arg.split_whitespace().next().unwrap_or(arg);
                let result = self
                    .store
                    .list(hunt)
                    .and_then(|listing| output::write_listing(&mut self.out, &listing, Format::Pretty));
                self.report(result)?;
            }
            (Command::ViewTreasure, Some(arg)) => {
                writeln!(self.out, "[Monitor] Viewing treasure: {arg}")?;
                let mut parts = arg.split_whitespace();
                match (parts.next(), parts.next()) {
                    (Some(hunt), Some(id)) => {
                        let result = match self.store.view(hunt, id) {
                            Ok(t) => output::write_treasure(&mut self.out, &t, Format::Pretty),
                            Err(HuntError::TreasureNotFound { id, .. }) => {
                                writeln!(self.out, "Treasure with ID {id} not found.")
                                    .map_err(HuntError::from)
                            }
                            Err(e) => Err(e),
                        };
                        self.report(result)?;
                    }
                    _ => writeln!(
                        self.out,
                        "[Monitor] Usage: view_treasure <hunt_id> <treasure_id>"
                    )?,
                }
            }
            (Command::ListTreasures, None) => {
                writeln!(self.out, "[Monitor] Usage: list_treasures <hunt_id>")?
            }
            (Command::ViewTreasure, None) => writeln!(
                self.out,
                "[Monitor] Usage: view_treasure <hunt_id> <treasure_id>"
            )?,
            (Command::Other(token), _) => {
                writeln!(self.out, "[Monitor] Unknown command: {token}")?
            }
        }
        Ok(Flow::Continue)
    }

    fn list_hunts(&mut self) -> Result<()> {
        match self.store.hunts() {
            Ok(names) => {
                for name in names {
                    writeln!(self.out, "{name}")?;
                }
            }
            Err(e) if e.is_not_found() => {
                writeln!(self.out, "Error: Could not open hunts directory")?
            }
            Err(e) => self.report(Err(e))?,
        }
        Ok(())
    }

    /// Print a store failure to the relay and keep going. Only failures to
    /// write the output itself end the loop.
    fn report(&mut self, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(HuntError::Io(e)) if is_output_failure(&e) => Err(HuntError::Io(e)),
            Err(e) => {
                warn!(error = %e, code = e.code(), "monitor command failed");
                writeln!(self.out, "Error: {e}")?;
                Ok(())
            }
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }
}

fn is_output_failure(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::BrokenPipe
}

/// Turn a byte stream (the monitor's stdin) into wake events. The receiver
/// disconnects when the stream reaches EOF.
pub fn spawn_wake_listener<R>(mut source: R) -> Receiver<()>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("monitor-wake".into())
        .spawn(move || {
            let mut buf = [0u8; 64];
            loop {
                match source.read(&mut buf) {
                    Ok(0) => break,
                    Ok(_) => {
                        if tx.send(()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        debug!(error = %e, "wake line read failed");
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "could not start wake listener");
    }
    rx
}
