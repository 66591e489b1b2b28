use std::io::{ErrorKind, Read};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

const CHUNK_SIZE: usize = 1024;

/// Hub-side end of the monitor's stdout pipe.
///
/// A reader thread moves bytes from the pipe into a channel as they arrive,
/// so draining never blocks on the pipe itself. A drain returns whatever has
/// arrived so far; it cannot tell whether the monitor is done writing.
pub struct OutputRelay {
    rx: Receiver<Vec<u8>>,
    reader: Option<JoinHandle<()>>,
    closed: bool,
}

impl OutputRelay {
    pub fn spawn<R>(mut source: R) -> Self
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let reader = thread::Builder::new()
            .name("monitor-relay".into())
            .spawn(move || {
                let mut buf = [0u8; CHUNK_SIZE];
                loop {
                    match source.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => {
                            if tx.send(buf[..n].to_vec()).is_err() {
                                break;
                            }
                        }
                        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                        Err(e) => {
                            warn!(error = %e, "monitor output pipe read failed");
                            break;
                        }
                    }
                }
                debug!("monitor output pipe closed");
            })
            .map_err(|e| warn!(error = %e, "could not start relay thread"))
            .ok();

        Self {
            rx,
            reader,
            closed: false,
        }
    }

    /// Everything buffered right now. Never waits.
    pub fn drain(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(chunk) => out.extend_from_slice(&chunk),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
        out
    }

    /// Drain until the pipe reaches EOF or `timeout` passes. Used once the
    /// monitor has exited to pick up its last words.
    pub fn drain_to_close(&mut self, timeout: Duration) -> Vec<u8> {
        let deadline = Instant::now() + timeout;
        let mut out = Vec::new();
        while !self.closed {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(chunk) => out.extend_from_slice(&chunk),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => self.closed = true,
            }
        }
        if self.closed
            && let Some(reader) = self.reader.take()
        {
            let _ = reader.join();
        }
        out
    }

    /// True once a drain has observed EOF on the pipe.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};
    use std::sync::mpsc::Sender;

    /// A reader fed from a channel, so a test controls when bytes "arrive".
    struct Feed(Receiver<Vec<u8>>, Vec<u8>);

    impl Read for Feed {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.1.is_empty() {
                match self.0.recv() {
                    Ok(bytes) => self.1 = bytes,
                    Err(_) => return Ok(0),
                }
            }
            let n = buf.len().min(self.1.len());
            buf[..n].copy_from_slice(&self.1[..n]);
            self.1.drain(..n);
            Ok(n)
        }
    }

    fn feed() -> (Sender<Vec<u8>>, OutputRelay) {
        let (tx, rx) = mpsc::channel();
        (tx, OutputRelay::spawn(Feed(rx, Vec::new())))
    }

    fn wait_for(relay: &mut OutputRelay, want: usize) -> Vec<u8> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut got = Vec::new();
        while got.len() < want && Instant::now() < deadline {
            got.extend(relay.drain());
            thread::sleep(Duration::from_millis(5));
        }
        got
    }

    #[test]
    fn drain_on_idle_pipe_returns_immediately() {
        let (_tx, mut relay) = feed();
        let started = Instant::now();
        assert!(relay.drain().is_empty());
        assert!(started.elapsed() < Duration::from_millis(500));
        assert!(!relay.is_closed());
    }

    #[test]
    fn drain_collects_what_arrived() {
        let (tx, mut relay) = feed();
        tx.send(b"hello ".to_vec()).unwrap();
        tx.send(b"world\n".to_vec()).unwrap();
        assert_eq!(wait_for(&mut relay, 12), b"hello world\n");
        assert!(relay.drain().is_empty());
    }

    #[test]
    fn drain_to_close_reads_until_eof() {
        let payload = vec![b'x'; CHUNK_SIZE * 3 + 7];
        let mut relay = OutputRelay::spawn(Cursor::new(payload.clone()));
        let got = relay.drain_to_close(Duration::from_secs(5));
        assert_eq!(got, payload);
        assert!(relay.is_closed());
    }

    #[test]
    fn drain_to_close_gives_up_after_timeout() {
        let (_tx, mut relay) = feed();
        let got = relay.drain_to_close(Duration::from_millis(50));
        assert!(got.is_empty());
        assert!(!relay.is_closed());
    }
}
