use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{HuntError, Result};

/// How long a blocked caller keeps retrying before reporting `Locked`.
const LOCK_WAIT: Duration = Duration::from_secs(2);
const LOCK_RETRY: Duration = Duration::from_millis(10);

/// Acquire an exclusive lock on a dedicated lock file, returning the locked
/// File handle. The lock is released when the File is dropped.
pub fn acquire_lock(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    lock_with_retry(&file, path)?;
    Ok(file)
}

/// Lock an already-open data file in place. Holders and waiters must open the
/// same path; the lock lives as long as `file`.
pub fn lock_file(file: &File, path: &Path) -> Result<()> {
    lock_with_retry(file, path)
}

/// Release lock explicitly (normally handled by Drop).
pub fn release_lock(file: File) -> Result<()> {
    file.unlock()?;
    Ok(())
}

fn lock_with_retry(file: &File, path: &Path) -> Result<()> {
    let started = Instant::now();
    loop {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(()),
            Err(_) if started.elapsed() < LOCK_WAIT => thread::sleep(LOCK_RETRY),
            Err(_) => return Err(HuntError::Locked(path.display().to_string())),
        }
    }
}
