//! Argument parsing and process entry points for the three binaries.
//!
//! Each `run_cli` returns the process exit code; the `src/bin` mains only
//! forward it to `std::process::exit`.

pub mod hub;
pub mod manager;
pub mod score;

use crate::error::HuntError;
use crate::output::{self, Format};

/// Print a clap error and pick the exit code: 0 for help and version,
/// 1 for anything that is actually a usage error.
pub(crate) fn clap_exit(err: clap::Error) -> i32 {
    let _ = err.print();
    if err.use_stderr() { 1 } else { 0 }
}

pub(crate) fn finish(result: crate::error::Result<()>, format: Format) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            report(&e);
            output::print_error(&e, format);
            1
        }
    }
}

fn report(err: &HuntError) {
    if err.is_not_found() {
        tracing::debug!(code = err.code(), "{err}");
    } else {
        tracing::warn!(code = err.code(), "{err}");
    }
}
