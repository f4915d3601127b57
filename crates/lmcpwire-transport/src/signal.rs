use std::sync::Once;

use tracing::debug;

static IGNORE_SIGPIPE: Once = Once::new();

/// Stop writes to a closed peer from killing the process.
///
/// With `SIGPIPE` ignored, such writes fail with `EPIPE` and surface as an
/// ordinary I/O error. The disposition is process-wide; the first call
/// installs it and later calls do nothing.
pub fn ignore_sigpipe() {
    IGNORE_SIGPIPE.call_once(|| {
        install();
        debug!("SIGPIPE ignored for this process");
    });
}

#[cfg(unix)]
fn install() {
    // SAFETY: installing SIG_IGN has no handler code to run and touches no
    // memory we own; `signal` is async-signal-safe to call here.
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }
}

#[cfg(not(unix))]
fn install() {}
