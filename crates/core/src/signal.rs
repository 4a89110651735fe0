//! Signal-triggered shutdown flags.
//!
//! Handlers are installed for SIGINT, SIGTERM, and SIGHUP. They are
//! async-signal-safe: each only sets an atomic flag. `SA_RESTART` stays
//! unset so a blocking wait on the pipeline returns `EINTR`, letting the
//! orchestrator reap the process group and restore the target's
//! properties before exiting.
#![allow(unsafe_code)]

use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn record_shutdown(_signal: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

/// Installs the shutdown signal handlers.
///
/// Safe to call more than once; later calls re-install the same handlers.
pub fn install_handlers() {
    let handler: extern "C" fn(libc::c_int) = record_shutdown;
    for signal in [libc::SIGINT, libc::SIGTERM, libc::SIGHUP] {
        // SAFETY: the handler only touches an atomic flag, and the
        // sigaction structure is fully initialised before use.
        unsafe {
            let mut action: libc::sigaction = mem::zeroed();
            action.sa_sigaction = handler as libc::sighandler_t;
            libc::sigemptyset(&mut action.sa_mask);
            action.sa_flags = 0;
            libc::sigaction(signal, &action, ptr::null_mut());
        }
    }
}

/// Reports whether a shutdown signal has been received.
#[must_use]
pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}
