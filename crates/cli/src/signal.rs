//! SIGINT/SIGTERM handling
//!
//! Handlers are installed without `SA_RESTART`, so a signal landing while the
//! reader is blocked in `read` makes the read fail with `EINTR` and the loop
//! gets to observe the shutdown token.

use anyhow::{anyhow, Context, Result};
use nix::libc::c_int;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::sync::OnceLock;
use watcher::ShutdownToken;

static SHUTDOWN: OnceLock<ShutdownToken> = OnceLock::new();

extern "C" fn request_shutdown(_signal: c_int) {
    // Only an atomic load and an atomic store happen here
    if let Some(token) = SHUTDOWN.get() {
        token.request();
    }
}

/// Route SIGINT and SIGTERM to `token`. May only be called once per process.
pub fn install(token: &ShutdownToken) -> Result<()> {
    SHUTDOWN
        .set(token.clone())
        .map_err(|_| anyhow!("Signal handlers already installed"))?;

    let action = SigAction::new(
        SigHandler::Handler(request_shutdown),
        SaFlags::empty(),
        SigSet::empty(),
    );

    for signal in [Signal::SIGINT, Signal::SIGTERM] {
        // SAFETY: the handler only touches an already-initialized atomic flag.
        unsafe { sigaction(signal, &action) }
            .with_context(|| format!("Failed to install {:?} handler", signal))?;
    }

    tracing::debug!("Installed SIGINT/SIGTERM handlers");
    Ok(())
}
