//! Ctrl-C during a provisioning run.
//!
//! Once [`install`] has run, SIGINT no longer kills shovel. The foreground
//! child gets the signal as well and the runner reports its death as
//! [`ShovelError::Interrupted`], so the run returns through its cache guard.
//! A second Ctrl-C exits at once.

use crate::error::{Result, ShovelError};
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

/// Exit code for a second interrupt (128 + SIGINT)
const FORCED_EXIT: i32 = 130;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static INSTALL: Once = Once::new();

/// Take over Ctrl-C for the rest of the process.
pub fn install() {
    INSTALL.call_once(|| {
        let installed = ctrlc::set_handler(|| {
            if INTERRUPTED.swap(true, Ordering::SeqCst) {
                std::process::exit(FORCED_EXIT);
            }
            log::debug!("Interrupt received, stopping after the current command");
        });
        if let Err(e) = installed {
            log::warn!("Cannot handle Ctrl-C, an interrupted run will not be cached: {e}");
        }
    });
}

pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Fail with [`ShovelError::Interrupted`] once Ctrl-C was pressed.
pub fn check(cmd: &str, args: &[&str]) -> Result<()> {
    if is_interrupted() {
        return Err(ShovelError::interrupted(cmd, args));
    }
    Ok(())
}
