//! `tap-maker consume-tap` — Create a tap device here and keep it open.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use tapmaker_common::constants::HOLD_INTERVAL;
use tapmaker_common::types::DeviceSpec;
use tapmaker_core::provision;

/// Executes the `consume-tap` command.
///
/// Blocks until the process receives SIGINT, SIGTERM or SIGHUP; the
/// device descriptor stays open the whole time.
///
/// # Errors
///
/// Returns an error if the signal handler cannot be installed or the
/// device cannot be created.
pub fn execute(device: &DeviceSpec) -> anyhow::Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set termination handler")?;

    provision::consume_tap(device, &running, HOLD_INTERVAL)
        .with_context(|| format!("could not open tap device {}", device.name))?;

    tracing::info!(name = %device.name, "terminated, releasing tap device");
    Ok(())
}
