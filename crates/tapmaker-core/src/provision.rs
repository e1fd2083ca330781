//! The two provisioning modes.
//!
//! - `create-tap`: enter the launcher's network namespace, create the
//!   device, close it, and return. The device lives on because it is
//!   persistent.
//! - `consume-tap`: create the device in the current namespace and keep
//!   its descriptor open until the process is told to stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tapmaker_common::error::Result;
use tapmaker_common::types::{DeviceSpec, TargetPid};

/// Creates `spec` inside the network namespace of `launcher_pid`.
///
/// The calling thread is back in its own namespace when this returns,
/// whatever the outcome.
///
/// # Errors
///
/// Returns an error if the namespace cannot be resolved or entered, if the
/// device cannot be created, or if the original namespace cannot be
/// restored.
#[cfg(target_os = "linux")]
pub fn create_tap(launcher_pid: TargetPid, spec: &DeviceSpec) -> Result<()> {
    use crate::namespace::NetNamespace;

    tracing::debug!(pid = %launcher_pid, "executing in netns of pid");
    let netns = NetNamespace::of_pid(launcher_pid)?;
    tracing::debug!(path = %netns.path().display(), "loaded netns");

    netns.run(|| {
        let device = crate::tap::create_tap_device(spec)?;
        tracing::info!(
            pid = %launcher_pid,
            name = device.name(),
            "created tap device in launcher netns"
        );
        Ok(())
    })
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: network namespaces and TAP devices require Linux.
#[cfg(not(target_os = "linux"))]
pub fn create_tap(_launcher_pid: TargetPid, _spec: &DeviceSpec) -> Result<()> {
    Err(unsupported())
}

/// Creates `spec` in the current network namespace and holds it open
/// until `keep_running` is cleared.
///
/// Nothing in this crate clears the flag; the caller wires it to process
/// termination.
///
/// # Errors
///
/// Returns an error if the device cannot be created. Once the device
/// exists this only returns after `keep_running` goes false.
#[cfg(target_os = "linux")]
pub fn consume_tap(
    spec: &DeviceSpec,
    keep_running: &AtomicBool,
    interval: Duration,
) -> Result<()> {
    tracing::debug!(name = %spec.name, "will consume tap device");
    let device = crate::tap::create_tap_device(spec)?;
    tracing::info!(
        name = device.name(),
        pid = std::process::id(),
        "opened the tap device, holding it"
    );
    hold_open(device, keep_running, interval);
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: TAP devices require Linux.
#[cfg(not(target_os = "linux"))]
pub fn consume_tap(
    _spec: &DeviceSpec,
    _keep_running: &AtomicBool,
    _interval: Duration,
) -> Result<()> {
    Err(unsupported())
}

/// Owns `handle` until `keep_running` is cleared, checking every
/// `interval`.
///
/// The handle is dropped only when this returns.
#[allow(clippy::needless_pass_by_value)]
pub fn hold_open<H>(handle: H, keep_running: &AtomicBool, interval: Duration) {
    while keep_running.load(Ordering::SeqCst) {
        std::thread::sleep(interval);
    }
    tracing::debug!("hold released");
    drop(handle);
}

#[cfg(not(target_os = "linux"))]
fn unsupported() -> tapmaker_common::error::TapMakerError {
    tapmaker_common::error::TapMakerError::Unsupported {
        message: "Linux required for network namespaces and TAP devices".into(),
    }
}
