//! `tap-maker create-tap` — Create a tap device in another process's net ns.

use anyhow::Context;
use clap::Args;
use tapmaker_common::types::{DeviceSpec, TargetPid};
use tapmaker_core::provision;

/// Arguments for the `create-tap` command.
#[derive(Args, Debug)]
pub struct CreateTapArgs {
    /// The PID holding the netns where the tap device will be created.
    #[arg(short = 'p', long)]
    pub launcher_pid: TargetPid,
}

/// Executes the `create-tap` command.
///
/// The device stays behind after this process exits because it is
/// persistent.
///
/// # Errors
///
/// Returns an error if the namespace cannot be loaded or the device
/// cannot be created.
pub fn execute(launcher_pid: TargetPid, device: &DeviceSpec) -> anyhow::Result<()> {
    provision::create_tap(launcher_pid, device)
        .with_context(|| format!("create-tap {} in netns of pid {launcher_pid}", device.name))
}
