//! Per-invocation configuration record.
//!
//! Built once from the command line and handed by value to the mode
//! handler; nothing here is shared or mutated afterwards.

use crate::types::{DeviceSpec, TargetPid};

/// Operating mode selected by the subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Enter the network namespace of `launcher_pid`, create the device,
    /// and exit.
    CreateTap {
        /// Process whose network namespace receives the device.
        launcher_pid: TargetPid,
    },
    /// Create the device in the current namespace and hold it open until
    /// the process is terminated.
    ConsumeTap,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateTap { .. } => write!(f, "create-tap"),
            Self::ConsumeTap => write!(f, "consume-tap"),
        }
    }
}

/// Everything one `tap-maker` invocation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationConfig {
    /// Selected mode.
    pub mode: Mode,
    /// Device to create.
    pub device: DeviceSpec,
}
